use log::{error, info, warn};
use selfup_resolver::{ResolutionError, ResolveRequest, Resolver, UpdateOutcome};
use thiserror::Error;

use crate::apply::{Applier, ApplyError, SwapFs};

#[derive(Debug, Error)]
pub enum UpdateCycleError {
    #[error("could not resolve update: {0}")]
    Resolve(#[from] ResolutionError),
    #[error("could not apply update: {0}")]
    Apply(#[from] ApplyError),
}

impl UpdateCycleError {
    /// The running binary may no longer exist on disk; the host must not
    /// continue as if nothing happened.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Apply(error) if error.is_fatal())
    }
}

/// Check `resolver` once and replace the running executable if it reports an
/// update.
///
/// Returns `true` when an update was applied and `false` when already current.
///
/// # Errors
/// Resolution errors are always propagated, as are apply errors.
pub async fn run_update_cycle(
    resolver: &dyn Resolver,
    current_version: &str,
) -> Result<bool, UpdateCycleError> {
    run_update_cycle_with(resolver, &ResolveRequest::new(current_version), &Applier::new()).await
}

/// [`run_update_cycle`] with an explicit request and applier.
///
/// # Errors
/// See [`run_update_cycle`].
pub async fn run_update_cycle_with<F: SwapFs>(
    resolver: &dyn Resolver,
    request: &ResolveRequest,
    applier: &Applier<F>,
) -> Result<bool, UpdateCycleError> {
    info!(
        "Checking {} for updates (current version {})",
        resolver.name(),
        request.current_version
    );

    let mut payload = match resolver.resolve(request).await? {
        UpdateOutcome::NoUpdateAvailable => return Ok(false),
        UpdateOutcome::Update(payload) => payload,
    };

    let result = applier.apply(&mut payload);
    drop(payload);

    if let Err(apply_error) = &result {
        if apply_error.original_intact() {
            warn!("Update not applied, original binary left in place: {apply_error}");
        } else {
            error!("Update left the executable in a corrupt state: {apply_error}");
        }
    }
    result?;
    Ok(true)
}
