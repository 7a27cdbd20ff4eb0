use async_trait::async_trait;

use crate::error::ResolutionError;
use crate::types::{ResolveRequest, UpdateOutcome};

/// A source of updates.
///
/// Implementations decide how releases are discovered, authenticated and
/// downloaded; callers only see "no update" or an archive payload.
#[async_trait]
pub trait Resolver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, request: &ResolveRequest) -> Result<UpdateOutcome, ResolutionError>;
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::Resolver;
    use crate::error::ResolutionError;
    use crate::types::{ResolveRequest, UpdateOutcome, UpdatePayload};

    struct FixedResolver {
        latest: &'static str,
    }

    #[async_trait]
    impl Resolver for FixedResolver {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn resolve(
            &self,
            request: &ResolveRequest,
        ) -> Result<UpdateOutcome, ResolutionError> {
            if request.current_version == self.latest {
                Ok(UpdateOutcome::NoUpdateAvailable)
            } else {
                Ok(UpdateOutcome::Update(UpdatePayload::from_bytes(
                    Vec::new(),
                    "tool.tar.gz",
                )))
            }
        }
    }

    #[tokio::test]
    async fn resolver_is_usable_as_trait_object() {
        let resolver: Box<dyn Resolver> = Box::new(FixedResolver { latest: "v2" });

        let current = resolver
            .resolve(&ResolveRequest::new("v2"))
            .await
            .expect("fixed resolver should not fail");
        assert!(!current.is_update());

        let outdated = resolver
            .resolve(&ResolveRequest::new("v1"))
            .await
            .expect("fixed resolver should not fail");
        assert!(outdated.is_update());
        assert_eq!(resolver.name(), "fixed");
    }
}
