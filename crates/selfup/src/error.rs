use selfup_core::UpdateCycleError;
use selfup_resolver::ResolutionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("invalid update source: {0}")]
    Source(#[from] ResolutionError),

    #[error(transparent)]
    Update(#[from] UpdateCycleError),
}

impl AppError {
    /// 3 tells the caller the executable path may hold no runnable binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Update(error) if error.is_fatal() => 3,
            _ => 1,
        }
    }
}
