use std::time::Duration;

/// Core error type.
///
/// Adapter crates map their specific errors into this type so the core can
/// tell a bad command argument apart from a failing external service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{what} timed out after {}s", .after.as_secs())]
    Timeout { what: &'static str, after: Duration },

    #[error("external error: {0}")]
    External(String),

    #[error(transparent)]
    Publish(Box<PublishError>),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<PublishError> for Error {
    fn from(e: PublishError) -> Self {
        Error::Publish(Box::new(e))
    }
}

/// Why a publish cycle aborted.
///
/// Either way nothing was recorded in the ledger.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("text generation failed: {0}")]
    Generation(#[source] Error),

    #[error("channel publish failed: {0}")]
    Transport(#[source] Error),
}

/// Run `fut` with an upper bound on how long it may take.
pub async fn with_timeout<T, F>(what: &'static str, after: Duration, fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(res) => res,
        Err(_) => Err(Error::Timeout { what, after }),
    }
}
