use thiserror::Error;

/// Failure kinds of the session engine.
///
/// Fetch and parse failures are transient: the caller surfaces a
/// notification and treats them as "no more results". Missing startup
/// dependencies are the only fatal kind.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("metadata source unavailable")]
    FetchUnavailable,

    #[error("malformed metadata payload")]
    ParseFailure,

    #[error("missing dependencies: {}", .0.join(", "))]
    MissingDependencies(Vec<String>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
