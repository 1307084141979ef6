use thiserror::Error;

/// Failure taxonomy for the content pipeline.
///
/// None of these are fatal to a generation run. Every variant has a defined
/// degraded-but-valid output: fallback segmentation, empty segments, empty
/// history, or a shorter batch. Only the transport layer is allowed to
/// surface hard failures to callers.
#[derive(Debug, Error)]
pub enum ContentError {
    /// No registered markers were recognized in the raw text.
    #[error("no section markers recognized in input")]
    MalformedInput,

    /// Some expected markers were missing; their segments stay empty.
    #[error("sections missing from input: {missing:?}")]
    ParseDegraded { missing: Vec<String> },

    /// The history file could not be read or parsed.
    #[error("history file unavailable: {0}")]
    PersistenceIo(String),

    /// One or more units of a concurrent batch produced no output.
    #[error("{failed} of {submitted} batch tasks produced no output")]
    PartialBatch { submitted: usize, failed: usize },
}
