use thiserror::Error;

/// Failures a relay call can surface to its caller. Network, remote-service,
/// and content-policy failures are undifferentiated at this boundary; the
/// cause text is retained for logging and richer presentation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("message text is empty")]
    EmptyInput,
    #[error("completion request failed: {0}")]
    CompletionFailed(String),
}

impl RelayError {
    /// Fixed, generic copy shown to the user on any failure. The relay never
    /// formats user-facing error text beyond this.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyInput => "Please provide a message to send.",
            Self::CompletionFailed(_) => {
                "Sorry, there was an error processing your request. Please try again."
            }
        }
    }
}
