use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TimingError {
    /// A running delay was cancelled while configured to reject on cancel.
    #[error("Timer cancelled before completion")]
    Cancelled,

    #[error("No tokio runtime available for the host scheduler")]
    NoRuntime,
}
