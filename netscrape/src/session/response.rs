//! Result of a single command sent to a device.

use std::time::Duration;

/// Output of one command.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// Output with the command echo and trailing prompt removed.
    pub result: String,

    /// The prompt that ended the output.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,

    /// Set when the output contains one of the platform's failure patterns.
    pub failure_message: Option<String>,
}

impl Response {
    /// Create a response for a command the device accepted.
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            prompt: prompt.into(),
            elapsed,
            failure_message: None,
        }
    }

    /// Mark the response as rejected by the device.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    /// Check if the device accepted the command.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}
