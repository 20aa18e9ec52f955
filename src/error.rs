//! Error types for the embedded runtime bridge

use thiserror::Error;

/// Errors surfaced by runtime initialization and the host capability modules
#[derive(Debug, Error)]
pub enum BridgeError {
    /// `python_version` is missing or not one of the supported majors
    #[error("unknown requested version of python: {0}")]
    UnsupportedVersion(i64),

    /// The embedding library returned no runtime handle
    #[error("could not init six lib for python version {version}")]
    CreateFailed { version: u8 },

    /// The handle exists but the interpreter did not come up
    #[error("python interpreter failed to start: {0}")]
    BootFailed(String),

    /// A runtime is already live in this process
    #[error("an embedded python runtime is already initialized")]
    AlreadyInitialized,

    /// Invalid container include/exclude rule
    #[error("invalid container filter: {0}")]
    ContainerFilter(String),

    /// Subprocess could not be run or produced no output
    #[error("subprocess error: {0}")]
    Subprocess(String),

    /// Kubelet connection info unavailable
    #[error("kubelet connection info unavailable: {0}")]
    Kubelet(String),

    /// Telemetry series could not be queued
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_distinguish_failures() {
        let unsupported = BridgeError::UnsupportedVersion(5).to_string();
        let create = BridgeError::CreateFailed { version: 3 }.to_string();
        let boot = BridgeError::BootFailed("No module named 'encodings'".into()).to_string();

        assert!(unsupported.contains('5'));
        assert!(create.contains("python version 3"));
        assert!(boot.contains("No module named 'encodings'"));
        assert_ne!(unsupported, create);
    }
}
