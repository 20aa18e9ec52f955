//! Platform-specific implementations for the checks runtime
//!
//! This module provides cross-platform abstractions for:
//! - Python home resolution
//! - Search path normalization and home directory expansion
//! - Agent config directory

pub mod dirs;
pub mod paths;

pub use dirs::*;
pub use paths::*;

/// Platform detection enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOS,
    Linux,
    Other,
}

impl Platform {
    /// Detect the current platform
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOS
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }

    /// Whether the platform follows POSIX conventions
    pub fn is_posix(&self) -> bool {
        !matches!(self, Platform::Windows)
    }
}
