//! Agent directories
//!
//! - Windows: `C:\ProgramData\AlgaAgent\config`
//! - macOS: `/Library/Application Support/AlgaAgent/config`
//! - Linux: `/etc/alga-agent`

use std::path::PathBuf;

/// Get the configuration directory for the agent
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("ProgramData")
            .map(|p| PathBuf::from(p).join("AlgaAgent").join("config"))
            .unwrap_or_else(|_| PathBuf::from(r"C:\ProgramData\AlgaAgent\config"))
    }

    #[cfg(target_os = "macos")]
    {
        PathBuf::from("/Library/Application Support/AlgaAgent/config")
    }

    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/etc/alga-agent")
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        directories::ProjectDirs::from("com", "algapsa", "agent")
            .map(|d| d.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("./config"))
    }
}
