//! Guest runtime version selection

use std::fmt;

use crate::error::{BridgeError, BridgeResult};

/// Compiled-in Python 2 home, baked in by the packaging build
pub const PYTHON2_HOME: &str = match option_env!("ALGA_PYTHON2_HOME") {
    Some(home) => home,
    None => "",
};

/// Compiled-in Python 3 home, baked in by the packaging build
pub const PYTHON3_HOME: &str = match option_env!("ALGA_PYTHON3_HOME") {
    Some(home) => home,
    None => "",
};

/// Supported major versions of the embedded interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeVersion {
    V2,
    V3,
}

impl RuntimeVersion {
    /// Major version number
    pub fn major(&self) -> u8 {
        match self {
            RuntimeVersion::V2 => 2,
            RuntimeVersion::V3 => 3,
        }
    }

    /// Name prefix of the standard library directory under `<home>/lib`
    ///
    /// Any minor version matches (`python3.8`, `python3.11`, ...).
    pub fn stdlib_prefix(&self) -> &'static str {
        match self {
            RuntimeVersion::V2 => "python2.",
            RuntimeVersion::V3 => "python3.",
        }
    }

    /// Home path baked in at build time for this version
    pub fn compiled_home(&self) -> &'static str {
        match self {
            RuntimeVersion::V2 => PYTHON2_HOME,
            RuntimeVersion::V3 => PYTHON3_HOME,
        }
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major())
    }
}

impl TryFrom<i64> for RuntimeVersion {
    type Error = BridgeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(RuntimeVersion::V2),
            3 => Ok(RuntimeVersion::V3),
            other => Err(BridgeError::UnsupportedVersion(other)),
        }
    }
}

/// Pick the runtime version from the configured `python_version`
///
/// Anything other than 2 or 3, including an absent (zero) value, is rejected.
pub fn select_version(requested: i64) -> BridgeResult<RuntimeVersion> {
    RuntimeVersion::try_from(requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_supported_versions() {
        assert_eq!(select_version(2).unwrap(), RuntimeVersion::V2);
        assert_eq!(select_version(3).unwrap(), RuntimeVersion::V3);
    }

    #[test]
    fn test_select_rejects_everything_else() {
        for value in [0, -1, -3, 1, 4, 5, 27, i64::MAX, i64::MIN] {
            match select_version(value) {
                Err(BridgeError::UnsupportedVersion(v)) => assert_eq!(v, value),
                other => panic!("expected UnsupportedVersion for {}, got {:?}", value, other),
            }
        }
    }

    #[test]
    fn test_version_metadata() {
        assert_eq!(RuntimeVersion::V2.major(), 2);
        assert_eq!(RuntimeVersion::V3.to_string(), "3");
        assert!("python2.7".starts_with(RuntimeVersion::V2.stdlib_prefix()));
        assert!("python3.10".starts_with(RuntimeVersion::V3.stdlib_prefix()));
        assert!(!"python3.9".starts_with(RuntimeVersion::V2.stdlib_prefix()));
    }
}
