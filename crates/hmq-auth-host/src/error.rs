// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host-side error type.

use std::path::PathBuf;

use libc::c_int;

use hmq_auth::abi::HmqAuthResult;

/// Errors raised while loading or driving auth plugins.
#[derive(Debug)]
pub enum HostError {
    // ========================================================================
    // Loading
    // ========================================================================
    /// `dlopen` failed.
    Load {
        path: PathBuf,
        source: libloading::Error,
    },
    /// A required entry point is missing from the shared library.
    MissingSymbol {
        symbol: &'static str,
        source: libloading::Error,
    },
    /// The plugin speaks a different ABI version.
    VersionMismatch {
        path: PathBuf,
        found: c_int,
        expected: c_int,
    },

    // ========================================================================
    // Lifecycle
    // ========================================================================
    /// `hmq_auth_plugin_init` returned a failure code.
    PluginInit { path: PathBuf, code: c_int },
    /// `hmq_auth_security_init` returned a failure code.
    SecurityInit { name: String, code: c_int },

    // ========================================================================
    // Configuration
    // ========================================================================
    /// A plugin option cannot cross the C boundary (embedded NUL).
    BadOption { key: String },
    /// Reading the security config file failed.
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The security config does not parse.
    ConfigParse(serde_yaml::Error),
}

/// Render a raw return code with its symbolic name when it has one.
pub(crate) fn describe_code(code: c_int) -> String {
    match HmqAuthResult::from_c_int(code) {
        Some(rc) => format!("{rc:?} ({code})"),
        None => format!("unrecognized code {code}"),
    }
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostError::Load { path, source } => {
                write!(f, "failed to load plugin {}: {source}", path.display())
            }
            HostError::MissingSymbol { symbol, source } => {
                write!(f, "plugin does not export {symbol}: {source}")
            }
            HostError::VersionMismatch {
                path,
                found,
                expected,
            } => write!(
                f,
                "plugin {} reports ABI version {found}, broker requires {expected}",
                path.display()
            ),
            HostError::PluginInit { path, code } => write!(
                f,
                "plugin {} failed to initialise: {}",
                path.display(),
                describe_code(*code)
            ),
            HostError::SecurityInit { name, code } => write!(
                f,
                "plugin '{name}' security init failed: {}",
                describe_code(*code)
            ),
            HostError::BadOption { key } => {
                write!(f, "option '{key}' contains an embedded NUL byte")
            }
            HostError::ConfigIo { path, source } => {
                write!(f, "cannot read security config {}: {source}", path.display())
            }
            HostError::ConfigParse(e) => write!(f, "invalid security config: {e}"),
        }
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HostError::Load { source, .. } | HostError::MissingSymbol { source, .. } => {
                Some(source)
            }
            HostError::ConfigIo { source, .. } => Some(source),
            HostError::ConfigParse(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_code() {
        assert!(describe_code(0).contains("HmqAuthOk"));
        assert!(describe_code(20).contains("HmqAuthDefer"));
        assert!(describe_code(42).contains("unrecognized"));
    }

    #[test]
    fn test_version_mismatch_display() {
        let err = HostError::VersionMismatch {
            path: PathBuf::from("/lib/auth.so"),
            found: 1,
            expected: 2,
        };
        let text = err.to_string();
        assert!(text.contains("version 1"));
        assert!(text.contains("requires 2"));
    }
}
