// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by the plugin SDK and the host-side loader.

use crate::abi::HmqAuthResult;
use libc::c_int;

/// Errors raised at the plugin boundary.
#[derive(Debug)]
pub enum AuthError {
    // ========================================================================
    // Boundary validation
    // ========================================================================
    /// A required pointer argument was NULL.
    NullPointer(&'static str),
    /// A C string argument was not valid UTF-8.
    InvalidUtf8(&'static str),
    /// `access` value outside the declared ACL bits.
    InvalidAccess(c_int),
    /// Negative payload length or payload pointer/length mismatch.
    InvalidPayload,
    /// QoS outside 0..=2.
    InvalidQos(c_int),

    // ========================================================================
    // Options
    // ========================================================================
    /// Malformed plugin option (NULL key, embedded NUL, ...).
    InvalidOption(String),
    /// An option value failed to parse as the requested type.
    OptionParse { key: String, value: String },

    // ========================================================================
    // PSK
    // ========================================================================
    /// PSK key is empty or contains non-hexadecimal characters.
    InvalidPskKey(String),
    /// The broker-supplied key buffer cannot hold the PSK.
    KeyBufferTooSmall { needed: usize, max: usize },

    // ========================================================================
    // Plugin-reported
    // ========================================================================
    /// Free-form failure reported by plugin code.
    Plugin(String),
}

impl AuthError {
    /// Map the error onto the C return code reported across the ABI.
    pub fn to_result(&self) -> HmqAuthResult {
        match self {
            AuthError::NullPointer(_)
            | AuthError::InvalidUtf8(_)
            | AuthError::InvalidAccess(_)
            | AuthError::InvalidPayload
            | AuthError::InvalidQos(_)
            | AuthError::InvalidOption(_)
            | AuthError::OptionParse { .. } => HmqAuthResult::HmqAuthInvalidArgument,
            AuthError::KeyBufferTooSmall { .. } => HmqAuthResult::HmqAuthBufferTooSmall,
            AuthError::InvalidPskKey(_) | AuthError::Plugin(_) => HmqAuthResult::HmqAuthUnknown,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::NullPointer(what) => write!(f, "{what} must not be NULL"),
            AuthError::InvalidUtf8(what) => write!(f, "{what} is not valid UTF-8"),
            AuthError::InvalidAccess(v) => write!(f, "invalid ACL access value {v}"),
            AuthError::InvalidPayload => write!(f, "invalid payload pointer/length"),
            AuthError::InvalidQos(v) => write!(f, "invalid QoS {v} (expected 0..=2)"),
            AuthError::InvalidOption(what) => write!(f, "invalid plugin option: {what}"),
            AuthError::OptionParse { key, value } => {
                write!(f, "option '{key}' has unparseable value '{value}'")
            }
            AuthError::InvalidPskKey(key) => {
                write!(f, "PSK key '{key}' is not a hexadecimal string")
            }
            AuthError::KeyBufferTooSmall { needed, max } => {
                write!(f, "PSK key needs {needed} bytes but buffer holds {max}")
            }
            AuthError::Plugin(msg) => write!(f, "plugin error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_errors_map_to_invalid_argument() {
        assert_eq!(
            AuthError::NullPointer("user_data").to_result(),
            HmqAuthResult::HmqAuthInvalidArgument
        );
        assert_eq!(
            AuthError::InvalidQos(7).to_result(),
            HmqAuthResult::HmqAuthInvalidArgument
        );
    }

    #[test]
    fn test_buffer_error_maps_to_buffer_too_small() {
        let err = AuthError::KeyBufferTooSmall { needed: 65, max: 32 };
        assert_eq!(err.to_result(), HmqAuthResult::HmqAuthBufferTooSmall);
        assert!(err.to_string().contains("65"));
    }

    #[test]
    fn test_plugin_error_maps_to_unknown() {
        assert_eq!(
            AuthError::Plugin("backend down".into()).to_result(),
            HmqAuthResult::HmqAuthUnknown
        );
    }
}
