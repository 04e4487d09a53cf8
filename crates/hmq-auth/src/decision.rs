// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Safe counterparts of the C-level check outcomes.

use libc::c_int;

use crate::abi::{HmqAuthResult, HMQ_AUTH_ACL_READ, HMQ_AUTH_ACL_WRITE};
use crate::error::AuthError;

/// Kind of topic access being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Message delivery to a subscriber.
    Read,
    /// Client publish to a topic.
    Write,
}

impl Access {
    pub fn from_c_int(value: c_int) -> Option<Self> {
        match value {
            HMQ_AUTH_ACL_READ => Some(Access::Read),
            HMQ_AUTH_ACL_WRITE => Some(Access::Write),
            _ => None,
        }
    }

    pub fn as_c_int(self) -> c_int {
        match self {
            Access::Read => HMQ_AUTH_ACL_READ,
            Access::Write => HMQ_AUTH_ACL_WRITE,
        }
    }
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::Read => write!(f, "read"),
            Access::Write => write!(f, "write"),
        }
    }
}

/// Which check a return code belongs to. Denials map to different C
/// codes for credential and ACL checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Credentials,
    Acl,
}

/// Outcome of a single plugin check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The check passes.
    Allow,
    /// The check fails; no further checkers are asked.
    Deny,
    /// This plugin declines to answer; the next checker in the chain
    /// is asked.
    Defer,
}

impl Decision {
    /// C return code for this decision in the context of `kind`.
    pub fn to_result(self, kind: CheckKind) -> HmqAuthResult {
        match (self, kind) {
            (Decision::Allow, _) => HmqAuthResult::HmqAuthOk,
            (Decision::Deny, CheckKind::Credentials) => HmqAuthResult::HmqAuthDenied,
            (Decision::Deny, CheckKind::Acl) => HmqAuthResult::HmqAuthAclDenied,
            (Decision::Defer, _) => HmqAuthResult::HmqAuthDefer,
        }
    }
}

/// A validated TLS-PSK key: a non-empty hexadecimal string without a
/// leading `0x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PskKey(String);

impl PskKey {
    pub fn new(hex: impl Into<String>) -> Result<Self, AuthError> {
        let hex = hex.into();
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AuthError::InvalidPskKey(hex));
        }
        Ok(PskKey(hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the hex string, excluding any NUL terminator.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::str::FromStr for PskKey {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PskKey::new(s)
    }
}

impl std::fmt::Display for PskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_round_trip() {
        for access in [Access::Read, Access::Write] {
            assert_eq!(Access::from_c_int(access.as_c_int()), Some(access));
        }
        assert_eq!(Access::from_c_int(0), None);
        assert_eq!(Access::from_c_int(0x04), None);
    }

    #[test]
    fn test_decision_codes_depend_on_check_kind() {
        assert_eq!(
            Decision::Deny.to_result(CheckKind::Credentials),
            HmqAuthResult::HmqAuthDenied
        );
        assert_eq!(
            Decision::Deny.to_result(CheckKind::Acl),
            HmqAuthResult::HmqAuthAclDenied
        );
        assert_eq!(
            Decision::Allow.to_result(CheckKind::Acl),
            HmqAuthResult::HmqAuthOk
        );
        assert_eq!(
            Decision::Defer.to_result(CheckKind::Credentials),
            HmqAuthResult::HmqAuthDefer
        );
    }

    #[test]
    fn test_psk_key_validation() {
        assert!(PskKey::new("deadBEEF01").is_ok());
        assert!(PskKey::new("").is_err());
        assert!(PskKey::new("0xdead").is_err());
        assert!(PskKey::new("nothex").is_err());
    }
}
