// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Raw C ABI for HMQ authentication plugins.
//!
//! A plugin is compiled as a shared library exporting the eight
//! `hmq_auth_*` entry points declared here (as [`SYMBOL_NAMES`] and the
//! matching function type aliases). The broker loads the library,
//! verifies [`HMQ_AUTH_PLUGIN_VERSION`], and then drives the plugin
//! through its lifecycle:
//!
//! 1. `hmq_auth_plugin_version` -- immediately after `dlopen`.
//! 2. `hmq_auth_plugin_init` -- once; the plugin stores its state
//!    through `user_data`, and that pointer is handed back to every
//!    later call.
//! 3. `hmq_auth_security_init(reload = false)` -- security startup.
//! 4. `hmq_auth_unpwd_check` / `hmq_auth_acl_check` /
//!    `hmq_auth_psk_key_get` -- per-connection and per-message checks.
//! 5. On a config reload: `hmq_auth_security_cleanup(reload = true)`
//!    followed by `hmq_auth_security_init(reload = true)`.
//! 6. On shutdown: `hmq_auth_security_cleanup(reload = false)`, then
//!    `hmq_auth_plugin_cleanup`.
//!
//! # Check flow
//!
//! A plugin may implement authentication, access control, or both. A
//! check it does not want to answer must return
//! [`HmqAuthResult::HmqAuthDefer`]; the broker then asks the next
//! checker in the chain. The broker's built-in checkers run first
//! (an unconfigured built-in counts as deferred), then each plugin in
//! configuration order. The first non-defer result resolves the check.
//! If every checker defers, the request is denied.

use libc::{c_char, c_int, c_long, c_void};

/// ABI version spoken by this crate.
///
/// `hmq_auth_plugin_version` must return exactly this value; the broker
/// refuses to load a plugin reporting anything else.
pub const HMQ_AUTH_PLUGIN_VERSION: c_int = 2;

/// No topic access.
pub const HMQ_AUTH_ACL_NONE: c_int = 0x00;
/// Read access: the broker wants to deliver a message to a subscriber.
pub const HMQ_AUTH_ACL_READ: c_int = 0x01;
/// Write access: a client wants to publish to a topic.
pub const HMQ_AUTH_ACL_WRITE: c_int = 0x02;

/// Size in bytes of the buffer the broker passes to
/// `hmq_auth_psk_key_get`, including the terminating NUL.
pub const HMQ_AUTH_PSK_MAX_KEY_LEN: usize = 256;

/// Opaque broker-owned client session handle.
///
/// Plugins receive it in ACL checks and may only pass it back to broker
/// APIs; it carries no plugin-visible structure.
#[repr(C)]
pub struct HmqClient {
    _private: [u8; 0],
}

/// One `auth_opt` key/value pair from the broker configuration.
///
/// Both pointers reference NUL-terminated strings owned by the broker;
/// they stay valid for the lifetime of the loaded plugin.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HmqAuthOpt {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// Message context handed to `hmq_auth_acl_check`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HmqAclMsg {
    /// Topic the message is published to / delivered from. Never NULL.
    pub topic: *const c_char,
    /// Message payload; NULL when `payloadlen` is 0.
    pub payload: *const c_void,
    /// Payload length in bytes.
    pub payloadlen: c_long,
    /// Message QoS (0, 1 or 2).
    pub qos: c_int,
    /// Retain flag of the message.
    pub retain: bool,
}

/// Return codes for every plugin entry point (C-compatible enum).
///
/// # Code categories
///
/// - **0**: success
/// - **1-9**: generic failures
/// - **10-19**: authentication / authorization outcomes
/// - **20+**: chain control
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmqAuthResult {
    /// Check accepted / operation succeeded.
    HmqAuthOk = 0,
    /// Memory allocation failed inside the plugin.
    HmqAuthOutOfMemory = 1,
    /// NULL pointer, invalid UTF-8, or out-of-range argument.
    HmqAuthInvalidArgument = 2,
    /// Application-specific plugin error.
    HmqAuthUnknown = 3,
    /// Output buffer too small (PSK key retrieval).
    HmqAuthBufferTooSmall = 4,

    // === Authentication / authorization outcomes (10-19) ===
    /// Username/password authentication failed.
    HmqAuthDenied = 10,
    /// Topic access was not granted.
    HmqAuthAclDenied = 11,

    // === Chain control (20+) ===
    /// The plugin declines to answer; the broker asks the next checker.
    HmqAuthDefer = 20,
}

impl HmqAuthResult {
    /// Decode a raw C return code. `None` for values outside the
    /// declared set (a misbehaving C plugin); callers treat those as a
    /// hard error.
    pub fn from_c_int(value: c_int) -> Option<Self> {
        match value {
            0 => Some(HmqAuthResult::HmqAuthOk),
            1 => Some(HmqAuthResult::HmqAuthOutOfMemory),
            2 => Some(HmqAuthResult::HmqAuthInvalidArgument),
            3 => Some(HmqAuthResult::HmqAuthUnknown),
            4 => Some(HmqAuthResult::HmqAuthBufferTooSmall),
            10 => Some(HmqAuthResult::HmqAuthDenied),
            11 => Some(HmqAuthResult::HmqAuthAclDenied),
            20 => Some(HmqAuthResult::HmqAuthDefer),
            _ => None,
        }
    }

    pub fn as_c_int(self) -> c_int {
        self as c_int
    }

    /// True for every code that signals a hard failure rather than a
    /// check outcome or defer.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            HmqAuthResult::HmqAuthOutOfMemory
                | HmqAuthResult::HmqAuthInvalidArgument
                | HmqAuthResult::HmqAuthUnknown
                | HmqAuthResult::HmqAuthBufferTooSmall
        )
    }
}

// =============================================================================
// Entry points
// =============================================================================

// Every entry point returns a plain C int carrying an HmqAuthResult
// discriminant; hosts decode with HmqAuthResult::from_c_int so that
// out-of-range values from foreign plugins stay representable.

/// `int hmq_auth_plugin_version(void)`
pub type PluginVersionFn = unsafe extern "C" fn() -> c_int;

/// `int hmq_auth_plugin_init(void **user_data, HmqAuthOpt *opts, int opt_count)`
pub type PluginInitFn = unsafe extern "C" fn(*mut *mut c_void, *mut HmqAuthOpt, c_int) -> c_int;

/// `int hmq_auth_plugin_cleanup(void *user_data, HmqAuthOpt *opts, int opt_count)`
pub type PluginCleanupFn = unsafe extern "C" fn(*mut c_void, *mut HmqAuthOpt, c_int) -> c_int;

/// `int hmq_auth_security_init(void *user_data, HmqAuthOpt *opts, int opt_count, bool reload)`
pub type SecurityInitFn = unsafe extern "C" fn(*mut c_void, *mut HmqAuthOpt, c_int, bool) -> c_int;

/// `int hmq_auth_security_cleanup(void *user_data, HmqAuthOpt *opts, int opt_count, bool reload)`
pub type SecurityCleanupFn =
    unsafe extern "C" fn(*mut c_void, *mut HmqAuthOpt, c_int, bool) -> c_int;

/// `int hmq_auth_acl_check(void *user_data, int access, const HmqClient *client, const HmqAclMsg *msg)`
pub type AclCheckFn =
    unsafe extern "C" fn(*mut c_void, c_int, *const HmqClient, *const HmqAclMsg) -> c_int;

/// `int hmq_auth_unpwd_check(void *user_data, const char *username, const char *password)`
///
/// Username and password may each be NULL (anonymous connects).
pub type UnpwdCheckFn = unsafe extern "C" fn(*mut c_void, *const c_char, *const c_char) -> c_int;

/// `int hmq_auth_psk_key_get(void *user_data, const char *hint, const char *identity, char *key, int max_key_len)`
///
/// The plugin writes the PSK for `identity` as a NUL-terminated
/// hexadecimal string (no leading `0x`) into `key`, bounded by
/// `max_key_len`.
pub type PskKeyGetFn =
    unsafe extern "C" fn(*mut c_void, *const c_char, *const c_char, *mut c_char, c_int) -> c_int;

// NUL-terminated symbol names, ready for the dynamic loader.
pub const SYM_PLUGIN_VERSION: &[u8] = b"hmq_auth_plugin_version\0";
pub const SYM_PLUGIN_INIT: &[u8] = b"hmq_auth_plugin_init\0";
pub const SYM_PLUGIN_CLEANUP: &[u8] = b"hmq_auth_plugin_cleanup\0";
pub const SYM_SECURITY_INIT: &[u8] = b"hmq_auth_security_init\0";
pub const SYM_SECURITY_CLEANUP: &[u8] = b"hmq_auth_security_cleanup\0";
pub const SYM_ACL_CHECK: &[u8] = b"hmq_auth_acl_check\0";
pub const SYM_UNPWD_CHECK: &[u8] = b"hmq_auth_unpwd_check\0";
pub const SYM_PSK_KEY_GET: &[u8] = b"hmq_auth_psk_key_get\0";

/// All exported entry-point names, without the trailing NUL.
pub const SYMBOL_NAMES: [&str; 8] = [
    "hmq_auth_plugin_version",
    "hmq_auth_plugin_init",
    "hmq_auth_plugin_cleanup",
    "hmq_auth_security_init",
    "hmq_auth_security_cleanup",
    "hmq_auth_acl_check",
    "hmq_auth_unpwd_check",
    "hmq_auth_psk_key_get",
];
