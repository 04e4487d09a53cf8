// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HMQ Auth Plugin SDK
//!
//! Write an HMQ broker authentication/ACL plugin as a safe Rust type:
//! implement [`AuthPlugin`] and hand the type to
//! [`export_auth_plugin!`], which emits the eight C entry points the
//! broker dlopens. The generated glue handles NUL-terminated string
//! conversion, option marshalling, `user_data` ownership, and panic
//! isolation (a panicking plugin reports `HmqAuthUnknown` instead of
//! unwinding into the broker).
//!
//! ```no_run
//! use hmq_auth::{Access, AuthError, AuthOptions, Decision};
//! use hmq_auth_plugin::{export_auth_plugin, AclRequest, AuthPlugin};
//!
//! struct TopicGate {
//!     prefix: String,
//! }
//!
//! impl AuthPlugin for TopicGate {
//!     fn init(opts: &AuthOptions) -> Result<Self, AuthError> {
//!         Ok(TopicGate {
//!             prefix: opts.get("prefix").unwrap_or("public/").to_string(),
//!         })
//!     }
//!
//!     fn check_acl(
//!         &mut self,
//!         _access: Access,
//!         req: &AclRequest<'_>,
//!     ) -> Result<Decision, AuthError> {
//!         if req.topic.starts_with(&self.prefix) {
//!             Ok(Decision::Allow)
//!         } else {
//!             Ok(Decision::Defer)
//!         }
//!     }
//! }
//!
//! export_auth_plugin!(TopicGate);
//! ```
//!
//! Build the crate with `crate-type = ["cdylib"]` and point the broker
//! config at the resulting shared library.

pub mod ffi;

mod export;

use hmq_auth::abi::{HmqAclMsg, HmqClient};
use hmq_auth::{Access, AuthError, AuthOptions, Decision, PskKey};

/// Paths used by the [`export_auth_plugin!`] expansion. Not public API.
#[doc(hidden)]
pub mod raw {
    pub use hmq_auth::abi::*;
    pub use libc::{c_char, c_int, c_long, c_void};
}

/// Borrowed view of one ACL check.
#[derive(Debug)]
pub struct AclRequest<'a> {
    /// Topic the message is published to / delivered from.
    pub topic: &'a str,
    /// Message payload (empty for subscription checks).
    pub payload: &'a [u8],
    /// Message QoS (0, 1 or 2).
    pub qos: u8,
    /// Retain flag.
    pub retain: bool,
    client: *const HmqClient,
}

impl AclRequest<'_> {
    /// Opaque broker client handle, to be passed back to broker APIs
    /// only. NULL outside a live broker (e.g. under `hmq-authctl`).
    pub fn client(&self) -> *const HmqClient {
        self.client
    }

    /// Build the safe view from the raw message the broker passed in.
    ///
    /// # Safety
    /// - `msg` must point to a valid [`HmqAclMsg`] whose `topic` is a
    ///   valid NUL-terminated C string and whose `payload` covers
    ///   `payloadlen` readable bytes when non-NULL.
    pub(crate) unsafe fn from_raw<'a>(
        msg: *const HmqAclMsg,
        client: *const HmqClient,
    ) -> Result<AclRequest<'a>, AuthError> {
        let msg = msg.as_ref().ok_or(AuthError::NullPointer("acl msg"))?;

        if msg.topic.is_null() {
            return Err(AuthError::NullPointer("acl topic"));
        }
        let Ok(topic) = std::ffi::CStr::from_ptr(msg.topic).to_str() else {
            return Err(AuthError::InvalidUtf8("acl topic"));
        };

        if msg.payloadlen < 0 {
            return Err(AuthError::InvalidPayload);
        }
        let payload = if msg.payloadlen == 0 {
            &[][..]
        } else if msg.payload.is_null() {
            return Err(AuthError::InvalidPayload);
        } else {
            std::slice::from_raw_parts(msg.payload.cast::<u8>(), msg.payloadlen as usize)
        };

        if !(0..=2).contains(&msg.qos) {
            return Err(AuthError::InvalidQos(msg.qos));
        }

        Ok(AclRequest {
            topic,
            payload,
            qos: msg.qos as u8,
            retain: msg.retain,
            client,
        })
    }
}

/// An HMQ authentication/ACL plugin.
///
/// Only [`init`](AuthPlugin::init) is mandatory. Every check defaults
/// to [`Decision::Defer`] / no key, so a plugin implements exactly the
/// checks it wants to answer; the broker passes deferred checks to the
/// next plugin in its chain, and denies if every checker defers.
///
/// Returning `Err` from a check maps to `HmqAuthUnknown` on the wire,
/// which the broker treats as a denial of that request.
pub trait AuthPlugin: Sized + Send {
    /// Construct the plugin from the `auth_opt` pairs in the broker
    /// configuration. Called exactly once, right after the version
    /// handshake.
    fn init(opts: &AuthOptions) -> Result<Self, AuthError>;

    /// Called once at broker shutdown, after
    /// [`security_cleanup`](AuthPlugin::security_cleanup). The instance
    /// is dropped afterwards.
    fn cleanup(&mut self) {}

    /// Security startup. Re-invoked with `reload = true` after each
    /// broker config reload (preceded by
    /// [`security_cleanup`](AuthPlugin::security_cleanup) with
    /// `reload = true`).
    fn security_init(&mut self, opts: &AuthOptions, reload: bool) -> Result<(), AuthError> {
        let _ = (opts, reload);
        Ok(())
    }

    /// Counterpart of [`security_init`](AuthPlugin::security_init).
    fn security_cleanup(&mut self, reload: bool) {
        let _ = reload;
    }

    /// Username/password check for a connecting client. Either field
    /// may be absent (anonymous connects).
    fn check_credentials(
        &mut self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Decision, AuthError> {
        let _ = (username, password);
        Ok(Decision::Defer)
    }

    /// Topic access check. `Access::Read` covers delivery to a
    /// subscriber, `Access::Write` a client publish.
    fn check_acl(&mut self, access: Access, req: &AclRequest<'_>) -> Result<Decision, AuthError> {
        let _ = (access, req);
        Ok(Decision::Defer)
    }

    /// TLS-PSK lookup for `identity` under the listener's `hint`.
    /// `Ok(None)` defers to the next checker.
    fn psk_key(&mut self, hint: &str, identity: &str) -> Result<Option<PskKey>, AuthError> {
        let _ = (hint, identity);
        Ok(None)
    }
}
