// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Entry-point glue shared by every [`export_auth_plugin!`] expansion.
//!
//! Each function here is the body of one generated `hmq_auth_*` symbol:
//! it validates the raw arguments, recovers the plugin instance from
//! `user_data`, and runs the corresponding [`AuthPlugin`] method inside
//! `catch_unwind`. Unwinding across the C boundary is never allowed; a
//! panicking plugin reports [`HmqAuthResult::HmqAuthUnknown`].
//!
//! [`export_auth_plugin!`]: crate::export_auth_plugin

use std::ffi::CStr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use libc::{c_char, c_int, c_void};

use hmq_auth::abi::{HmqAclMsg, HmqAuthOpt, HmqAuthResult, HmqClient};
use hmq_auth::{Access, AuthError, AuthOptions, CheckKind, PskKey};

use crate::{AclRequest, AuthPlugin};

/// `hmq_auth_plugin_init` body: construct `P` and park it in
/// `user_data`.
///
/// # Safety
/// Arguments must satisfy the contract of `PluginInitFn`.
pub unsafe fn plugin_init<P: AuthPlugin>(
    user_data: *mut *mut c_void,
    opts: *mut HmqAuthOpt,
    opt_count: c_int,
) -> HmqAuthResult {
    if user_data.is_null() {
        return HmqAuthResult::HmqAuthInvalidArgument;
    }
    user_data.write(ptr::null_mut());

    let opts = match AuthOptions::from_raw(opts, opt_count) {
        Ok(opts) => opts,
        Err(e) => {
            log::error!("plugin init: bad option array: {e}");
            return e.to_result();
        }
    };

    match catch_unwind(|| P::init(&opts)) {
        Ok(Ok(plugin)) => {
            user_data.write(Box::into_raw(Box::new(plugin)).cast::<c_void>());
            HmqAuthResult::HmqAuthOk
        }
        Ok(Err(e)) => {
            log::error!("plugin init failed: {e}");
            e.to_result()
        }
        Err(_) => {
            log::error!("plugin init panicked");
            HmqAuthResult::HmqAuthUnknown
        }
    }
}

/// `hmq_auth_plugin_cleanup` body: run [`AuthPlugin::cleanup`] and drop
/// the instance. NULL `user_data` is a no-op (init never stored one).
///
/// # Safety
/// `user_data` must be the pointer stored by [`plugin_init`], or NULL.
pub unsafe fn plugin_cleanup<P: AuthPlugin>(
    user_data: *mut c_void,
    _opts: *mut HmqAuthOpt,
    _opt_count: c_int,
) -> HmqAuthResult {
    if user_data.is_null() {
        return HmqAuthResult::HmqAuthOk;
    }

    let mut plugin = Box::from_raw(user_data.cast::<P>());
    let result = catch_unwind(AssertUnwindSafe(|| plugin.cleanup()));
    drop(plugin);

    match result {
        Ok(()) => HmqAuthResult::HmqAuthOk,
        Err(_) => {
            log::error!("plugin cleanup panicked");
            HmqAuthResult::HmqAuthUnknown
        }
    }
}

/// `hmq_auth_security_init` body.
///
/// # Safety
/// Arguments must satisfy the contract of `SecurityInitFn`.
pub unsafe fn security_init<P: AuthPlugin>(
    user_data: *mut c_void,
    opts: *mut HmqAuthOpt,
    opt_count: c_int,
    reload: bool,
) -> HmqAuthResult {
    let Some(plugin) = plugin_mut::<P>(user_data) else {
        return HmqAuthResult::HmqAuthInvalidArgument;
    };

    let opts = match AuthOptions::from_raw(opts, opt_count) {
        Ok(opts) => opts,
        Err(e) => {
            log::error!("security init: bad option array: {e}");
            return e.to_result();
        }
    };

    match catch_unwind(AssertUnwindSafe(|| plugin.security_init(&opts, reload))) {
        Ok(Ok(())) => HmqAuthResult::HmqAuthOk,
        Ok(Err(e)) => {
            log::error!("security init (reload={reload}) failed: {e}");
            e.to_result()
        }
        Err(_) => {
            log::error!("security init panicked");
            HmqAuthResult::HmqAuthUnknown
        }
    }
}

/// `hmq_auth_security_cleanup` body. The option array is accepted for
/// ABI compatibility but not re-parsed; the plugin already owns its
/// state.
///
/// # Safety
/// `user_data` must be the pointer stored by [`plugin_init`], or NULL.
pub unsafe fn security_cleanup<P: AuthPlugin>(
    user_data: *mut c_void,
    _opts: *mut HmqAuthOpt,
    _opt_count: c_int,
    reload: bool,
) -> HmqAuthResult {
    let Some(plugin) = plugin_mut::<P>(user_data) else {
        return HmqAuthResult::HmqAuthInvalidArgument;
    };

    match catch_unwind(AssertUnwindSafe(|| plugin.security_cleanup(reload))) {
        Ok(()) => HmqAuthResult::HmqAuthOk,
        Err(_) => {
            log::error!("security cleanup panicked");
            HmqAuthResult::HmqAuthUnknown
        }
    }
}

/// `hmq_auth_acl_check` body.
///
/// # Safety
/// Arguments must satisfy the contract of `AclCheckFn`.
pub unsafe fn acl_check<P: AuthPlugin>(
    user_data: *mut c_void,
    access: c_int,
    client: *const HmqClient,
    msg: *const HmqAclMsg,
) -> HmqAuthResult {
    let Some(plugin) = plugin_mut::<P>(user_data) else {
        return HmqAuthResult::HmqAuthInvalidArgument;
    };
    let Some(access) = Access::from_c_int(access) else {
        return HmqAuthResult::HmqAuthInvalidArgument;
    };
    let req = match AclRequest::from_raw(msg, client) {
        Ok(req) => req,
        Err(e) => return e.to_result(),
    };

    match catch_unwind(AssertUnwindSafe(|| plugin.check_acl(access, &req))) {
        Ok(Ok(decision)) => decision.to_result(CheckKind::Acl),
        Ok(Err(e)) => {
            log::error!("acl check errored: {e}");
            e.to_result()
        }
        Err(_) => {
            log::error!("acl check panicked");
            HmqAuthResult::HmqAuthUnknown
        }
    }
}

/// `hmq_auth_unpwd_check` body. NULL username/password arrive as
/// `None`.
///
/// # Safety
/// Arguments must satisfy the contract of `UnpwdCheckFn`.
pub unsafe fn unpwd_check<P: AuthPlugin>(
    user_data: *mut c_void,
    username: *const c_char,
    password: *const c_char,
) -> HmqAuthResult {
    let Some(plugin) = plugin_mut::<P>(user_data) else {
        return HmqAuthResult::HmqAuthInvalidArgument;
    };
    let username = match opt_str(username, "username") {
        Ok(u) => u,
        Err(e) => return e.to_result(),
    };
    let password = match opt_str(password, "password") {
        Ok(p) => p,
        Err(e) => return e.to_result(),
    };

    match catch_unwind(AssertUnwindSafe(|| {
        plugin.check_credentials(username, password)
    })) {
        Ok(Ok(decision)) => decision.to_result(CheckKind::Credentials),
        Ok(Err(e)) => {
            log::error!("credential check errored: {e}");
            e.to_result()
        }
        Err(_) => {
            log::error!("credential check panicked");
            HmqAuthResult::HmqAuthUnknown
        }
    }
}

/// `hmq_auth_psk_key_get` body: look the key up and copy it into the
/// broker-supplied buffer.
///
/// # Safety
/// Arguments must satisfy the contract of `PskKeyGetFn`; `key` must be
/// writable for `max_key_len` bytes.
pub unsafe fn psk_key_get<P: AuthPlugin>(
    user_data: *mut c_void,
    hint: *const c_char,
    identity: *const c_char,
    key: *mut c_char,
    max_key_len: c_int,
) -> HmqAuthResult {
    let Some(plugin) = plugin_mut::<P>(user_data) else {
        return HmqAuthResult::HmqAuthInvalidArgument;
    };
    if key.is_null() || max_key_len <= 0 {
        return HmqAuthResult::HmqAuthInvalidArgument;
    }
    let (hint, identity) = match (req_str(hint, "psk hint"), req_str(identity, "psk identity")) {
        (Ok(h), Ok(i)) => (h, i),
        (Err(e), _) | (_, Err(e)) => return e.to_result(),
    };

    match catch_unwind(AssertUnwindSafe(|| plugin.psk_key(hint, identity))) {
        Ok(Ok(Some(psk))) => match write_psk_key(&psk, key, max_key_len) {
            Ok(()) => HmqAuthResult::HmqAuthOk,
            Err(e) => {
                log::error!("psk key for '{identity}' not returned: {e}");
                e.to_result()
            }
        },
        Ok(Ok(None)) => HmqAuthResult::HmqAuthDefer,
        Ok(Err(e)) => {
            log::error!("psk lookup errored: {e}");
            e.to_result()
        }
        Err(_) => {
            log::error!("psk lookup panicked");
            HmqAuthResult::HmqAuthUnknown
        }
    }
}

/// Copy `psk` into `buf` as a NUL-terminated string bounded by
/// `max_key_len` bytes.
///
/// # Safety
/// `buf` must be writable for `max_key_len` bytes.
pub unsafe fn write_psk_key(
    psk: &PskKey,
    buf: *mut c_char,
    max_key_len: c_int,
) -> Result<(), AuthError> {
    let needed = psk.len() + 1;
    let max = max_key_len as usize;
    if needed > max {
        return Err(AuthError::KeyBufferTooSmall { needed, max });
    }
    ptr::copy_nonoverlapping(psk.as_str().as_ptr(), buf.cast::<u8>(), psk.len());
    buf.add(psk.len()).write(0);
    Ok(())
}

unsafe fn plugin_mut<'a, P: AuthPlugin>(user_data: *mut c_void) -> Option<&'a mut P> {
    user_data.cast::<P>().as_mut()
}

unsafe fn opt_str<'a>(
    ptr: *const c_char,
    what: &'static str,
) -> Result<Option<&'a str>, AuthError> {
    if ptr.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(Some)
        .map_err(|_| AuthError::InvalidUtf8(what))
}

unsafe fn req_str<'a>(ptr: *const c_char, what: &'static str) -> Result<&'a str, AuthError> {
    if ptr.is_null() {
        return Err(AuthError::NullPointer(what));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| AuthError::InvalidUtf8(what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmq_auth::Decision;
    use std::ffi::CString;

    struct EchoPlugin {
        allow_user: String,
    }

    impl AuthPlugin for EchoPlugin {
        fn init(opts: &AuthOptions) -> Result<Self, AuthError> {
            Ok(EchoPlugin {
                allow_user: opts.get("allow_user").unwrap_or("root").to_string(),
            })
        }

        fn check_credentials(
            &mut self,
            username: Option<&str>,
            _password: Option<&str>,
        ) -> Result<Decision, AuthError> {
            Ok(match username {
                Some(u) if u == self.allow_user => Decision::Allow,
                Some(_) => Decision::Deny,
                None => Decision::Defer,
            })
        }

        fn psk_key(&mut self, _hint: &str, identity: &str) -> Result<Option<PskKey>, AuthError> {
            if identity == "known" {
                Ok(Some(PskKey::new("deadbeef")?))
            } else {
                Ok(None)
            }
        }
    }

    unsafe fn init_echo(opts: &[(&str, &str)]) -> *mut c_void {
        let storage: Vec<(CString, CString)> = opts
            .iter()
            .map(|(k, v)| (CString::new(*k).unwrap(), CString::new(*v).unwrap()))
            .collect();
        let mut raw: Vec<HmqAuthOpt> = storage
            .iter()
            .map(|(k, v)| HmqAuthOpt {
                key: k.as_ptr() as *mut c_char,
                value: v.as_ptr() as *mut c_char,
            })
            .collect();

        let mut user_data: *mut c_void = ptr::null_mut();
        let rc = plugin_init::<EchoPlugin>(&mut user_data, raw.as_mut_ptr(), raw.len() as c_int);
        assert_eq!(rc, HmqAuthResult::HmqAuthOk);
        assert!(!user_data.is_null());
        user_data
    }

    #[test]
    fn test_init_null_user_data_rejected() {
        let rc = unsafe { plugin_init::<EchoPlugin>(ptr::null_mut(), ptr::null_mut(), 0) };
        assert_eq!(rc, HmqAuthResult::HmqAuthInvalidArgument);
    }

    #[test]
    fn test_unpwd_check_decisions() {
        unsafe {
            let ud = init_echo(&[("allow_user", "alice")]);

            let alice = CString::new("alice").unwrap();
            let bob = CString::new("bob").unwrap();
            let pw = CString::new("secret").unwrap();

            assert_eq!(
                unpwd_check::<EchoPlugin>(ud, alice.as_ptr(), pw.as_ptr()),
                HmqAuthResult::HmqAuthOk
            );
            assert_eq!(
                unpwd_check::<EchoPlugin>(ud, bob.as_ptr(), pw.as_ptr()),
                HmqAuthResult::HmqAuthDenied
            );
            // anonymous connect defers
            assert_eq!(
                unpwd_check::<EchoPlugin>(ud, ptr::null(), ptr::null()),
                HmqAuthResult::HmqAuthDefer
            );

            plugin_cleanup::<EchoPlugin>(ud, ptr::null_mut(), 0);
        }
    }

    #[test]
    fn test_check_with_null_user_data_rejected() {
        let user = CString::new("alice").unwrap();
        let rc = unsafe { unpwd_check::<EchoPlugin>(ptr::null_mut(), user.as_ptr(), ptr::null()) };
        assert_eq!(rc, HmqAuthResult::HmqAuthInvalidArgument);
    }

    #[test]
    fn test_psk_key_copy_and_defer() {
        unsafe {
            let ud = init_echo(&[]);
            let hint = CString::new("gate").unwrap();
            let known = CString::new("known").unwrap();
            let other = CString::new("other").unwrap();
            let mut buf = [0 as c_char; 32];

            let rc = psk_key_get::<EchoPlugin>(
                ud,
                hint.as_ptr(),
                known.as_ptr(),
                buf.as_mut_ptr(),
                buf.len() as c_int,
            );
            assert_eq!(rc, HmqAuthResult::HmqAuthOk);
            let written = CStr::from_ptr(buf.as_ptr()).to_str().unwrap();
            assert_eq!(written, "deadbeef");

            let rc = psk_key_get::<EchoPlugin>(
                ud,
                hint.as_ptr(),
                other.as_ptr(),
                buf.as_mut_ptr(),
                buf.len() as c_int,
            );
            assert_eq!(rc, HmqAuthResult::HmqAuthDefer);

            plugin_cleanup::<EchoPlugin>(ud, ptr::null_mut(), 0);
        }
    }

    #[test]
    fn test_psk_key_buffer_too_small() {
        unsafe {
            let ud = init_echo(&[]);
            let hint = CString::new("gate").unwrap();
            let known = CString::new("known").unwrap();
            // "deadbeef" + NUL needs 9 bytes
            let mut buf = [0 as c_char; 8];

            let rc = psk_key_get::<EchoPlugin>(
                ud,
                hint.as_ptr(),
                known.as_ptr(),
                buf.as_mut_ptr(),
                buf.len() as c_int,
            );
            assert_eq!(rc, HmqAuthResult::HmqAuthBufferTooSmall);

            plugin_cleanup::<EchoPlugin>(ud, ptr::null_mut(), 0);
        }
    }

    #[test]
    fn test_cleanup_null_is_noop() {
        let rc = unsafe { plugin_cleanup::<EchoPlugin>(ptr::null_mut(), ptr::null_mut(), 0) };
        assert_eq!(rc, HmqAuthResult::HmqAuthOk);
    }
}
