// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic loading of auth plugin shared libraries.
//!
//! Lifecycle driven here, in contract order:
//!
//! - load: `dlopen`, resolve all eight symbols, version handshake,
//!   `hmq_auth_plugin_init`, `hmq_auth_security_init(reload = false)`.
//! - reload: `hmq_auth_security_cleanup(true)` then
//!   `hmq_auth_security_init(true)`.
//! - drop: `hmq_auth_security_cleanup(false)` then
//!   `hmq_auth_plugin_cleanup`, before the library is unloaded.

use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};
use std::ptr;

use libc::{c_char, c_int, c_void};
use libloading::Library;

use hmq_auth::abi::{
    AclCheckFn, HmqAclMsg, HmqAuthOpt, HmqAuthResult, PluginCleanupFn, PluginInitFn,
    PluginVersionFn, PskKeyGetFn, SecurityCleanupFn, SecurityInitFn, UnpwdCheckFn,
    HMQ_AUTH_PLUGIN_VERSION, HMQ_AUTH_PSK_MAX_KEY_LEN, SYM_ACL_CHECK, SYM_PLUGIN_CLEANUP,
    SYM_PLUGIN_INIT, SYM_PLUGIN_VERSION, SYM_PSK_KEY_GET, SYM_SECURITY_CLEANUP, SYM_SECURITY_INIT,
    SYM_UNPWD_CHECK,
};
use hmq_auth::{Access, AuthOptions, PskKey};

use crate::chain::{log_unexpected, AclContext, Checker, Outcome, PskOutcome};
use crate::error::{describe_code, HostError};

/// Resolved entry points of one plugin library.
#[derive(Clone, Copy, Debug)]
struct PluginVtable {
    version: PluginVersionFn,
    init: PluginInitFn,
    cleanup: PluginCleanupFn,
    security_init: SecurityInitFn,
    security_cleanup: SecurityCleanupFn,
    acl_check: AclCheckFn,
    unpwd_check: UnpwdCheckFn,
    psk_key_get: PskKeyGetFn,
}

/// Marshalled `auth_opt` array handed to the plugin. Owns the C string
/// storage; the raw pointers stay valid for as long as this value
/// lives, which the loader ties to the plugin's lifetime.
struct OptionArray {
    _storage: Vec<(CString, CString)>,
    raw: Vec<HmqAuthOpt>,
}

impl OptionArray {
    fn new(options: &AuthOptions) -> Result<Self, HostError> {
        let mut storage = Vec::with_capacity(options.len());
        for (key, value) in options.iter() {
            let ckey = CString::new(key).map_err(|_| HostError::BadOption {
                key: key.to_string(),
            })?;
            let cvalue = CString::new(value).map_err(|_| HostError::BadOption {
                key: key.to_string(),
            })?;
            storage.push((ckey, cvalue));
        }
        let raw = storage
            .iter()
            .map(|(k, v)| HmqAuthOpt {
                key: k.as_ptr() as *mut c_char,
                value: v.as_ptr() as *mut c_char,
            })
            .collect();
        Ok(OptionArray {
            _storage: storage,
            raw,
        })
    }

    fn ptr(&mut self) -> *mut HmqAuthOpt {
        if self.raw.is_empty() {
            ptr::null_mut()
        } else {
            self.raw.as_mut_ptr()
        }
    }

    fn count(&self) -> c_int {
        self.raw.len() as c_int
    }
}

/// A plugin library that passed symbol resolution and the version
/// handshake, but has not been initialised yet.
#[derive(Debug)]
pub struct AuthPluginLibrary {
    path: PathBuf,
    vtable: PluginVtable,
    // Held only to keep the shared object mapped while the vtable
    // pointers are callable.
    _lib: Library,
}

impl AuthPluginLibrary {
    /// `dlopen` the library, resolve every entry point and run the
    /// version handshake.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HostError> {
        let path = path.as_ref().to_path_buf();
        let lib = unsafe { Library::new(&path) }.map_err(|source| HostError::Load {
            path: path.clone(),
            source,
        })?;
        let vtable = resolve(&lib)?;

        let found = unsafe { (vtable.version)() };
        if found != HMQ_AUTH_PLUGIN_VERSION {
            return Err(HostError::VersionMismatch {
                path,
                found,
                expected: HMQ_AUTH_PLUGIN_VERSION,
            });
        }

        log::debug!("loaded auth plugin {} (abi v{found})", path.display());
        Ok(AuthPluginLibrary {
            path,
            vtable,
            _lib: lib,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// ABI version the plugin reported during the handshake.
    pub fn version(&self) -> c_int {
        unsafe { (self.vtable.version)() }
    }

    /// Initialise the plugin: `hmq_auth_plugin_init` followed by
    /// `hmq_auth_security_init(reload = false)`.
    ///
    /// `name` is used in log lines and defaults to the file stem.
    pub fn init(
        self,
        name: Option<String>,
        options: &AuthOptions,
    ) -> Result<LoadedPlugin, HostError> {
        let name = name.unwrap_or_else(|| {
            self.path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.display().to_string())
        });
        let mut opts = OptionArray::new(options)?;

        let mut user_data: *mut c_void = ptr::null_mut();
        let rc = unsafe { (self.vtable.init)(&mut user_data, opts.ptr(), opts.count()) };
        if rc != HmqAuthResult::HmqAuthOk.as_c_int() {
            return Err(HostError::PluginInit {
                path: self.path,
                code: rc,
            });
        }

        let mut plugin = LoadedPlugin {
            name,
            lib: self,
            opts,
            user_data,
        };
        plugin.security_init(false)?;
        log::info!("auth plugin '{}' initialised", plugin.name);
        Ok(plugin)
    }
}

fn resolve(lib: &Library) -> Result<PluginVtable, HostError> {
    unsafe {
        Ok(PluginVtable {
            version: sym(lib, "hmq_auth_plugin_version", SYM_PLUGIN_VERSION)?,
            init: sym(lib, "hmq_auth_plugin_init", SYM_PLUGIN_INIT)?,
            cleanup: sym(lib, "hmq_auth_plugin_cleanup", SYM_PLUGIN_CLEANUP)?,
            security_init: sym(lib, "hmq_auth_security_init", SYM_SECURITY_INIT)?,
            security_cleanup: sym(lib, "hmq_auth_security_cleanup", SYM_SECURITY_CLEANUP)?,
            acl_check: sym(lib, "hmq_auth_acl_check", SYM_ACL_CHECK)?,
            unpwd_check: sym(lib, "hmq_auth_unpwd_check", SYM_UNPWD_CHECK)?,
            psk_key_get: sym(lib, "hmq_auth_psk_key_get", SYM_PSK_KEY_GET)?,
        })
    }
}

unsafe fn sym<T: Copy>(
    lib: &Library,
    name: &'static str,
    bytes: &[u8],
) -> Result<T, HostError> {
    lib.get::<T>(bytes)
        .map(|s| *s)
        .map_err(|source| HostError::MissingSymbol {
            symbol: name,
            source,
        })
}

/// An initialised plugin. Implements [`Checker`], so it slots straight
/// into a [`SecurityChain`](crate::chain::SecurityChain).
pub struct LoadedPlugin {
    name: String,
    lib: AuthPluginLibrary,
    opts: OptionArray,
    user_data: *mut c_void,
}

impl LoadedPlugin {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        self.lib.path()
    }

    fn security_init(&mut self, reload: bool) -> Result<(), HostError> {
        let rc = unsafe {
            (self.lib.vtable.security_init)(
                self.user_data,
                self.opts.ptr(),
                self.opts.count(),
                reload,
            )
        };
        if rc == HmqAuthResult::HmqAuthOk.as_c_int() {
            Ok(())
        } else {
            Err(HostError::SecurityInit {
                name: self.name.clone(),
                code: rc,
            })
        }
    }

    fn security_cleanup(&mut self, reload: bool) {
        let rc = unsafe {
            (self.lib.vtable.security_cleanup)(
                self.user_data,
                self.opts.ptr(),
                self.opts.count(),
                reload,
            )
        };
        if rc != HmqAuthResult::HmqAuthOk.as_c_int() {
            log::warn!(
                "plugin '{}' security cleanup returned {}",
                self.name,
                describe_code(rc)
            );
        }
    }
}

impl Checker for LoadedPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_credentials(&mut self, username: Option<&str>, password: Option<&str>) -> Outcome {
        let username = match username.map(CString::new).transpose() {
            Ok(u) => u,
            Err(_) => return Outcome::Error,
        };
        let password = match password.map(CString::new).transpose() {
            Ok(p) => p,
            Err(_) => return Outcome::Error,
        };
        let uptr = username.as_ref().map_or(ptr::null(), |u| u.as_ptr());
        let pptr = password.as_ref().map_or(ptr::null(), |p| p.as_ptr());

        let raw = unsafe { (self.lib.vtable.unpwd_check)(self.user_data, uptr, pptr) };
        log_unexpected(&self.name, raw);
        Outcome::from_raw_code(raw)
    }

    fn check_acl(&mut self, access: Access, ctx: &AclContext<'_>) -> Outcome {
        let Ok(topic) = CString::new(ctx.topic) else {
            return Outcome::Error;
        };
        let msg = HmqAclMsg {
            topic: topic.as_ptr(),
            payload: if ctx.payload.is_empty() {
                ptr::null()
            } else {
                ctx.payload.as_ptr().cast()
            },
            payloadlen: ctx.payload.len() as _,
            qos: c_int::from(ctx.qos),
            retain: ctx.retain,
        };

        let raw = unsafe {
            (self.lib.vtable.acl_check)(self.user_data, access.as_c_int(), ctx.client, &msg)
        };
        log_unexpected(&self.name, raw);
        Outcome::from_raw_code(raw)
    }

    fn psk_key(&mut self, hint: &str, identity: &str) -> PskOutcome {
        let (Ok(hint), Ok(identity)) = (CString::new(hint), CString::new(identity)) else {
            return PskOutcome::Error;
        };
        let mut buf = [0u8; HMQ_AUTH_PSK_MAX_KEY_LEN];

        let raw = unsafe {
            (self.lib.vtable.psk_key_get)(
                self.user_data,
                hint.as_ptr(),
                identity.as_ptr(),
                buf.as_mut_ptr().cast::<c_char>(),
                buf.len() as c_int,
            )
        };

        match Outcome::from_raw_code(raw) {
            Outcome::Allow => {
                let Ok(hex) = CStr::from_bytes_until_nul(&buf) else {
                    log::warn!("plugin '{}' returned an unterminated psk key", self.name);
                    return PskOutcome::Error;
                };
                let Ok(hex) = hex.to_str() else {
                    return PskOutcome::Error;
                };
                match PskKey::new(hex) {
                    Ok(key) => PskOutcome::Key(key),
                    Err(e) => {
                        log::warn!("plugin '{}' returned a bad psk key: {e}", self.name);
                        PskOutcome::Error
                    }
                }
            }
            Outcome::Defer => PskOutcome::Defer,
            Outcome::Deny | Outcome::Error => {
                log_unexpected(&self.name, raw);
                PskOutcome::Error
            }
        }
    }

    fn reload(&mut self) -> Result<(), HostError> {
        self.security_cleanup(true);
        self.security_init(true)
    }
}

impl Drop for LoadedPlugin {
    fn drop(&mut self) {
        self.security_cleanup(false);
        let rc = unsafe {
            (self.lib.vtable.cleanup)(self.user_data, self.opts.ptr(), self.opts.count())
        };
        if rc != HmqAuthResult::HmqAuthOk.as_c_int() {
            log::warn!(
                "plugin '{}' cleanup returned {}",
                self.name,
                describe_code(rc)
            );
        }
        self.user_data = ptr::null_mut();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file() {
        let err = AuthPluginLibrary::open("/nonexistent/libauth.so").unwrap_err();
        assert!(matches!(err, HostError::Load { .. }));
    }

    #[test]
    fn test_open_not_a_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.so");
        std::fs::write(&path, b"definitely not an ELF").unwrap();
        let err = AuthPluginLibrary::open(&path).unwrap_err();
        assert!(matches!(err, HostError::Load { .. }));
    }

    #[test]
    fn test_option_array_marshalling() {
        let options = AuthOptions::from_pairs([("backend", "files"), ("debug", "")]);
        let mut arr = OptionArray::new(&options).unwrap();
        assert_eq!(arr.count(), 2);
        let first = unsafe { &*arr.ptr() };
        let key = unsafe { CStr::from_ptr(first.key) }.to_str().unwrap();
        assert_eq!(key, "backend");
    }

    #[test]
    fn test_option_array_rejects_interior_nul() {
        let options = AuthOptions::from_pairs([("bad\0key", "v")]);
        assert!(matches!(
            OptionArray::new(&options),
            Err(HostError::BadOption { .. })
        ));
    }

    #[test]
    fn test_empty_option_array_is_null() {
        let mut arr = OptionArray::new(&AuthOptions::new()).unwrap();
        assert_eq!(arr.count(), 0);
        assert!(arr.ptr().is_null());
    }
}
