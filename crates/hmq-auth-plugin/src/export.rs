// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The [`export_auth_plugin!`] macro.
//!
//! [`export_auth_plugin!`]: crate::export_auth_plugin

/// Export a type implementing [`AuthPlugin`] as the plugin's C entry
/// points.
///
/// Expands to the eight `hmq_auth_*` symbols the broker resolves after
/// `dlopen`, each delegating to the glue in [`ffi`]. Invoke it exactly
/// once per plugin crate, at the crate root.
///
/// [`AuthPlugin`]: crate::AuthPlugin
/// [`ffi`]: crate::ffi
#[macro_export]
macro_rules! export_auth_plugin {
    ($plugin:ty) => {
        #[no_mangle]
        pub extern "C" fn hmq_auth_plugin_version() -> $crate::raw::c_int {
            $crate::raw::HMQ_AUTH_PLUGIN_VERSION
        }

        /// # Safety
        /// Called by the broker with a valid out-pointer and option array.
        #[no_mangle]
        pub unsafe extern "C" fn hmq_auth_plugin_init(
            user_data: *mut *mut $crate::raw::c_void,
            opts: *mut $crate::raw::HmqAuthOpt,
            opt_count: $crate::raw::c_int,
        ) -> $crate::raw::c_int {
            $crate::ffi::plugin_init::<$plugin>(user_data, opts, opt_count).as_c_int()
        }

        /// # Safety
        /// Called by the broker once, with the pointer stored by init.
        #[no_mangle]
        pub unsafe extern "C" fn hmq_auth_plugin_cleanup(
            user_data: *mut $crate::raw::c_void,
            opts: *mut $crate::raw::HmqAuthOpt,
            opt_count: $crate::raw::c_int,
        ) -> $crate::raw::c_int {
            $crate::ffi::plugin_cleanup::<$plugin>(user_data, opts, opt_count).as_c_int()
        }

        /// # Safety
        /// Called by the broker with the pointer stored by init.
        #[no_mangle]
        pub unsafe extern "C" fn hmq_auth_security_init(
            user_data: *mut $crate::raw::c_void,
            opts: *mut $crate::raw::HmqAuthOpt,
            opt_count: $crate::raw::c_int,
            reload: bool,
        ) -> $crate::raw::c_int {
            $crate::ffi::security_init::<$plugin>(user_data, opts, opt_count, reload).as_c_int()
        }

        /// # Safety
        /// Called by the broker with the pointer stored by init.
        #[no_mangle]
        pub unsafe extern "C" fn hmq_auth_security_cleanup(
            user_data: *mut $crate::raw::c_void,
            opts: *mut $crate::raw::HmqAuthOpt,
            opt_count: $crate::raw::c_int,
            reload: bool,
        ) -> $crate::raw::c_int {
            $crate::ffi::security_cleanup::<$plugin>(user_data, opts, opt_count, reload).as_c_int()
        }

        /// # Safety
        /// Called by the broker with a valid ACL message.
        #[no_mangle]
        pub unsafe extern "C" fn hmq_auth_acl_check(
            user_data: *mut $crate::raw::c_void,
            access: $crate::raw::c_int,
            client: *const $crate::raw::HmqClient,
            msg: *const $crate::raw::HmqAclMsg,
        ) -> $crate::raw::c_int {
            $crate::ffi::acl_check::<$plugin>(user_data, access, client, msg).as_c_int()
        }

        /// # Safety
        /// Called by the broker; username/password may be NULL.
        #[no_mangle]
        pub unsafe extern "C" fn hmq_auth_unpwd_check(
            user_data: *mut $crate::raw::c_void,
            username: *const $crate::raw::c_char,
            password: *const $crate::raw::c_char,
        ) -> $crate::raw::c_int {
            $crate::ffi::unpwd_check::<$plugin>(user_data, username, password).as_c_int()
        }

        /// # Safety
        /// Called by the broker with `key` writable for `max_key_len`
        /// bytes.
        #[no_mangle]
        pub unsafe extern "C" fn hmq_auth_psk_key_get(
            user_data: *mut $crate::raw::c_void,
            hint: *const $crate::raw::c_char,
            identity: *const $crate::raw::c_char,
            key: *mut $crate::raw::c_char,
            max_key_len: $crate::raw::c_int,
        ) -> $crate::raw::c_int {
            $crate::ffi::psk_key_get::<$plugin>(user_data, hint, identity, key, max_key_len)
                .as_c_int()
        }
    };
}
