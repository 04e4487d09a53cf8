// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Plugin options (`auth_opt` key/value pairs from the broker config).

use std::str::FromStr;

use libc::c_int;

use crate::abi::HmqAuthOpt;
use crate::error::AuthError;

/// Ordered key/value options handed to a plugin at init time.
///
/// Keys are not required to be unique; [`AuthOptions::get`] returns the
/// first match, preserving broker configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthOptions {
    entries: Vec<(String, String)>,
}

impl AuthOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs, keeping their order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// First value registered for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parse the value registered for `key` as `T`.
    ///
    /// Returns `Ok(None)` when the key is absent and
    /// [`AuthError::OptionParse`] when the value does not parse.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, AuthError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| AuthError::OptionParse {
                key: key.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuild the options from the raw array the broker passes to
    /// `hmq_auth_plugin_init` and friends.
    ///
    /// A NULL `value` is treated as an empty string (flag-style option);
    /// a NULL `key` is rejected.
    ///
    /// # Safety
    /// - `opts` must point to `count` consecutive valid [`HmqAuthOpt`]
    ///   entries, or be NULL with `count <= 0`.
    /// - Every non-NULL `key`/`value` must be a valid NUL-terminated
    ///   C string.
    pub unsafe fn from_raw(opts: *const HmqAuthOpt, count: c_int) -> Result<Self, AuthError> {
        if count <= 0 {
            return Ok(Self::new());
        }
        if opts.is_null() {
            return Err(AuthError::NullPointer("auth_opts"));
        }

        let mut entries = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let opt = &*opts.add(i);
            if opt.key.is_null() {
                return Err(AuthError::InvalidOption(format!("option {i} has NULL key")));
            }
            let Ok(key) = std::ffi::CStr::from_ptr(opt.key).to_str() else {
                return Err(AuthError::InvalidUtf8("option key"));
            };
            let value = if opt.value.is_null() {
                ""
            } else {
                let Ok(value) = std::ffi::CStr::from_ptr(opt.value).to_str() else {
                    return Err(AuthError::InvalidUtf8("option value"));
                };
                value
            };
            entries.push((key.to_string(), value.to_string()));
        }

        Ok(Self { entries })
    }
}

impl<'a> IntoIterator for &'a AuthOptions {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::ptr;

    fn raw_opts(pairs: &[(&str, Option<&str>)]) -> (Vec<CString>, Vec<HmqAuthOpt>) {
        let mut storage = Vec::new();
        let mut raw = Vec::new();
        for (k, v) in pairs {
            let key = CString::new(*k).unwrap();
            let key_ptr = key.as_ptr() as *mut _;
            storage.push(key);
            let value_ptr = match v {
                Some(v) => {
                    let value = CString::new(*v).unwrap();
                    let p = value.as_ptr() as *mut _;
                    storage.push(value);
                    p
                }
                None => ptr::null_mut(),
            };
            raw.push(HmqAuthOpt {
                key: key_ptr,
                value: value_ptr,
            });
        }
        (storage, raw)
    }

    #[test]
    fn test_lookup_keeps_configuration_order() {
        let opts = AuthOptions::from_pairs([("backend", "ldap"), ("backend", "file")]);
        assert_eq!(opts.get("backend"), Some("ldap"));
        assert_eq!(opts.len(), 2);
    }

    #[test]
    fn test_get_parsed() {
        let opts = AuthOptions::from_pairs([("cache_seconds", "30"), ("bad", "x")]);
        assert_eq!(opts.get_parsed::<u32>("cache_seconds").unwrap(), Some(30));
        assert_eq!(opts.get_parsed::<u32>("missing").unwrap(), None);
        assert!(opts.get_parsed::<u32>("bad").is_err());
    }

    #[test]
    fn test_from_raw_round_trip() {
        let (_storage, raw) = raw_opts(&[("server", Some("ldap://auth")), ("tls", Some("1"))]);
        let opts = unsafe { AuthOptions::from_raw(raw.as_ptr(), raw.len() as c_int) }.unwrap();
        assert_eq!(opts.get("server"), Some("ldap://auth"));
        assert_eq!(opts.get("tls"), Some("1"));
    }

    #[test]
    fn test_from_raw_null_value_is_empty_flag() {
        let (_storage, raw) = raw_opts(&[("verbose", None)]);
        let opts = unsafe { AuthOptions::from_raw(raw.as_ptr(), 1) }.unwrap();
        assert_eq!(opts.get("verbose"), Some(""));
    }

    #[test]
    fn test_from_raw_empty_and_null() {
        let opts = unsafe { AuthOptions::from_raw(ptr::null(), 0) }.unwrap();
        assert!(opts.is_empty());
        assert!(unsafe { AuthOptions::from_raw(ptr::null(), 3) }.is_err());
    }

    #[test]
    fn test_from_raw_null_key_rejected() {
        let (_storage, mut raw) = raw_opts(&[("k", Some("v"))]);
        raw[0].key = ptr::null_mut();
        assert!(unsafe { AuthOptions::from_raw(raw.as_ptr(), 1) }.is_err());
    }
}
