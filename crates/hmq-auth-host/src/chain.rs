// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The broker's check-dispatch chain.
//!
//! # Security model: defer falls through, everything else resolves
//!
//! For every check the chain asks its checkers in a fixed order:
//! built-in checkers first (password file, ACL file -- whatever the
//! broker wires in), then each plugin in configuration order. The first
//! checker returning anything other than [`Outcome::Defer`] resolves
//! the check:
//!
//! - [`Outcome::Allow`] grants the request.
//! - [`Outcome::Deny`] refuses it.
//! - [`Outcome::Error`] refuses it (an erroring checker never grants
//!   access).
//! - If **every** checker defers, the request is denied. An empty chain
//!   therefore denies everything.
//!
//! An unconfigured built-in simply is not in the chain, which is the
//! contract's "considered to be deferred".

use libc::c_int;

use hmq_auth::abi::{HmqAuthResult, HmqClient};
use hmq_auth::{Access, PskKey};

use crate::error::{describe_code, HostError};

/// Outcome of one checker for a credential or ACL check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Allow,
    Deny,
    Defer,
    /// The checker failed (bad return code, marshalling failure, ...).
    Error,
}

impl Outcome {
    /// Decode a raw plugin return code. Denials of either flavour
    /// collapse to [`Outcome::Deny`]; unrecognized codes become
    /// [`Outcome::Error`].
    pub fn from_raw_code(raw: c_int) -> Self {
        match HmqAuthResult::from_c_int(raw) {
            Some(HmqAuthResult::HmqAuthOk) => Outcome::Allow,
            Some(HmqAuthResult::HmqAuthDenied) | Some(HmqAuthResult::HmqAuthAclDenied) => {
                Outcome::Deny
            }
            Some(HmqAuthResult::HmqAuthDefer) => Outcome::Defer,
            Some(_) | None => Outcome::Error,
        }
    }
}

/// Outcome of one checker for a PSK lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PskOutcome {
    /// Key found; resolves the lookup.
    Key(PskKey),
    Defer,
    Error,
}

/// Context of one ACL check, host side.
#[derive(Debug, Clone, Copy)]
pub struct AclContext<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: u8,
    pub retain: bool,
    /// Opaque client session handle; NULL outside a live broker.
    pub client: *const HmqClient,
}

impl<'a> AclContext<'a> {
    pub fn new(topic: &'a str) -> Self {
        AclContext {
            topic,
            payload: &[],
            qos: 0,
            retain: false,
            client: std::ptr::null(),
        }
    }

    pub fn with_payload(mut self, payload: &'a [u8]) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_qos(mut self, qos: u8) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }
}

/// One participant in the check chain: a loaded plugin or a broker
/// built-in.
///
/// Every check defaults to defer, mirroring the plugin-side trait.
pub trait Checker {
    /// Name used in log lines.
    fn name(&self) -> &str;

    fn check_credentials(&mut self, username: Option<&str>, password: Option<&str>) -> Outcome {
        let _ = (username, password);
        Outcome::Defer
    }

    fn check_acl(&mut self, access: Access, ctx: &AclContext<'_>) -> Outcome {
        let _ = (access, ctx);
        Outcome::Defer
    }

    fn psk_key(&mut self, hint: &str, identity: &str) -> PskOutcome {
        let _ = (hint, identity);
        PskOutcome::Defer
    }

    /// Re-run the checker's security lifecycle after a broker config
    /// reload.
    fn reload(&mut self) -> Result<(), HostError> {
        Ok(())
    }
}

/// Ordered checker chain: built-ins, then plugins.
#[derive(Default)]
pub struct SecurityChain {
    builtins: Vec<Box<dyn Checker>>,
    plugins: Vec<Box<dyn Checker>>,
}

impl SecurityChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a broker built-in checker. Built-ins always run before
    /// plugins, regardless of insertion order.
    pub fn push_builtin(&mut self, checker: Box<dyn Checker>) {
        self.builtins.push(checker);
    }

    /// Append a plugin checker; plugins run in insertion order.
    pub fn push_plugin(&mut self, checker: Box<dyn Checker>) {
        self.plugins.push(checker);
    }

    pub fn len(&self) -> usize {
        self.builtins.len() + self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builtins.is_empty() && self.plugins.is_empty()
    }

    fn checkers(&mut self) -> impl Iterator<Item = &mut Box<dyn Checker>> + '_ {
        self.builtins.iter_mut().chain(self.plugins.iter_mut())
    }

    /// Username/password check for a connecting client.
    pub fn allow_connect(&mut self, username: Option<&str>, password: Option<&str>) -> bool {
        for checker in self.checkers() {
            match checker.check_credentials(username, password) {
                Outcome::Allow => {
                    log::debug!("connect allowed by '{}'", checker.name());
                    return true;
                }
                Outcome::Deny => {
                    log::info!(
                        "connect denied by '{}' (username={:?})",
                        checker.name(),
                        username
                    );
                    return false;
                }
                Outcome::Error => {
                    log::warn!("credential check failed in '{}'; denying", checker.name());
                    return false;
                }
                Outcome::Defer => {}
            }
        }
        log::debug!("all checkers deferred credential check; denying");
        false
    }

    /// Topic access check.
    pub fn allow_access(&mut self, access: Access, ctx: &AclContext<'_>) -> bool {
        for checker in self.checkers() {
            match checker.check_acl(access, ctx) {
                Outcome::Allow => {
                    log::debug!("{access} on '{}' allowed by '{}'", ctx.topic, checker.name());
                    return true;
                }
                Outcome::Deny => {
                    log::info!("{access} on '{}' denied by '{}'", ctx.topic, checker.name());
                    return false;
                }
                Outcome::Error => {
                    log::warn!("acl check failed in '{}'; denying", checker.name());
                    return false;
                }
                Outcome::Defer => {}
            }
        }
        log::debug!("all checkers deferred {access} on '{}'; denying", ctx.topic);
        false
    }

    /// PSK lookup: first key wins, an erroring checker refuses the
    /// handshake, defer-all means no key.
    pub fn psk_lookup(&mut self, hint: &str, identity: &str) -> Option<PskKey> {
        for checker in self.checkers() {
            match checker.psk_key(hint, identity) {
                PskOutcome::Key(key) => {
                    log::debug!("psk for '{identity}' served by '{}'", checker.name());
                    return Some(key);
                }
                PskOutcome::Error => {
                    log::warn!("psk lookup failed in '{}'; refusing", checker.name());
                    return None;
                }
                PskOutcome::Defer => {}
            }
        }
        None
    }

    /// Propagate a broker config reload to every checker. Returns the
    /// number of checkers whose reload failed; failed checkers stay in
    /// the chain and their later checks resolve as errors.
    pub fn reload(&mut self) -> usize {
        let mut failed = 0;
        for checker in self.checkers() {
            if let Err(e) = checker.reload() {
                log::error!("reload of '{}' failed: {e}", checker.name());
                failed += 1;
            }
        }
        failed
    }
}

/// Raw-code helper shared by plugin-backed checkers.
pub(crate) fn log_unexpected(name: &str, raw: c_int) {
    if Outcome::from_raw_code(raw) == Outcome::Error {
        log::warn!("plugin '{name}' returned {}", describe_code(raw));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Checker scripted with fixed outcomes.
    struct Stub {
        name: String,
        credentials: Outcome,
        acl: Outcome,
        psk: PskOutcome,
        reload_ok: bool,
        calls: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
    }

    impl Stub {
        fn new(name: &str) -> Self {
            Stub {
                name: name.to_string(),
                credentials: Outcome::Defer,
                acl: Outcome::Defer,
                psk: PskOutcome::Defer,
                reload_ok: true,
                calls: Default::default(),
            }
        }

        fn credentials(mut self, o: Outcome) -> Self {
            self.credentials = o;
            self
        }

        fn acl(mut self, o: Outcome) -> Self {
            self.acl = o;
            self
        }

        fn psk(mut self, o: PskOutcome) -> Self {
            self.psk = o;
            self
        }

        fn failing_reload(mut self) -> Self {
            self.reload_ok = false;
            self
        }

        fn recording(mut self, log: std::rc::Rc<std::cell::RefCell<Vec<String>>>) -> Self {
            self.calls = log;
            self
        }
    }

    impl Checker for Stub {
        fn name(&self) -> &str {
            &self.name
        }

        fn check_credentials(&mut self, _u: Option<&str>, _p: Option<&str>) -> Outcome {
            self.calls.borrow_mut().push(self.name.clone());
            self.credentials
        }

        fn check_acl(&mut self, _access: Access, _ctx: &AclContext<'_>) -> Outcome {
            self.acl
        }

        fn psk_key(&mut self, _hint: &str, _identity: &str) -> PskOutcome {
            self.psk.clone()
        }

        fn reload(&mut self) -> Result<(), HostError> {
            if self.reload_ok {
                Ok(())
            } else {
                Err(HostError::SecurityInit {
                    name: self.name.clone(),
                    code: 3,
                })
            }
        }
    }

    fn chain(builtins: Vec<Stub>, plugins: Vec<Stub>) -> SecurityChain {
        let mut chain = SecurityChain::new();
        for b in builtins {
            chain.push_builtin(Box::new(b));
        }
        for p in plugins {
            chain.push_plugin(Box::new(p));
        }
        chain
    }

    #[test]
    fn test_empty_chain_denies_everything() {
        let mut chain = SecurityChain::new();
        assert!(!chain.allow_connect(Some("user"), Some("pw")));
        assert!(!chain.allow_access(Access::Write, &AclContext::new("t")));
        assert!(chain.psk_lookup("hint", "id").is_none());
    }

    #[test]
    fn test_defer_all_is_denied() {
        let mut chain = chain(
            vec![Stub::new("pwfile")],
            vec![Stub::new("p1"), Stub::new("p2")],
        );
        assert!(!chain.allow_connect(Some("user"), None));
    }

    #[test]
    fn test_first_allow_short_circuits() {
        let calls = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut chain = chain(
            vec![],
            vec![
                Stub::new("p1").recording(calls.clone()),
                Stub::new("p2").credentials(Outcome::Allow).recording(calls.clone()),
                Stub::new("p3").credentials(Outcome::Deny).recording(calls.clone()),
            ],
        );
        assert!(chain.allow_connect(Some("user"), None));
        assert_eq!(*calls.borrow(), vec!["p1", "p2"]);
    }

    #[test]
    fn test_builtin_accept_skips_plugins() {
        let calls = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut chain = chain(
            vec![Stub::new("pwfile")
                .credentials(Outcome::Allow)
                .recording(calls.clone())],
            vec![Stub::new("p1")
                .credentials(Outcome::Deny)
                .recording(calls.clone())],
        );
        assert!(chain.allow_connect(Some("user"), None));
        assert_eq!(*calls.borrow(), vec!["pwfile"]);
    }

    #[test]
    fn test_builtin_deny_is_terminal() {
        let mut chain = chain(
            vec![Stub::new("pwfile").credentials(Outcome::Deny)],
            vec![Stub::new("p1").credentials(Outcome::Allow)],
        );
        assert!(!chain.allow_connect(Some("user"), None));
    }

    #[test]
    fn test_builtins_run_before_plugins_regardless_of_insertion() {
        let calls = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut chain = SecurityChain::new();
        chain.push_plugin(Box::new(
            Stub::new("plugin").credentials(Outcome::Allow).recording(calls.clone()),
        ));
        chain.push_builtin(Box::new(Stub::new("builtin").recording(calls.clone())));
        assert!(chain.allow_connect(Some("u"), None));
        assert_eq!(*calls.borrow(), vec!["builtin", "plugin"]);
    }

    #[test]
    fn test_error_denies() {
        let mut chain = chain(
            vec![],
            vec![
                Stub::new("p1").credentials(Outcome::Error),
                Stub::new("p2").credentials(Outcome::Allow),
            ],
        );
        assert!(!chain.allow_connect(Some("user"), None));
    }

    #[test]
    fn test_acl_deny_then_never_reaches_allow() {
        let mut chain = chain(
            vec![],
            vec![
                Stub::new("p1").acl(Outcome::Deny),
                Stub::new("p2").acl(Outcome::Allow),
            ],
        );
        assert!(!chain.allow_access(Access::Read, &AclContext::new("sensors/1")));
    }

    #[test]
    fn test_psk_first_key_wins() {
        let key = PskKey::new("abcd1234").unwrap();
        let mut chain = chain(
            vec![],
            vec![
                Stub::new("p1"),
                Stub::new("p2").psk(PskOutcome::Key(key.clone())),
                Stub::new("p3").psk(PskOutcome::Key(PskKey::new("ffff").unwrap())),
            ],
        );
        assert_eq!(chain.psk_lookup("hint", "id"), Some(key));
    }

    #[test]
    fn test_psk_error_refuses() {
        let mut chain = chain(
            vec![],
            vec![
                Stub::new("p1").psk(PskOutcome::Error),
                Stub::new("p2").psk(PskOutcome::Key(PskKey::new("ffff").unwrap())),
            ],
        );
        assert_eq!(chain.psk_lookup("hint", "id"), None);
    }

    #[test]
    fn test_reload_counts_failures_and_keeps_going() {
        let mut chain = chain(
            vec![],
            vec![
                Stub::new("p1").failing_reload(),
                Stub::new("p2"),
                Stub::new("p3").failing_reload(),
            ],
        );
        assert_eq!(chain.reload(), 2);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_outcome_decoding() {
        assert_eq!(Outcome::from_raw_code(0), Outcome::Allow);
        assert_eq!(Outcome::from_raw_code(10), Outcome::Deny);
        assert_eq!(Outcome::from_raw_code(11), Outcome::Deny);
        assert_eq!(Outcome::from_raw_code(20), Outcome::Defer);
        assert_eq!(Outcome::from_raw_code(3), Outcome::Error);
        assert_eq!(Outcome::from_raw_code(-7), Outcome::Error);
    }
}
