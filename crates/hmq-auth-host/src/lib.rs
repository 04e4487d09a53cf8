// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HMQ Auth Host
//!
//! Broker-side half of the HMQ auth plugin interface: dynamic loading
//! of plugin shared libraries, the version handshake, the plugin
//! lifecycle (init, security init/cleanup, reload, shutdown), and the
//! check-dispatch chain that resolves every authentication, ACL and
//! PSK request across built-ins and plugins.
//!
//! ```no_run
//! use hmq_auth::Access;
//! use hmq_auth_host::{AclContext, SecurityConfig};
//!
//! # fn main() -> Result<(), hmq_auth_host::HostError> {
//! let config = SecurityConfig::from_yaml_file("/etc/hmq/security.yaml")?;
//! let mut chain = config.build_chain()?;
//!
//! if chain.allow_connect(Some("sensor-7"), Some("hunter2")) {
//!     let ctx = AclContext::new("telemetry/7").with_qos(1);
//!     let _can_publish = chain.allow_access(Access::Write, &ctx);
//! }
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;

pub use chain::{AclContext, Checker, Outcome, PskOutcome, SecurityChain};
pub use config::{PluginConfig, SecurityConfig};
pub use error::HostError;
pub use loader::{AuthPluginLibrary, LoadedPlugin};

// Re-exported so embedders do not need a direct hmq-auth dependency
// for the common types.
pub use hmq_auth::{Access, AuthOptions, PskKey};
