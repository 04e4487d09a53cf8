// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HMQ Auth Plugin Interface
//!
//! Core types for the HMQ broker's authentication and access-control
//! plugin interface. A plugin is a shared library the broker loads at
//! startup; the broker delegates three kinds of checks to it:
//!
//! - username/password authentication on CONNECT
//! - per-topic read/write access control (ACL)
//! - TLS-PSK key lookup for listeners using pre-shared keys
//!
//! This crate defines the raw C contract ([`abi`]) shared by both sides
//! of the boundary, plus the safe option/decision types used by the
//! plugin SDK (`hmq-auth-plugin`) and the broker-side loader
//! (`hmq-auth-host`).
//!
//! The C header for plugins written in C (`hmq_auth_plugin.h`) is
//! generated from [`abi`] at build time.

pub mod abi;
pub mod decision;
pub mod error;
pub mod options;

pub use decision::{Access, CheckKind, Decision, PskKey};
pub use error::AuthError;
pub use options::AuthOptions;

/// Convenience alias used throughout the auth crates.
pub type Result<T> = std::result::Result<T, AuthError>;
