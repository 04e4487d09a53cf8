// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HMQ auth plugin probe
//!
//! Exercise an auth plugin (or a whole configured chain) without a
//! running broker.
//!
//! # Usage
//!
//! ```bash
//! # Version handshake only
//! hmq-authctl handshake ./target/release/libauth_ldap.so
//!
//! # Credential check against a single plugin with options
//! hmq-authctl unpwd --plugin ./libauth_ldap.so \
//!     -o server=ldap://auth.internal -o tls=1 \
//!     --username alice --password secret
//!
//! # ACL check against the configured chain
//! hmq-authctl acl --config /etc/hmq/security.yaml \
//!     --topic telemetry/7 --access write --qos 1
//!
//! # PSK lookup
//! hmq-authctl psk --plugin ./libauth_psk.so --hint gate --identity dev-3
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use hmq_auth::{Access, AuthOptions};
use hmq_auth_host::{
    logging, AclContext, AuthPluginLibrary, SecurityChain, SecurityConfig,
};

#[derive(Parser)]
#[command(name = "hmq-authctl")]
#[command(author = "naskel.com")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Probe and exercise HMQ auth plugins without a broker")]
struct Cli {
    /// Log filter (e.g. "debug" or "hmq_auth_host=trace")
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

/// What to run the check against: one plugin library or a configured
/// chain.
#[derive(Args)]
struct Target {
    /// Plugin shared library to load
    #[arg(long, value_name = "PATH", conflicts_with = "config")]
    plugin: Option<PathBuf>,

    /// Security config declaring the full plugin chain
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// auth_opt pair for --plugin (repeatable)
    #[arg(
        short = 'o',
        long = "option",
        value_name = "KEY=VALUE",
        value_parser = parse_option
    )]
    options: Vec<(String, String)>,
}

impl Target {
    fn build_chain(&self) -> Result<SecurityChain> {
        match (&self.plugin, &self.config) {
            (Some(path), None) => {
                let lib = AuthPluginLibrary::open(path)
                    .with_context(|| format!("loading {}", path.display()))?;
                let opts = AuthOptions::from_pairs(self.options.iter().cloned());
                let plugin = lib.init(None, &opts).context("initialising plugin")?;
                let mut chain = SecurityChain::new();
                chain.push_plugin(Box::new(plugin));
                Ok(chain)
            }
            (None, Some(path)) => {
                if !self.options.is_empty() {
                    bail!("-o/--option only applies to --plugin (use the config's options map)");
                }
                let config = SecurityConfig::from_yaml_file(path)?;
                Ok(config.build_chain()?)
            }
            (None, None) => bail!("one of --plugin or --config is required"),
            (Some(_), Some(_)) => unreachable!("clap enforces the conflict"),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Load a plugin and run the ABI version handshake
    Handshake {
        /// Plugin shared library
        plugin: PathBuf,
    },

    /// Run a username/password check
    Unpwd {
        #[command(flatten)]
        target: Target,

        /// Username (omit for an anonymous connect)
        #[arg(long)]
        username: Option<String>,

        /// Password
        #[arg(long)]
        password: Option<String>,
    },

    /// Run a topic access check
    Acl {
        #[command(flatten)]
        target: Target,

        /// Topic to check
        #[arg(long)]
        topic: String,

        /// Kind of access
        #[arg(long, value_enum, default_value = "write")]
        access: AccessArg,

        /// Message payload (publish checks)
        #[arg(long)]
        payload: Option<String>,

        /// Message QoS
        #[arg(long, default_value_t = 0)]
        qos: u8,

        /// Retain flag
        #[arg(long)]
        retain: bool,
    },

    /// Look up a TLS-PSK key
    Psk {
        #[command(flatten)]
        target: Target,

        /// psk_hint of the listener
        #[arg(long)]
        hint: String,

        /// Client identity
        #[arg(long)]
        identity: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AccessArg {
    /// Subscription delivery
    Read,
    /// Client publish
    Write,
}

impl From<AccessArg> for Access {
    fn from(arg: AccessArg) -> Self {
        match arg {
            AccessArg::Read => Access::Read,
            AccessArg::Write => Access::Write,
        }
    }
}

fn parse_option(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_with_filter(&cli.log);

    match cli.command {
        Command::Handshake { plugin } => {
            let lib = AuthPluginLibrary::open(&plugin)
                .with_context(|| format!("loading {}", plugin.display()))?;
            println!(
                "[OK] {} speaks auth plugin ABI v{}",
                lib.path().display(),
                lib.version()
            );
        }
        Command::Unpwd {
            target,
            username,
            password,
        } => {
            let mut chain = target.build_chain()?;
            let allowed = chain.allow_connect(username.as_deref(), password.as_deref());
            report("connect", allowed);
        }
        Command::Acl {
            target,
            topic,
            access,
            payload,
            qos,
            retain,
        } => {
            if qos > 2 {
                bail!("QoS must be 0, 1 or 2");
            }
            let mut chain = target.build_chain()?;
            let payload = payload.unwrap_or_default();
            let ctx = AclContext::new(&topic)
                .with_payload(payload.as_bytes())
                .with_qos(qos)
                .with_retain(retain);
            let allowed = chain.allow_access(access.into(), &ctx);
            report(&format!("{} '{topic}'", Access::from(access)), allowed);
        }
        Command::Psk {
            target,
            hint,
            identity,
        } => {
            let mut chain = target.build_chain()?;
            match chain.psk_lookup(&hint, &identity) {
                Some(key) => println!("[OK] psk for '{identity}': {key}"),
                None => println!("[DENY] no psk key for '{identity}'"),
            }
        }
    }

    Ok(())
}

fn report(what: &str, allowed: bool) {
    if allowed {
        println!("[OK] {what} allowed");
    } else {
        println!("[DENY] {what} denied");
    }
}
