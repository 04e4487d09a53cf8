// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Security configuration loading.
//!
//! YAML shape:
//!
//! ```yaml
//! plugins:
//!   - path: /usr/lib/hmq/auth_ldap.so
//!     name: ldap
//!     options:
//!       server: ldap://auth.internal
//!       tls: "1"
//!   - path: /usr/lib/hmq/auth_psk.so
//! ```
//!
//! Plugins are loaded and chained in list order. Option maps are
//! passed to the plugin as its `auth_opt` array, sorted by key.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use hmq_auth::AuthOptions;

use crate::chain::SecurityChain;
use crate::error::HostError;
use crate::loader::AuthPluginLibrary;

/// One plugin declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginConfig {
    /// Path of the plugin shared library.
    pub path: PathBuf,
    /// Display name for log lines; defaults to the file stem.
    #[serde(default)]
    pub name: Option<String>,
    /// `auth_opt` key/value pairs handed to the plugin.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl PluginConfig {
    pub fn auth_options(&self) -> AuthOptions {
        AuthOptions::from_pairs(self.options.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

/// The broker's auth-plugin configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

impl SecurityConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, HostError> {
        serde_yaml::from_str(yaml).map_err(HostError::ConfigParse)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, HostError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| HostError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Load every declared plugin and build the check chain.
    ///
    /// Fails on the first plugin that cannot be loaded or initialised;
    /// a broker does not start with a partially applied security
    /// config.
    pub fn build_chain(&self) -> Result<SecurityChain, HostError> {
        let mut chain = SecurityChain::new();
        for plugin_cfg in &self.plugins {
            let lib = AuthPluginLibrary::open(&plugin_cfg.path)?;
            let plugin = lib.init(plugin_cfg.name.clone(), &plugin_cfg.auth_options())?;
            chain.push_plugin(Box::new(plugin));
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal() {
        let cfg = SecurityConfig::from_yaml_str("plugins: []").unwrap();
        assert!(cfg.plugins.is_empty());
    }

    #[test]
    fn test_parse_full() {
        let yaml = r#"
plugins:
  - path: /usr/lib/hmq/auth_ldap.so
    name: ldap
    options:
      server: ldap://auth.internal
      tls: "1"
  - path: /usr/lib/hmq/auth_psk.so
"#;
        let cfg = SecurityConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.plugins.len(), 2);
        assert_eq!(cfg.plugins[0].name.as_deref(), Some("ldap"));
        let opts = cfg.plugins[0].auth_options();
        assert_eq!(opts.get("server"), Some("ldap://auth.internal"));
        assert_eq!(opts.get("tls"), Some("1"));
        assert!(cfg.plugins[1].options.is_empty());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = "plugins:\n  - path: /a.so\n    autoload: true\n";
        assert!(matches!(
            SecurityConfig::from_yaml_str(yaml),
            Err(HostError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "plugins:\n  - path: /usr/lib/p.so").unwrap();
        let cfg = SecurityConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(cfg.plugins.len(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            SecurityConfig::from_yaml_file("/no/such/security.yaml"),
            Err(HostError::ConfigIo { .. })
        ));
    }

    #[test]
    fn test_build_chain_fails_on_missing_plugin() {
        let cfg = SecurityConfig::from_yaml_str("plugins:\n  - path: /no/such/plugin.so\n").unwrap();
        assert!(matches!(cfg.build_chain(), Err(HostError::Load { .. })));
    }
}
