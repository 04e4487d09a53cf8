// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Minimal HMQ auth plugin.
//!
//! Answers credential checks from a comma-separated `users` option and
//! defers everything else to the rest of the broker's chain:
//!
//! ```yaml
//! plugins:
//!   - path: ./libhmq_auth_samples_minimal.so
//!     options:
//!       users: "alice:secret,bob:hunter2"
//! ```
//!
//! Probe it with:
//!
//! ```bash
//! hmq-authctl unpwd --plugin ./libhmq_auth_samples_minimal.so \
//!     -o users=alice:secret --username alice --password secret
//! ```

use hmq_auth::{AuthError, AuthOptions, Decision};
use hmq_auth_plugin::{export_auth_plugin, AuthPlugin};

struct MinimalPlugin {
    users: Vec<(String, String)>,
}

impl AuthPlugin for MinimalPlugin {
    fn init(opts: &AuthOptions) -> Result<Self, AuthError> {
        let mut users = Vec::new();
        for entry in opts.get("users").unwrap_or("").split(',') {
            if entry.is_empty() {
                continue;
            }
            let Some((user, password)) = entry.split_once(':') else {
                return Err(AuthError::InvalidOption(format!(
                    "users entry '{entry}' is not USER:PASSWORD"
                )));
            };
            users.push((user.to_string(), password.to_string()));
        }
        Ok(MinimalPlugin { users })
    }

    fn check_credentials(
        &mut self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Decision, AuthError> {
        let (Some(username), Some(password)) = (username, password) else {
            return Ok(Decision::Defer);
        };
        Ok(match self.users.iter().find(|(u, _)| u == username) {
            Some((_, expected)) if expected == password => Decision::Allow,
            Some(_) => Decision::Deny,
            // Unknown users are left to the next checker in the chain.
            None => Decision::Defer,
        })
    }
}

export_auth_plugin!(MinimalPlugin);
