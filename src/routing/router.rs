//! Route compilation and lookup.
//!
//! # Responsibilities
//! - Validate and normalize configured entries
//! - Build one `RouteHandler` per entry
//! - Look up the handler for a request path
//!
//! # Design Decisions
//! - Immutable after construction (shared across tasks without locks)
//! - O(1) lookup per candidate prefix via HashMap
//! - Compilation is all-or-nothing: the first invalid entry aborts it

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ConfigError, GatewayConfig};
use crate::exec::{CompileOptions, RouteHandler};
use crate::routing::matcher::{candidate_prefixes, match_prefix, normalize_path};
use crate::security::Credentials;

/// A compiled, immutable routing table.
#[derive(Debug, Default)]
pub struct RoutingTable {
    credentials: Credentials,
    routes: HashMap<String, Arc<RouteHandler>>,
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// Normalized configured path of the matched route.
    pub route: &'a str,
    /// Part of the request path below the route, empty or starting with `/`.
    pub sub_path: &'a str,
    pub handler: &'a Arc<RouteHandler>,
}

impl RoutingTable {
    /// Compile a routing table from configuration.
    ///
    /// Entries sharing a normalized path overwrite each other; the last one wins.
    pub fn compile(config: &GatewayConfig, options: &CompileOptions) -> Result<Self, ConfigError> {
        let mut routes = HashMap::with_capacity(config.entry.len());

        for (index, entry) in config.entry.iter().enumerate() {
            let path = normalize_path(&entry.path);
            if path.is_empty() {
                return Err(ConfigError::EmptyPath { index });
            }
            if entry.cmd.is_empty() {
                return Err(ConfigError::EmptyCommand {
                    path: path.to_string(),
                });
            }

            let handler = RouteHandler::new(path, entry, options);
            if routes.insert(path.to_string(), Arc::new(handler)).is_some() {
                tracing::debug!(path = %path, "Duplicate route path, later entry wins");
            }
        }

        Ok(Self {
            credentials: Credentials::new(config.static_key.iter().cloned()),
            routes,
        })
    }

    /// An empty table: no routes, authentication open.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Credentials active for this table.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Find the route for a request path.
    ///
    /// The longest configured prefix wins.
    pub fn lookup<'a>(&'a self, path: &'a str) -> Option<RouteMatch<'a>> {
        let path = normalize_path(path);
        candidate_prefixes(path).find_map(|candidate| {
            let (route, handler) = self.routes.get_key_value(candidate)?;
            let sub_path = match_prefix(route, path)?;
            Some(RouteMatch {
                route: route.as_str(),
                sub_path,
                handler,
            })
        })
    }

    /// Number of compiled routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntryConfig;

    fn config(entries: Vec<EntryConfig>) -> GatewayConfig {
        GatewayConfig {
            static_key: vec![],
            entry: entries,
        }
    }

    #[test]
    fn normalizes_trailing_slash() {
        let table = RoutingTable::compile(
            &config(vec![EntryConfig::new("/echo/", &["/bin/cat"])]),
            &CompileOptions::default(),
        )
        .unwrap();

        let matched = table.lookup("/echo").unwrap();
        assert_eq!(matched.route, "/echo");
        assert_eq!(matched.sub_path, "");
        assert!(table.lookup("/echo/").is_some());
    }

    #[test]
    fn empty_path_is_rejected() {
        let err = RoutingTable::compile(
            &config(vec![
                EntryConfig::new("/ok", &["/bin/true"]),
                EntryConfig::new("", &["/bin/true"]),
            ]),
            &CompileOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPath { index: 1 }));
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = RoutingTable::compile(
            &config(vec![EntryConfig::new("/run", &[])]),
            &CompileOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyCommand { ref path } if path == "/run"));
    }

    #[test]
    fn duplicate_paths_last_entry_wins() {
        let table = RoutingTable::compile(
            &config(vec![
                EntryConfig::new("/run", &["/bin/echo", "first"]),
                EntryConfig::new("/run/", &["/bin/echo", "second"]).hijack(true),
            ]),
            &CompileOptions::default(),
        )
        .unwrap();

        assert_eq!(table.len(), 1);
        let handler = table.lookup("/run").unwrap().handler;
        assert_eq!(handler.command().args(), ["second"]);
        assert!(handler.is_hijack());
    }

    #[test]
    fn longest_prefix_wins() {
        let table = RoutingTable::compile(
            &config(vec![
                EntryConfig::new("/", &["/bin/true"]).sub_path(true),
                EntryConfig::new("/api", &["/bin/true"]).sub_path(true),
                EntryConfig::new("/api/v2", &["/bin/true"]),
            ]),
            &CompileOptions::default(),
        )
        .unwrap();

        let m = table.lookup("/api/v2").unwrap();
        assert_eq!((m.route, m.sub_path), ("/api/v2", ""));

        let m = table.lookup("/api/v1/users").unwrap();
        assert_eq!((m.route, m.sub_path), ("/api", "/v1/users"));

        let m = table.lookup("/apiv1").unwrap();
        assert_eq!((m.route, m.sub_path), ("/", "/apiv1"));
    }

    #[test]
    fn no_match_without_root_route() {
        let table = RoutingTable::compile(
            &config(vec![EntryConfig::new("/run", &["/bin/true"])]),
            &CompileOptions::default(),
        )
        .unwrap();
        assert!(table.lookup("/other").is_none());
        assert!(table.lookup("/").is_none());
    }

    #[test]
    fn credentials_come_from_static_key() {
        let table = RoutingTable::compile(
            &GatewayConfig {
                static_key: vec!["alice".into()],
                entry: vec![],
            },
            &CompileOptions::default(),
        )
        .unwrap();
        assert!(table.credentials().contains("alice"));
        assert!(!table.credentials().is_open());
    }
}
