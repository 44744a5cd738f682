//! Process-wide holder of the active routing table.
//!
//! # Design Decisions
//! - The table lives behind `ArcSwap`: readers take a snapshot `Arc` and
//!   keep it for the whole request, reload publishes with one pointer swap
//! - Reloads are serialized among themselves but never block readers
//! - A failed reload leaves the previous table in place

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use crate::config::{load_config, ConfigError, GatewayConfig};
use crate::exec::CompileOptions;
use crate::observability::metrics;
use crate::routing::RoutingTable;

/// Shared gateway state: the current routing table and how to rebuild it.
#[derive(Debug)]
pub struct GatewayState {
    table: ArcSwap<RoutingTable>,
    config_path: PathBuf,
    options: CompileOptions,
    reload_lock: Mutex<()>,
}

impl GatewayState {
    /// State with an empty table. Nothing is loaded yet.
    pub fn new(config_path: impl Into<PathBuf>, options: CompileOptions) -> Self {
        Self {
            table: ArcSwap::from_pointee(RoutingTable::empty()),
            config_path: config_path.into(),
            options,
            reload_lock: Mutex::new(()),
        }
    }

    /// Create the state and attempt the first load.
    ///
    /// A config that cannot be loaded is logged and the gateway starts with
    /// an empty table (everything 404) until a later reload succeeds.
    pub fn bootstrap(config_path: impl Into<PathBuf>, options: CompileOptions) -> Self {
        let state = Self::new(config_path, options);
        if let Err(e) = state.reload() {
            tracing::error!(
                path = ?state.config_path,
                error = %e,
                "Cannot load initial config, starting with an empty routing table"
            );
        }
        state
    }

    /// Snapshot of the active table.
    pub fn table(&self) -> Arc<RoutingTable> {
        self.table.load_full()
    }

    /// Re-read the config file and publish a freshly compiled table.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let _guard = self.reload_lock.lock().unwrap_or_else(|e| e.into_inner());

        let result = load_config(&self.config_path).and_then(|config| self.apply(&config));
        match &result {
            Ok(()) => metrics::record_reload(true),
            Err(e) => {
                metrics::record_reload(false);
                tracing::error!(
                    path = ?self.config_path,
                    error = %e,
                    "Cannot reload config, keeping current routing table"
                );
            }
        }
        result
    }

    /// Compile `config` and publish it. On error the active table is kept.
    pub fn apply(&self, config: &GatewayConfig) -> Result<(), ConfigError> {
        let table = RoutingTable::compile(config, &self.options)?;
        let open = table.credentials().is_open();
        let routes = table.len();

        self.table.store(Arc::new(table));

        tracing::info!(routes, keys = config.static_key.len(), "Config reloaded");
        if open {
            tracing::warn!("Static key is empty, anyone can access the service now");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntryConfig;

    fn write_config(file: &tempfile::NamedTempFile, content: &str) {
        std::fs::write(file.path(), content).unwrap();
    }

    #[test]
    fn bootstrap_with_missing_file_starts_empty() {
        let state = GatewayState::bootstrap("/nonexistent/gw.yaml", CompileOptions::default());
        let table = state.table();
        assert!(table.is_empty());
        assert!(table.credentials().is_open());
    }

    #[test]
    fn reload_publishes_new_table() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write_config(&file, "entry:\n  - path: /a\n    cmd: [/bin/true]\n");

        let state = GatewayState::bootstrap(file.path(), CompileOptions::default());
        assert!(state.table().lookup("/a").is_some());

        write_config(
            &file,
            "static_key: [alice]\nentry:\n  - path: /b\n    cmd: [/bin/true]\n",
        );
        state.reload().unwrap();

        let table = state.table();
        assert!(table.lookup("/a").is_none());
        assert!(table.lookup("/b").is_some());
        assert!(table.credentials().contains("alice"));
    }

    #[test]
    fn failed_reload_keeps_previous_table() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write_config(
            &file,
            "static_key: [alice]\nentry:\n  - path: /a\n    cmd: [/bin/true]\n",
        );
        let state = GatewayState::bootstrap(file.path(), CompileOptions::default());
        let before = state.table();

        write_config(
            &file,
            "static_key: []\nentry:\n  - path: /b\n    cmd: [/bin/true]\n  - path: /c\n    cmd: []\n",
        );
        let err = state.reload().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyCommand { .. }));

        let after = state.table();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(after.lookup("/a").is_some());
        assert!(after.lookup("/b").is_none());
        assert!(after.credentials().contains("alice"));
    }

    #[test]
    fn snapshot_is_unaffected_by_later_reload() {
        let state = GatewayState::new("/unused", CompileOptions::default());
        state
            .apply(&GatewayConfig {
                static_key: vec!["alice".into()],
                entry: vec![EntryConfig::new("/old", &["/bin/true"])],
            })
            .unwrap();

        let snapshot = state.table();
        state
            .apply(&GatewayConfig {
                static_key: vec![],
                entry: vec![EntryConfig::new("/new", &["/bin/true"])],
            })
            .unwrap();

        // The captured snapshot keeps both old routes and old credentials.
        assert!(snapshot.lookup("/old").is_some());
        assert!(snapshot.lookup("/new").is_none());
        assert!(snapshot.credentials().contains("alice"));

        let current = state.table();
        assert!(current.lookup("/new").is_some());
        assert!(current.credentials().is_open());
    }

    #[test]
    fn each_reload_creates_fresh_handlers() {
        let state = GatewayState::new("/unused", CompileOptions::default());
        let config = GatewayConfig {
            static_key: vec![],
            entry: vec![EntryConfig::new("/a", &["/bin/true"])],
        };
        state.apply(&config).unwrap();
        let first = Arc::clone(state.table().lookup("/a").unwrap().handler);
        state.apply(&config).unwrap();
        let second = Arc::clone(state.table().lookup("/a").unwrap().handler);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn open_access_warning_is_logged_per_reload_not_per_request() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let state = GatewayState::new("/unused", CompileOptions::default());
            state
                .apply(&GatewayConfig {
                    static_key: vec![],
                    entry: vec![EntryConfig::new("/a", &["/bin/true"])],
                })
                .unwrap();

            let table = state.table();
            for _ in 0..5 {
                assert!(table.credentials().authorize(&axum::http::HeaderMap::new()));
            }
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("Static key is empty").count(), 1);
    }
}
