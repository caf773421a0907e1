//! Configuration file watcher for hot reload.
//!
//! Only the `[filter]` section is applied live. Changes to any other
//! section are noticed and logged, but need a restart.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::{FilterSettings, ProxyConfig};

/// A watcher that monitors the configuration file for filter changes.
pub struct ConfigWatcher {
    path: PathBuf,
    current: ProxyConfig,
    update_tx: mpsc::UnboundedSender<FilterSettings>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher seeded with the configuration already in use.
    ///
    /// Returns the watcher and a receiver for validated filter settings.
    pub fn new(
        path: &Path,
        current: ProxyConfig,
    ) -> (Self, mpsc::UnboundedReceiver<FilterSettings>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                current,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut current,
            update_tx,
        } = self;
        let watched = path.clone();
        let mut last_content: Option<String> = None;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let content = match fs::read_to_string(&watched) {
                        Ok(c) => c,
                        Err(e) => {
                            tracing::warn!(error = %e, "Config file unreadable, keeping current filter");
                            return;
                        }
                    };
                    // Editors emit several events per save.
                    if last_content.as_deref() == Some(content.as_str()) {
                        return;
                    }
                    last_content = Some(content.clone());

                    match parse_config(&content) {
                        Ok(next) => {
                            if let Some(settings) = filter_update(&current, &next) {
                                tracing::info!("Filter configuration changed, reloading");
                                let _ = update_tx.send(settings);
                            }
                            current = next;
                        }
                        Err(e) => {
                            tracing::error!(
                                error = %e,
                                "Failed to reload config, keeping current filter"
                            );
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

/// Decide what a newly loaded config means for the running proxy.
///
/// Returns the new filter settings if they differ from the current ones.
fn filter_update(current: &ProxyConfig, next: &ProxyConfig) -> Option<FilterSettings> {
    if current.listener.bind_address != next.listener.bind_address
        || current.upstream.address != next.upstream.address
        || current.timeouts.request_secs != next.timeouts.request_secs
    {
        tracing::warn!("Only [filter] is reloaded live; restart to apply other changes");
    }

    let changed = current.filter.user_id_regex != next.filter.user_id_regex
        || current.filter.last_modified != next.filter.last_modified;
    changed.then(|| next.filter.clone())
}
