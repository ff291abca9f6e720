//! Plugin lifecycle

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ClaudeClient, PlaudClient, VaultClient};
use crate::config::{Settings, PLUGIN_VERSION};
use crate::inbox::{InboxError, InboxMonitor, ProcessedLog};
use crate::settings::{Preferences, SettingsError, SettingsStore};
use crate::ui::{Container, ElementId, Ribbon};

const RIBBON_LABEL: &str = "Ask Claude";
const PROCESSED_LOG_NAME: &str = ".processed.log";

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Invalid lifecycle transition: cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: LifecycleState,
    },
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Inbox(#[from] InboxError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Loading,
    Loaded,
    /// Terminal; the host must create a new instance to load again
    Unloaded,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Created => "created",
            LifecycleState::Loading => "loading",
            LifecycleState::Loaded => "loaded",
            LifecycleState::Unloaded => "unloaded",
        };
        f.write_str(s)
    }
}

/// Everything the plugin holds while loaded
struct Loaded {
    store: SettingsStore,
    claude: ClaudeClient,
    plaud: PlaudClient,
    vault: VaultClient,
    ribbon: Ribbon,
    ribbon_id: ElementId,
    monitor: Option<InboxMonitor>,
}

pub struct Plugin {
    settings_path: Option<String>,
    state: LifecycleState,
    loaded: Option<Loaded>,
    ribbon_bar: Container,
    body: Container,
    ribbon_clicks: Arc<AtomicUsize>,
}

impl Plugin {
    /// `settings_path` of None uses the default settings location
    pub fn new(settings_path: Option<&str>) -> Self {
        Plugin {
            settings_path: settings_path.map(str::to_string),
            state: LifecycleState::Created,
            loaded: None,
            ribbon_bar: Container::new(),
            body: Container::new(),
            ribbon_clicks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Read settings, build the ribbon, wire up clients and the inbox
    ///
    /// Any failure leaves the plugin unloaded.
    pub fn onload(&mut self) -> Result<(), PluginError> {
        if self.state != LifecycleState::Created {
            return Err(PluginError::InvalidState {
                action: "load",
                state: self.state,
            });
        }
        self.state = LifecycleState::Loading;

        match self.load_inner() {
            Ok(loaded) => {
                info!(version = PLUGIN_VERSION, "plugin loaded");
                self.loaded = Some(loaded);
                self.state = LifecycleState::Loaded;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "plugin failed to load");
                self.ribbon_bar = Container::new();
                self.state = LifecycleState::Unloaded;
                Err(e)
            }
        }
    }

    fn load_inner(&mut self) -> Result<Loaded, PluginError> {
        let store = SettingsStore::load(self.settings_path.as_deref())?;
        let settings = &store.settings;

        let clicks = Arc::clone(&self.ribbon_clicks);
        let ribbon = Ribbon::new(RIBBON_LABEL, move || {
            clicks.fetch_add(1, Ordering::SeqCst);
        });
        let ribbon_id = ribbon.attach(&mut self.ribbon_bar);

        let monitor = match &settings.inbox_dir {
            Some(dir) => {
                let log = ProcessedLog::load(dir.join(PROCESSED_LOG_NAME))?;
                Some(InboxMonitor::with_settle(dir.clone(), log, settings.inbox_settle())?)
            }
            None => None,
        };

        Ok(Loaded {
            claude: ClaudeClient::from_settings(settings),
            plaud: PlaudClient::from_settings(settings),
            vault: VaultClient::from_settings(settings),
            store,
            ribbon,
            ribbon_id,
            monitor,
        })
    }

    /// Release everything acquired in [`Plugin::onload`] and persist settings
    ///
    /// Calling it again, or before load, only moves to `Unloaded`.
    pub fn onunload(&mut self) -> Result<(), PluginError> {
        self.state = LifecycleState::Unloaded;
        let Some(loaded) = self.loaded.take() else {
            return Ok(());
        };

        Ribbon::detach(&mut self.ribbon_bar, loaded.ribbon_id);
        self.body = Container::new();
        drop(loaded.monitor);
        loaded.store.save()?;
        info!("plugin unloaded");
        Ok(())
    }

    fn loaded(&self) -> Option<&Loaded> {
        self.loaded.as_ref()
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.loaded().map(|l| &l.store.settings)
    }

    pub fn preferences(&self) -> Option<&Preferences> {
        self.loaded().map(|l| &l.store.preferences)
    }

    pub fn preferences_mut(&mut self) -> Option<&mut Preferences> {
        self.loaded.as_mut().map(|l| &mut l.store.preferences)
    }

    pub fn claude(&self) -> Option<&ClaudeClient> {
        self.loaded().map(|l| &l.claude)
    }

    pub fn plaud(&self) -> Option<&PlaudClient> {
        self.loaded().map(|l| &l.plaud)
    }

    pub fn vault(&self) -> Option<&VaultClient> {
        self.loaded().map(|l| &l.vault)
    }

    pub fn inbox(&self) -> Option<&InboxMonitor> {
        self.loaded().and_then(|l| l.monitor.as_ref())
    }

    pub fn ribbon(&self) -> Option<&Ribbon> {
        self.loaded().map(|l| &l.ribbon)
    }

    pub fn ribbon_clicks(&self) -> usize {
        self.ribbon_clicks.load(Ordering::SeqCst)
    }

    pub fn ribbon_bar(&self) -> &Container {
        &self.ribbon_bar
    }

    /// Document body that modals mount into
    pub fn body(&self) -> &Container {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Container {
        &mut self.body
    }
}
