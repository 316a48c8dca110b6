//! Menu plugins
//!
//! A plugin is a command module the menu can run. Plugins are registered
//! explicitly in a `PluginRegistry`; registration order is menu order.

mod meta;
mod session;
mod transactions;

use anyhow::Result;
use prometeo_core::{BankingClient, Config, LogEvent, LoggingService};

use crate::console::Console;
use crate::context::log_event;

use meta::MetaPlugin;
use session::SessionPlugin;
use transactions::TransactionsPlugin;

/// What a plugin gets to work with while it runs
pub struct PluginContext<'a> {
    pub client: &'a mut BankingClient,
    pub console: &'a mut dyn Console,
    pub logger: Option<&'a LoggingService>,
}

impl PluginContext<'_> {
    /// Record an event tagged with the current environment
    pub fn log(&self, event: LogEvent) {
        let event = event.with_environment(self.client.environment().as_str());
        log_event(self.logger, event);
    }
}

pub trait Plugin {
    /// Lowercase id, matched against `disabledPlugins` and used in the event log
    fn name(&self) -> &str;

    /// Name shown in the menu
    fn title(&self) -> &str;

    fn description(&self) -> &str;

    /// Run the plugin's interactive flow
    fn run(&mut self, ctx: &mut PluginContext<'_>) -> Result<()>;

    /// Release resources on exit
    fn close(&mut self, _ctx: &mut PluginContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Builds a plugin from the loaded configuration
pub type PluginConstructor = fn(&Config) -> Result<Box<dyn Plugin>>;

struct PluginEntry {
    name: String,
    constructor: PluginConstructor,
}

/// A plugin that could not be constructed
#[derive(Debug)]
pub struct LoadFailure {
    pub name: String,
    pub error: anyhow::Error,
}

/// Result of loading the registry
pub struct LoadedPlugins {
    pub plugins: Vec<Box<dyn Plugin>>,
    pub failures: Vec<LoadFailure>,
}

/// Ordered list of plugin constructors
#[derive(Default)]
pub struct PluginRegistry {
    entries: Vec<PluginEntry>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in plugins: Session, Meta, Transactions
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(session::NAME, |_| Ok(Box::new(SessionPlugin::new())));
        registry.register(meta::NAME, |_| Ok(Box::new(MetaPlugin::new())));
        registry.register(transactions::NAME, |_| {
            Ok(Box::new(TransactionsPlugin::new()))
        });
        registry
    }

    /// Append a plugin; it appears after every plugin registered before it
    pub fn register(&mut self, name: impl Into<String>, constructor: PluginConstructor) {
        self.entries.push(PluginEntry {
            name: name.into(),
            constructor,
        });
    }

    #[cfg(test)]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Construct every plugin not disabled in the configuration.
    ///
    /// A failing constructor does not stop the others; it is reported in
    /// `failures` instead.
    pub fn load(&self, config: &Config) -> LoadedPlugins {
        let mut plugins = Vec::new();
        let mut failures = Vec::new();

        for entry in &self.entries {
            if config.is_plugin_disabled(&entry.name) {
                continue;
            }
            match (entry.constructor)(config) {
                Ok(plugin) => plugins.push(plugin),
                Err(error) => failures.push(LoadFailure {
                    name: entry.name.clone(),
                    error,
                }),
            }
        }

        LoadedPlugins { plugins, failures }
    }
}
