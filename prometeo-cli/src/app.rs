//! Menu loop
//!
//! The app owns the banking client, the console, the loaded plugins, the
//! key store and the event logger. Each turn it renders the menu, reads
//! one line and dispatches it. Errors from a plugin or a menu action are
//! reported and the loop goes on; only closing the input or choosing exit
//! ends it.

use std::path::{Path, PathBuf};

use anyhow::Result;
use prometeo_core::config::ApiKeyStore;
use prometeo_core::{BankingClient, Config, Environment, LogEvent, LoggingService};

use crate::console::{is_end_of_input, Console};
use crate::context::log_event;
use crate::output::{banner, create_table, format_timestamp, INPUT_PREFIX};
use crate::plugins::{Plugin, PluginContext, PluginRegistry};
use crate::prompt::{ask, choose_index, confirm};

/// Entries shown by the recent activity option
const ACTIVITY_LIMIT: usize = 15;

/// One parsed menu input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Exit,
    Describe,
    ChangeEnvironment,
    ChangeApiKey,
    Activity,
    Errors,
    /// Zero-based plugin index
    Plugin(usize),
    Invalid,
}

impl MenuChoice {
    pub fn parse(input: &str, plugin_count: usize) -> Self {
        let input = input.trim().to_lowercase();
        match input.as_str() {
            "exit" | "quit" | "q" => MenuChoice::Exit,
            "d" => MenuChoice::Describe,
            "c" => MenuChoice::ChangeEnvironment,
            "k" => MenuChoice::ChangeApiKey,
            "l" => MenuChoice::Activity,
            "e" => MenuChoice::Errors,
            other => match other.parse::<usize>() {
                Ok(n) if (1..=plugin_count).contains(&n) => MenuChoice::Plugin(n - 1),
                _ => MenuChoice::Invalid,
            },
        }
    }
}

/// Ask for a new API key, offering to store it.
///
/// Blank input cancels. The key is only written with an explicit yes; a
/// failed write is reported and the key is still used for this run.
pub fn prompt_for_api_key(console: &mut dyn Console, store: &ApiKeyStore) -> Result<Option<String>> {
    console.write_line("Please enter your API key.");
    console.write_line("You may provide your key with the -k argument instead.");
    let Some(key) = ask::<String>(console, "Your API key (leave blank to cancel):")? else {
        return Ok(None);
    };

    let question = format!("Save the key to {}?", store.path().display());
    if confirm(console, &question, None)? {
        match store.save(&key) {
            Ok(()) => console.success("API key saved."),
            Err(e) => console.error(&format!("Could not save the API key: {:#}", e)),
        }
    }
    Ok(Some(key))
}

/// Resolve the API key: command-line flag, then key file, then prompt
pub fn resolve_api_key(
    flag: Option<String>,
    store: &ApiKeyStore,
    console: &mut dyn Console,
) -> Result<Option<String>> {
    if let Some(key) = flag.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
        return Ok(Some(key));
    }
    if let Some(key) = store.load()? {
        return Ok(Some(key));
    }
    prompt_for_api_key(console, store)
}

/// Whether the loop keeps going after an action
enum Flow {
    Continue,
    Exit,
}

pub struct App<C: Console> {
    client: BankingClient,
    console: C,
    plugins: Vec<Box<dyn Plugin>>,
    key_store: ApiKeyStore,
    settings_dir: PathBuf,
    logger: Option<LoggingService>,
}

impl<C: Console> App<C> {
    pub fn new(
        client: BankingClient,
        console: C,
        dir: &Path,
        logger: Option<LoggingService>,
    ) -> Self {
        Self {
            client,
            console,
            plugins: Vec::new(),
            key_store: ApiKeyStore::new(dir),
            settings_dir: dir.to_path_buf(),
            logger,
        }
    }

    /// Load the registry's plugins. Failures are reported and skipped.
    pub fn load_plugins(&mut self, registry: &PluginRegistry, config: &Config) {
        let loaded = registry.load(config);
        for failure in loaded.failures {
            self.console.warning(&format!(
                "Plugin '{}' failed to load: {:#}",
                failure.name, failure.error
            ));
            self.log(
                LogEvent::new("plugin_load_failed")
                    .with_plugin(&failure.name)
                    .with_error(format!("{:#}", failure.error)),
            );
        }
        self.plugins = loaded.plugins;
    }

    #[cfg(test)]
    pub fn client(&self) -> &BankingClient {
        &self.client
    }

    #[cfg(test)]
    pub fn console(&self) -> &C {
        &self.console
    }

    fn log(&self, event: LogEvent) {
        let event = event.with_environment(self.client.environment().as_str());
        log_event(self.logger.as_ref(), event);
    }

    /// Run the menu until the user exits or input ends
    pub fn run(&mut self) -> Result<()> {
        self.log(LogEvent::new("cli_started"));

        loop {
            self.render_menu();

            let line = match self.console.read_line(INPUT_PREFIX) {
                Ok(line) => line,
                // The menu cannot go on without input
                Err(e) => {
                    if !is_end_of_input(&e) {
                        self.console.error(&format!("{:#}", e));
                    }
                    break;
                }
            };

            let choice = MenuChoice::parse(&line, self.plugins.len());
            match self.dispatch(choice) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(e) if is_end_of_input(&e) => break,
                Err(e) => {
                    self.console.error(&format!("{:#}", e));
                    self.log(
                        LogEvent::new("action_failed")
                            .with_error(e.to_string())
                            .with_error_details(format!("{:#}", e)),
                    );
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    fn render_menu(&mut self) {
        self.console.write_line(&banner());

        self.console.write_line("Environments:");
        for env in Environment::ALL {
            let marker = if env == self.client.environment() { "*" } else { " " };
            self.console
                .write_line(&format!(" {} {}", marker, env.as_str()));
        }
        self.console
            .write_line(&format!("Session: {}", self.client.status()));

        self.console.write_line("Options:");
        for (i, plugin) in self.plugins.iter().enumerate() {
            let line = format!("[{}] {}", i + 1, plugin.title());
            self.console.write_line(&line);
        }
        self.console.write_line(
            "[d] Describe plugins  [c] Change environment  [k] Change API key  [l] Recent activity  [e] Recent errors  [q] Exit",
        );
    }

    fn dispatch(&mut self, choice: MenuChoice) -> Result<Flow> {
        match choice {
            MenuChoice::Exit => return Ok(Flow::Exit),
            MenuChoice::Describe => self.describe_plugins(),
            MenuChoice::ChangeEnvironment => self.change_environment()?,
            MenuChoice::ChangeApiKey => self.change_api_key()?,
            MenuChoice::Activity => self.show_activity(),
            MenuChoice::Errors => self.show_errors(),
            MenuChoice::Plugin(index) => self.run_plugin(index)?,
            MenuChoice::Invalid => self.console.warning("Invalid option."),
        }
        Ok(Flow::Continue)
    }

    fn describe_plugins(&mut self) {
        for plugin in &self.plugins {
            let line = format!("{}: {}", plugin.title(), plugin.description());
            self.console.info(&line);
        }
    }

    /// Run one plugin. Anything it fails with, except closed input, is
    /// reported and logged here.
    fn run_plugin(&mut self, index: usize) -> Result<()> {
        let Some(plugin) = self.plugins.get_mut(index) else {
            return Ok(());
        };
        let name = plugin.name().to_string();
        let title = plugin.title().to_string();

        let mut ctx = PluginContext {
            client: &mut self.client,
            console: &mut self.console,
            logger: self.logger.as_ref(),
        };
        ctx.log(LogEvent::new("plugin_run").with_plugin(&name));

        match plugin.run(&mut ctx) {
            Ok(()) => Ok(()),
            Err(e) if is_end_of_input(&e) => Err(e),
            Err(e) => {
                ctx.console.error(&format!("{}: {:#}", title, e));
                ctx.log(
                    LogEvent::new("plugin_failed")
                        .with_plugin(&name)
                        .with_error(e.to_string())
                        .with_error_details(format!("{:#}", e)),
                );
                Ok(())
            }
        }
    }

    fn change_environment(&mut self) -> Result<()> {
        for (i, env) in Environment::ALL.iter().enumerate() {
            self.console.write_line(&format!("[{}] {}", i + 1, env));
        }

        let Some(index) = choose_index(
            &mut self.console,
            "Select an environment (blank to cancel):",
            Environment::ALL.len(),
        )?
        else {
            self.console.info("Environment unchanged.");
            return Ok(());
        };

        let environment = Environment::ALL[index];
        if environment == self.client.environment() {
            self.console
                .info(&format!("Already using {}.", environment));
            return Ok(());
        }

        let result = self.client.change_environment(environment);
        self.report_logout(result);
        self.console
            .success(&format!("Environment set to {}.", environment));
        if let Err(e) = Config::save_environment(&self.settings_dir, environment) {
            self.console
                .warning(&format!("Could not remember the environment: {:#}", e));
        }
        self.log(LogEvent::new("environment_changed"));
        Ok(())
    }

    fn change_api_key(&mut self) -> Result<()> {
        let Some(key) = prompt_for_api_key(&mut self.console, &self.key_store)? else {
            self.console.info("API key unchanged.");
            return Ok(());
        };

        let result = self.client.change_api_key(key);
        self.report_logout(result);
        self.console.success("API key updated.");
        self.log(LogEvent::new("api_key_changed"));
        Ok(())
    }

    fn report_logout(&mut self, result: prometeo_core::CoreResult<bool>) {
        match result {
            Ok(true) => self.console.info("The previous session was closed."),
            Ok(false) => {}
            Err(e) => self.console.warning(&format!(
                "The previous session was dropped, but Prometeo reported: {}",
                e
            )),
        }
    }

    fn show_activity(&mut self) {
        let Some(logger) = self.logger.as_ref() else {
            self.console.warning("The event log is not available.");
            return;
        };

        let entries = match logger.get_recent(ACTIVITY_LIMIT) {
            Ok(entries) => entries,
            Err(e) => {
                self.console
                    .warning(&format!("Could not read the event log: {:#}", e));
                return;
            }
        };
        if entries.is_empty() {
            self.console.info("No activity recorded yet.");
            return;
        }
        let total = logger.count().unwrap_or(entries.len() as u64);

        let mut table = create_table();
        table.set_header(vec!["Time", "Event", "Plugin", "Environment", "Error"]);
        let shown = entries.len();
        for entry in entries {
            table.add_row(vec![
                format_timestamp(entry.timestamp),
                entry.event,
                entry.plugin.unwrap_or_default(),
                entry.environment.unwrap_or_default(),
                entry.error_message.unwrap_or_default(),
            ]);
        }
        self.console.write_line(&table.to_string());
        self.console
            .info(&format!("Showing {} of {} events.", shown, total));
    }

    fn show_errors(&mut self) {
        let Some(logger) = self.logger.as_ref() else {
            self.console.warning("The event log is not available.");
            return;
        };

        let entries = match logger.get_errors(ACTIVITY_LIMIT) {
            Ok(entries) => entries,
            Err(e) => {
                self.console
                    .warning(&format!("Could not read the event log: {:#}", e));
                return;
            }
        };
        if entries.is_empty() {
            self.console.success("No errors recorded.");
            return;
        }

        let mut table = create_table();
        table.set_header(vec!["Time", "Event", "Plugin", "Error", "Details"]);
        for entry in entries {
            table.add_row(vec![
                format_timestamp(entry.timestamp),
                entry.event,
                entry.plugin.unwrap_or_default(),
                entry.error_message.unwrap_or_default(),
                entry.error_details.unwrap_or_default(),
            ]);
        }
        self.console.write_line(&table.to_string());
    }

    /// Close every plugin, reporting each failure on its own
    fn shutdown(&mut self) {
        for plugin in self.plugins.iter_mut() {
            let mut ctx = PluginContext {
                client: &mut self.client,
                console: &mut self.console,
                logger: self.logger.as_ref(),
            };
            if let Err(e) = plugin.close(&mut ctx) {
                let line = format!("{} failed to close: {:#}", plugin.title(), e);
                ctx.console.error(&line);
            }
        }

        self.console.write_line("Bye!");
        self.log(LogEvent::new("cli_exited"));
    }
}
