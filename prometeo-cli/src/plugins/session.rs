//! Session plugin - login and logout

use anyhow::Result;
use prometeo_core::{CoreResult, Error, LogEvent, LoginOutcome, LoginRequest, SessionStatus};

use super::{Plugin, PluginContext};
use crate::prompt::{ask_required, choose_index, confirm, password};

pub(super) const NAME: &str = "session";

pub struct SessionPlugin;

impl SessionPlugin {
    pub fn new() -> Self {
        Self
    }

    fn login(&mut self, ctx: &mut PluginContext<'_>) -> Result<()> {
        if ctx.client.status() == SessionStatus::LoggedIn {
            if !confirm(ctx.console, "You are already logged in. Log in again?", Some(false))? {
                return Ok(());
            }
            // The new login supersedes the open session
            if let Err(e) = ctx.client.logout() {
                ctx.console.warning(&format!(
                    "Previous session closed locally, but Prometeo reported: {}",
                    e
                ));
            }
        }

        let request = if ctx.client.environment().is_sandbox() {
            ctx.console.info("Sandbox environment: using the test credentials.");
            LoginRequest::sandbox_demo()
        } else {
            let provider: String = ask_required(ctx.console, "Provider code:")?;
            let username: String = ask_required(ctx.console, "Username:")?;
            let secret = password(ctx.console, "Password: ")?;
            LoginRequest::new(provider, username, secret)
        };

        let mut result = ctx.client.login(&request);
        loop {
            match result {
                Ok(LoginOutcome::LoggedIn) => {
                    ctx.client.set_status(SessionStatus::LoggedIn);
                    ctx.console.success("Logged in.");
                    ctx.log(LogEvent::new("login_succeeded").with_plugin(NAME));
                    return Ok(());
                }
                Ok(LoginOutcome::InteractionRequired { context, field }) => {
                    ctx.client.set_status(SessionStatus::InteractionRequired);
                    ctx.console
                        .warning("The provider needs more information to log in.");
                    let answer: String =
                        ask_required(ctx.console, &format!("{} ({}):", context, field))?;
                    result = ctx.client.answer_interaction(&answer);
                }
                Err(err) => return self.login_failed(ctx, err),
            }
        }
    }

    fn login_failed(&mut self, ctx: &mut PluginContext<'_>, err: Error) -> Result<()> {
        // A failed answer leaves nothing waiting for input
        if ctx.client.status() == SessionStatus::InteractionRequired {
            ctx.client.set_status(SessionStatus::LoggedOut);
        }

        let message = match &err {
            Error::InvalidApiKey => "Invalid API key.".to_string(),
            Error::WrongCredentials => {
                ctx.client.set_status(SessionStatus::WrongCredentials);
                "Wrong credentials.".to_string()
            }
            Error::Provider(msg) => {
                ctx.client.set_status(SessionStatus::ProviderError);
                format!("Prometeo error: {}", msg)
            }
            Error::Network(msg) => format!("Could not reach Prometeo: {}", msg),
            _ => return Err(err.into()),
        };

        ctx.console.error(&message);
        ctx.log(
            LogEvent::new("login_failed")
                .with_plugin(NAME)
                .with_error(err.to_string()),
        );
        Ok(())
    }

    fn logout(&mut self, ctx: &mut PluginContext<'_>) -> Result<()> {
        if ctx.client.status() != SessionStatus::LoggedIn {
            ctx.console.warning("You are not logged in.");
            return Ok(());
        }

        let result = ctx.client.logout();
        ctx.client.set_status(SessionStatus::LoggedOut);
        report_logout(ctx, result);
        Ok(())
    }
}

fn report_logout(ctx: &mut PluginContext<'_>, result: CoreResult<bool>) {
    match result {
        Ok(_) => ctx.console.success("Logged out."),
        Err(e) => ctx
            .console
            .warning(&format!("Session closed locally, but Prometeo reported: {}", e)),
    }
}

impl Default for SessionPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for SessionPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn title(&self) -> &str {
        "Sessions"
    }

    fn description(&self) -> &str {
        "Log in to a provider or close the current session"
    }

    fn run(&mut self, ctx: &mut PluginContext<'_>) -> Result<()> {
        ctx.console.write_line("[1] Login");
        ctx.console.write_line("[2] Logout");

        match choose_index(ctx.console, "", 2)? {
            Some(0) => self.login(ctx),
            Some(_) => self.logout(ctx),
            None => Ok(()),
        }
    }

    /// Close the session still open on exit
    fn close(&mut self, ctx: &mut PluginContext<'_>) -> Result<()> {
        if !ctx.client.has_session() {
            return Ok(());
        }
        ctx.client.logout()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use prometeo_core::adapters::demo::{DemoBankingApi, DemoFailure};
    use prometeo_core::{BankingClient, Environment};

    use super::*;
    use crate::console::ScriptedConsole;

    fn run_session(client: &mut BankingClient, inputs: &[&str]) -> ScriptedConsole {
        let mut console = ScriptedConsole::new(inputs);
        let mut ctx = PluginContext {
            client,
            console: &mut console,
            logger: None,
        };
        SessionPlugin::new().run(&mut ctx).unwrap();
        console
    }

    #[test]
    fn test_sandbox_login_uses_demo_credentials() {
        let api = DemoBankingApi::new();
        let calls = api.call_log();
        let mut client = BankingClient::new(Box::new(api), "Prometeo123", Environment::Sandbox);

        let console = run_session(&mut client, &["1"]);

        assert_eq!(client.status(), SessionStatus::LoggedIn);
        assert!(console.printed("OK::Logged in."));
        // Only the menu choice was read: no credential prompts
        assert_eq!(console.prompts.len(), 1);
        assert_eq!(calls.count("login"), 1);
    }

    #[test]
    fn test_login_outside_sandbox_prompts_credentials() {
        let mut client = BankingClient::new(
            Box::new(DemoBankingApi::new()),
            "Prometeo123",
            Environment::Testing,
        );

        let console = run_session(&mut client, &["1", "test", "12345", "gfdsa"]);
        assert_eq!(client.status(), SessionStatus::LoggedIn);
        assert_eq!(console.remaining(), 0);
    }

    #[test]
    fn test_wrong_credentials_sets_status() {
        let mut client = BankingClient::new(
            Box::new(DemoBankingApi::new()),
            "Prometeo123",
            Environment::Production,
        );

        let console = run_session(&mut client, &["1", "test", "12345", "nope"]);
        assert_eq!(client.status(), SessionStatus::WrongCredentials);
        assert!(console.printed("ERROR::Wrong credentials."));
    }

    #[test]
    fn test_invalid_api_key_leaves_status() {
        let api = DemoBankingApi::new().with_login_failure(DemoFailure::InvalidApiKey);
        let mut client = BankingClient::new(Box::new(api), "bad", Environment::Sandbox);

        let console = run_session(&mut client, &["1"]);
        assert_eq!(client.status(), SessionStatus::LoggedOut);
        assert!(console.printed("ERROR::Invalid API key."));
    }

    #[test]
    fn test_provider_error_sets_status() {
        let api = DemoBankingApi::new()
            .with_login_failure(DemoFailure::Provider("Service unavailable".to_string()));
        let mut client = BankingClient::new(Box::new(api), "Prometeo123", Environment::Sandbox);

        let console = run_session(&mut client, &["1"]);
        assert_eq!(client.status(), SessionStatus::ProviderError);
        assert!(console.printed("Service unavailable"));
    }

    #[test]
    fn test_network_error_is_reported_only() {
        let api = DemoBankingApi::new()
            .with_login_failure(DemoFailure::Network("timed out".to_string()));
        let mut client = BankingClient::new(Box::new(api), "Prometeo123", Environment::Sandbox);

        let console = run_session(&mut client, &["1"]);
        assert_eq!(client.status(), SessionStatus::LoggedOut);
        assert!(console.printed("ERROR::Could not reach Prometeo"));
    }

    #[test]
    fn test_interactive_login() {
        let api = DemoBankingApi::new().with_interaction();
        let mut client = BankingClient::new(Box::new(api), "Prometeo123", Environment::Sandbox);

        let console = run_session(&mut client, &["1", "Firulais"]);
        assert_eq!(client.status(), SessionStatus::LoggedIn);
        assert!(console.printed("WARNING::The provider needs more information"));
    }

    #[test]
    fn test_relogin_declined() {
        let api = DemoBankingApi::new();
        let calls = api.call_log();
        let mut client = BankingClient::new(Box::new(api), "Prometeo123", Environment::Sandbox);

        run_session(&mut client, &["1"]);
        run_session(&mut client, &["1", ""]);
        assert_eq!(calls.count("login"), 1);

        run_session(&mut client, &["1", "y"]);
        assert_eq!(calls.count("login"), 2);
        assert_eq!(calls.count("logout"), 1);
        assert_eq!(client.status(), SessionStatus::LoggedIn);
    }

    #[test]
    fn test_failed_relogin_closes_previous_session() {
        let api = DemoBankingApi::new();
        let calls = api.call_log();
        let mut client = BankingClient::new(Box::new(api), "Prometeo123", Environment::Production);

        run_session(&mut client, &["1", "test", "12345", "gfdsa"]);
        assert_eq!(client.status(), SessionStatus::LoggedIn);

        run_session(&mut client, &["1", "y", "test", "12345", "bad"]);
        assert_eq!(client.status(), SessionStatus::WrongCredentials);
        assert!(!client.has_session());
        assert_eq!(calls.count("logout"), 1);

        let console = run_session(&mut client, &["2"]);
        assert!(console.printed("WARNING::You are not logged in."));
        assert_eq!(calls.count("logout"), 1);
    }

    #[test]
    fn test_failed_answer_resets_status() {
        let api = DemoBankingApi::new()
            .with_interaction()
            .with_answer_failure(DemoFailure::Network("timed out".to_string()));
        let mut client = BankingClient::new(Box::new(api), "Prometeo123", Environment::Sandbox);

        let console = run_session(&mut client, &["1", "Firulais"]);
        assert_eq!(client.status(), SessionStatus::LoggedOut);
        assert!(!client.has_session());
        assert!(console.printed("ERROR::Could not reach Prometeo"));
    }

    #[test]
    fn test_logout() {
        let api = DemoBankingApi::new();
        let calls = api.call_log();
        let mut client = BankingClient::new(Box::new(api), "Prometeo123", Environment::Sandbox);

        let console = run_session(&mut client, &["2"]);
        assert!(console.printed("WARNING::You are not logged in."));
        assert_eq!(calls.count("logout"), 0);

        run_session(&mut client, &["1"]);
        let console = run_session(&mut client, &["2"]);
        assert!(console.printed("OK::Logged out."));
        assert_eq!(client.status(), SessionStatus::LoggedOut);
        assert_eq!(calls.count("logout"), 1);
    }

    #[test]
    fn test_close_logs_out_open_session() {
        let api = DemoBankingApi::new();
        let calls = api.call_log();
        let mut client = BankingClient::new(Box::new(api), "Prometeo123", Environment::Sandbox);
        run_session(&mut client, &["1"]);

        let mut console = ScriptedConsole::new(&[]);
        let mut ctx = PluginContext {
            client: &mut client,
            console: &mut console,
            logger: None,
        };
        let mut plugin = SessionPlugin::new();
        plugin.close(&mut ctx).unwrap();
        plugin.close(&mut ctx).unwrap();

        assert_eq!(calls.count("logout"), 1);
        assert!(!client.has_session());
    }
}
