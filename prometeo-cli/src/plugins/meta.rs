//! Meta plugin - provider lookup

use anyhow::Result;
use prometeo_core::domain::search_providers;
use prometeo_core::{Provider, ProviderDetail};

use super::{Plugin, PluginContext};
use crate::output::create_table;
use crate::prompt::{ask, ask_with};

pub(super) const NAME: &str = "meta";

pub struct MetaPlugin;

impl MetaPlugin {
    pub fn new() -> Self {
        Self
    }

    fn show_providers(ctx: &mut PluginContext<'_>, providers: &[Provider]) {
        let mut table = create_table();
        table.set_header(vec!["#", "Code", "Name", "Country"]);
        for (i, provider) in providers.iter().enumerate() {
            table.add_row(vec![
                (i + 1).to_string(),
                provider.code.clone(),
                provider.name.clone(),
                provider.country.clone(),
            ]);
        }
        ctx.console.write_line(&table.to_string());
    }

    fn show_detail(ctx: &mut PluginContext<'_>, code: &str, detail: &ProviderDetail) {
        ctx.console.info(&format!(
            "{} ({}, {}) login fields:",
            detail.name, code, detail.country
        ));

        let mut table = create_table();
        table.set_header(vec!["Name", "Type", "Interactive", "Optional"]);
        for field in &detail.auth_fields {
            table.add_row(vec![
                field.name.clone(),
                field.field_type.clone(),
                yes_no(field.interactive).to_string(),
                yes_no(field.optional).to_string(),
            ]);
        }
        ctx.console.write_line(&table.to_string());
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

impl Default for MetaPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for MetaPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn title(&self) -> &str {
        "Meta"
    }

    fn description(&self) -> &str {
        "Search providers and show the login fields each one needs"
    }

    fn run(&mut self, ctx: &mut PluginContext<'_>) -> Result<()> {
        let term: Option<String> = ask(
            ctx.console,
            "Search providers by code, name or country (leave blank to list all):",
        )?;
        let term = term.unwrap_or_default();

        let providers = search_providers(ctx.client.get_providers()?, &term);
        if providers.is_empty() {
            ctx.console
                .warning(&format!("No providers match '{}'.", term));
            return Ok(());
        }

        Self::show_providers(ctx, &providers);

        let len = providers.len();
        let choice = ask_with(
            ctx.console,
            "Select a provider for details (0 for all, blank to go back):",
            false,
            |n: &usize| {
                if *n <= len {
                    Ok(())
                } else {
                    Err(format!("Choose a number between 0 and {}.", len))
                }
            },
        )?;

        let selected: Vec<&Provider> = match choice {
            None => return Ok(()),
            Some(0) => providers.iter().collect(),
            Some(n) => vec![&providers[n - 1]],
        };

        for provider in selected {
            let detail = ctx.client.get_provider_detail(&provider.code)?;
            Self::show_detail(ctx, &provider.code, &detail);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use prometeo_core::adapters::demo::DemoBankingApi;
    use prometeo_core::{BankingClient, Environment};

    use super::*;
    use crate::console::ScriptedConsole;

    fn run_meta(inputs: &[&str]) -> (ScriptedConsole, prometeo_core::adapters::demo::CallLog) {
        let api = DemoBankingApi::new();
        let calls = api.call_log();
        let mut client = BankingClient::new(Box::new(api), "Prometeo123", Environment::Sandbox);
        let mut console = ScriptedConsole::new(inputs);
        let mut ctx = PluginContext {
            client: &mut client,
            console: &mut console,
            logger: None,
        };
        MetaPlugin::new().run(&mut ctx).unwrap();
        (console, calls)
    }

    #[test]
    fn test_runs_without_session() {
        let (console, calls) = run_meta(&["", ""]);
        assert_eq!(calls.count("get_providers"), 1);
        assert_eq!(calls.count("get_provider_detail"), 0);
        assert!(console.printed("Test Bank"));
    }

    #[test]
    fn test_filter_without_match_warns() {
        let (console, calls) = run_meta(&["nonexistent"]);
        assert!(console.printed("WARNING::No providers match 'nonexistent'."));
        assert_eq!(calls.count("get_provider_detail"), 0);
    }

    #[test]
    fn test_single_provider_detail() {
        // "galicia" only matches one provider
        let (console, calls) = run_meta(&["GALICIA", "1"]);
        assert_eq!(calls.count("get_provider_detail"), 1);
        assert!(console.printed("login fields:"));
        assert!(!console.printed("Test Bank"));
    }

    #[test]
    fn test_zero_selects_every_provider() {
        let (_, calls) = run_meta(&["uy", "0"]);
        let expected = search_providers(
            prometeo_core::adapters::demo::demo_providers(),
            "uy",
        )
        .len();
        assert_eq!(calls.count("get_provider_detail"), expected);
    }

    #[test]
    fn test_out_of_range_choice_is_reasked() {
        let (console, calls) = run_meta(&["galicia", "5", ""]);
        assert!(console.printed("Choose a number between 0 and 1."));
        assert_eq!(calls.count("get_provider_detail"), 0);
    }
}
