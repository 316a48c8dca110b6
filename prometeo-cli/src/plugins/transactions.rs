//! Transactions plugin - bank account and credit card movements

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::NaiveDate;
use prometeo_core::domain::{format_date, parse_date};
use prometeo_core::{DateRange, Error, LogEvent, Movement, SessionStatus};

use super::{Plugin, PluginContext};
use crate::output::create_table;
use crate::prompt::{ask_or, ask_with, choose_index, confirm};

pub(super) const NAME: &str = "transactions";

/// Currencies the movements endpoints accept
pub const CURRENCIES: &[&str] = &["UYU", "USD"];

/// A date typed as dd/mm/yyyy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DayMonthYear(NaiveDate);

impl FromStr for DayMonthYear {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_date(s).map(DayMonthYear)
    }
}

impl fmt::Display for DayMonthYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_date(self.0))
    }
}

/// What the user wants movements for
enum Source {
    Account,
    Card,
}

pub struct TransactionsPlugin {
    /// Fixed "today" for the default date window; the local date when unset
    today: Option<NaiveDate>,
}

impl TransactionsPlugin {
    pub fn new() -> Self {
        Self { today: None }
    }

    #[cfg(test)]
    fn with_today(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Pick an account, returning its number
    fn choose_account(ctx: &mut PluginContext<'_>) -> Result<Option<String>> {
        let accounts = ctx.client.get_bank_accounts()?;
        if accounts.is_empty() {
            ctx.console.warning("No bank accounts found.");
            return Ok(None);
        }

        let mut table = create_table();
        table.set_header(vec!["#", "Name", "Number", "Branch", "Currency", "Balance"]);
        for (i, account) in accounts.iter().enumerate() {
            table.add_row(vec![
                (i + 1).to_string(),
                account.name.clone(),
                account.number.clone(),
                account.branch.clone().unwrap_or_default(),
                account.currency.clone(),
                account.balance.to_string(),
            ]);
        }
        ctx.console.write_line(&table.to_string());

        let choice = choose_index(ctx.console, "Select an account (blank to go back):", accounts.len())?;
        Ok(choice.map(|i| accounts[i].number.clone()))
    }

    /// Pick a credit card, returning its number
    fn choose_card(ctx: &mut PluginContext<'_>) -> Result<Option<String>> {
        let cards = ctx.client.get_credit_cards()?;
        if cards.is_empty() {
            ctx.console.warning("No credit cards found.");
            return Ok(None);
        }

        let mut table = create_table();
        table.set_header(vec![
            "#", "Name", "Number", "Close date", "Due date", "Balance (local)", "Balance (USD)",
        ]);
        for (i, card) in cards.iter().enumerate() {
            table.add_row(vec![
                (i + 1).to_string(),
                card.name.clone(),
                card.number.clone(),
                card.close_date.map(format_date).unwrap_or_default(),
                card.due_date.map(format_date).unwrap_or_default(),
                card.balance_local.to_string(),
                card.balance_dollar.to_string(),
            ]);
        }
        ctx.console.write_line(&table.to_string());

        let choice = choose_index(ctx.console, "Select a card (blank to go back):", cards.len())?;
        Ok(choice.map(|i| cards[i].number.clone()))
    }

    fn choose_currency(ctx: &mut PluginContext<'_>) -> Result<String> {
        let question = format!("Currency ({}):", CURRENCIES.join(", "));
        let currency = ask_with(ctx.console, &question, true, |c: &String| {
            if CURRENCIES.iter().any(|allowed| allowed.eq_ignore_ascii_case(c)) {
                Ok(())
            } else {
                Err(format!("Currency must be one of: {}.", CURRENCIES.join(", ")))
            }
        })?;
        Ok(currency.unwrap_or_default().to_uppercase())
    }

    /// Ask for the date range. `None` when it is inverted or the user backs
    /// out of a broad range.
    fn choose_range(&self, ctx: &mut PluginContext<'_>) -> Result<Option<DateRange>> {
        let default = DateRange::trailing(self.today());
        let default_start = DayMonthYear(default.start());
        let default_end = DayMonthYear(default.end());

        let start = ask_or(
            ctx.console,
            &format!("Start date, dd/mm/yyyy (blank for {}):", default_start),
            default_start,
        )?;
        let end = ask_or(
            ctx.console,
            &format!("End date, dd/mm/yyyy (blank for {}):", default_end),
            default_end,
        )?;

        let range = match DateRange::new(start.0, end.0) {
            Ok(range) => range,
            Err(_) => {
                ctx.console
                    .error("The start date must not be after the end date.");
                return Ok(None);
            }
        };

        if range.is_broad() {
            ctx.console.warning(&format!(
                "The selected range spans {} days. Broad ranges can be slow for the bank to answer.",
                range.days()
            ));
            if !confirm(ctx.console, "Continue?", Some(false))? {
                return Ok(None);
            }
        }
        Ok(Some(range))
    }

    fn show_movements(ctx: &mut PluginContext<'_>, movements: &[Movement]) {
        if movements.is_empty() {
            ctx.console.info("No movements in the selected range.");
            return;
        }

        let mut table = create_table();
        table.set_header(vec!["ID", "Reference", "Date", "Detail", "Debit", "Credit"]);
        for movement in movements {
            table.add_row(vec![
                movement.id.clone(),
                movement.reference.clone(),
                format_date(movement.date),
                movement.detail.clone(),
                movement.debit.to_string(),
                movement.credit.to_string(),
            ]);
        }
        ctx.console.write_line(&table.to_string());
        ctx.console
            .success(&format!("{} movements.", movements.len()));
    }
}

impl Default for TransactionsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for TransactionsPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn title(&self) -> &str {
        "Transactions"
    }

    fn description(&self) -> &str {
        "List bank account and credit card movements"
    }

    fn run(&mut self, ctx: &mut PluginContext<'_>) -> Result<()> {
        if ctx.client.status() != SessionStatus::LoggedIn {
            ctx.console
                .error("You must be logged in to see transactions.");
            return Ok(());
        }

        ctx.console.write_line("[1] Bank accounts");
        ctx.console.write_line("[2] Credit cards");
        let source = match choose_index(ctx.console, "", 2)? {
            Some(0) => Source::Account,
            Some(_) => Source::Card,
            None => return Ok(()),
        };

        let number = match source {
            Source::Account => Self::choose_account(ctx)?,
            Source::Card => Self::choose_card(ctx)?,
        };
        let Some(number) = number else {
            return Ok(());
        };

        let currency = Self::choose_currency(ctx)?;
        let Some(range) = self.choose_range(ctx)? else {
            return Ok(());
        };

        let result = match source {
            Source::Account => ctx.client.get_movements(&number, &currency, range),
            Source::Card => ctx
                .client
                .get_credit_card_movements(&number, &currency, range),
        };

        match result {
            Ok(movements) => Self::show_movements(ctx, &movements),
            Err(Error::Client(msg)) => {
                ctx.console
                    .error("No account found with the selected currency.");
                ctx.log(
                    LogEvent::new("movements_rejected")
                        .with_plugin(NAME)
                        .with_error(msg),
                );
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}
