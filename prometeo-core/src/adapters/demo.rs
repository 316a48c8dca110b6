//! Demo banking backend
//!
//! An offline stand-in for the Prometeo API used by demo mode and by tests:
//! - a fixed provider list spread over several countries
//! - two bank accounts (UYU, USD) and one credit card
//! - deterministic movements for any requested date range
//!
//! Every call is recorded in a shared `CallLog` so callers can check which
//! upstream operations actually ran.

use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{
    AuthField, BankAccount, CreditCard, LoginRequest, Movement, MovementQuery, Provider,
    ProviderDetail, SessionKey,
};
use crate::ports::{ApiTarget, BankingApi, LoginReply};

/// Session key handed out by the demo backend
pub const DEMO_SESSION_KEY: &str = "demo_session";

/// Field the demo backend asks for when interaction is enabled
pub const DEMO_INTERACTIVE_FIELD: &str = "personal_questions";

/// Failure the demo backend can be told to produce on login
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemoFailure {
    InvalidApiKey,
    Provider(String),
    Network(String),
}

impl DemoFailure {
    fn to_error(&self) -> Error {
        match self {
            DemoFailure::InvalidApiKey => Error::InvalidApiKey,
            DemoFailure::Provider(m) => Error::provider(m.clone()),
            DemoFailure::Network(m) => Error::network(m.clone()),
        }
    }
}

/// Shared record of the operations a `DemoBankingApi` served
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn record(&self, call: &str) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(call.to_string());
        }
    }

    /// Operation names in call order
    pub fn calls(&self) -> Vec<String> {
        self.0.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// How many times `call` ran
    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }
}

/// Offline banking backend with deterministic data
#[derive(Debug, Clone, Default)]
pub struct DemoBankingApi {
    required_api_key: Option<String>,
    interaction_required: bool,
    login_failure: Option<DemoFailure>,
    answer_failure: Option<DemoFailure>,
    logout_fails: bool,
    call_log: CallLog,
}

impl DemoBankingApi {
    /// Accepts any non-empty API key
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept `api_key`
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.required_api_key = Some(api_key.into());
        self
    }

    /// Ask for a security answer before completing logins
    pub fn with_interaction(mut self) -> Self {
        self.interaction_required = true;
        self
    }

    /// Make every login fail with `failure`
    pub fn with_login_failure(mut self, failure: DemoFailure) -> Self {
        self.login_failure = Some(failure);
        self
    }

    /// Make every interactive answer fail with `failure`
    pub fn with_answer_failure(mut self, failure: DemoFailure) -> Self {
        self.answer_failure = Some(failure);
        self
    }

    /// Make upstream logouts fail with a network error
    pub fn with_failing_logout(mut self) -> Self {
        self.logout_fails = true;
        self
    }

    /// Handle on the calls this backend serves (shared with clones)
    pub fn call_log(&self) -> CallLog {
        self.call_log.clone()
    }

    fn check_key(&self, target: &ApiTarget<'_>) -> Result<()> {
        let valid = match &self.required_api_key {
            Some(required) => target.api_key == required,
            None => !target.api_key.trim().is_empty(),
        };
        if valid {
            Ok(())
        } else {
            Err(Error::InvalidApiKey)
        }
    }

    fn check_session(&self, target: &ApiTarget<'_>, session: &SessionKey) -> Result<()> {
        self.check_key(target)?;
        if session.as_str() == DEMO_SESSION_KEY {
            Ok(())
        } else {
            Err(Error::provider("Invalid key"))
        }
    }

    fn complete_login(&self, request: &LoginRequest) -> Result<LoginReply> {
        if let Some(failure) = &self.login_failure {
            return Err(failure.to_error());
        }

        let demo = LoginRequest::sandbox_demo();
        if request.provider != demo.provider
            || request.username != demo.username
            || request.password != demo.password
        {
            return Err(Error::WrongCredentials);
        }

        let answered = request
            .extra_fields
            .iter()
            .any(|(name, value)| name == DEMO_INTERACTIVE_FIELD && !value.trim().is_empty());

        if self.interaction_required && !answered {
            return Ok(LoginReply::InteractionRequired {
                session: SessionKey::new("demo_pending"),
                context: "What is your pet's name?".to_string(),
                field: DEMO_INTERACTIVE_FIELD.to_string(),
            });
        }

        Ok(LoginReply::LoggedIn(SessionKey::new(DEMO_SESSION_KEY)))
    }
}

impl BankingApi for DemoBankingApi {
    fn name(&self) -> &str {
        "demo"
    }

    fn login(&self, target: &ApiTarget<'_>, request: &LoginRequest) -> Result<LoginReply> {
        self.call_log.record("login");
        self.check_key(target)?;
        self.complete_login(request)
    }

    fn answer_interaction(
        &self,
        target: &ApiTarget<'_>,
        _session: &SessionKey,
        request: &LoginRequest,
    ) -> Result<LoginReply> {
        self.call_log.record("answer_interaction");
        self.check_key(target)?;
        if let Some(failure) = &self.answer_failure {
            return Err(failure.to_error());
        }
        self.complete_login(request)
    }

    fn logout(&self, target: &ApiTarget<'_>, _session: &SessionKey) -> Result<()> {
        self.call_log.record("logout");
        self.check_key(target)?;
        if self.logout_fails {
            return Err(Error::network("Unable to connect to Prometeo servers"));
        }
        Ok(())
    }

    fn get_providers(&self, target: &ApiTarget<'_>) -> Result<Vec<Provider>> {
        self.call_log.record("get_providers");
        self.check_key(target)?;
        Ok(demo_providers())
    }

    fn get_provider_detail(&self, target: &ApiTarget<'_>, code: &str) -> Result<ProviderDetail> {
        self.call_log.record("get_provider_detail");
        self.check_key(target)?;

        let provider = demo_providers()
            .into_iter()
            .find(|p| p.code == code)
            .ok_or_else(|| Error::client(format!("Provider '{}' not found", code)))?;

        Ok(ProviderDetail {
            name: provider.name,
            country: provider.country,
            auth_fields: vec![
                auth_field("username", "text", false, false),
                auth_field("password", "password", false, false),
                auth_field("document", "text", false, true),
                auth_field(DEMO_INTERACTIVE_FIELD, "text", true, true),
            ],
        })
    }

    fn get_accounts(&self, target: &ApiTarget<'_>, session: &SessionKey) -> Result<Vec<BankAccount>> {
        self.call_log.record("get_accounts");
        self.check_session(target, session)?;
        Ok(demo_accounts())
    }

    fn get_credit_cards(
        &self,
        target: &ApiTarget<'_>,
        session: &SessionKey,
    ) -> Result<Vec<CreditCard>> {
        self.call_log.record("get_credit_cards");
        self.check_session(target, session)?;
        Ok(demo_credit_cards())
    }

    fn get_movements(
        &self,
        target: &ApiTarget<'_>,
        session: &SessionKey,
        query: &MovementQuery,
    ) -> Result<Vec<Movement>> {
        self.call_log.record("get_movements");
        self.check_session(target, session)?;

        let matches = demo_accounts()
            .iter()
            .any(|a| a.number == query.number && a.currency == query.currency);
        if !matches {
            return Err(Error::client(format!(
                "No account {} found for currency {}",
                query.number, query.currency
            )));
        }

        Ok(generate_movements(query))
    }

    fn get_credit_card_movements(
        &self,
        target: &ApiTarget<'_>,
        session: &SessionKey,
        query: &MovementQuery,
    ) -> Result<Vec<Movement>> {
        self.call_log.record("get_credit_card_movements");
        self.check_session(target, session)?;

        if !demo_credit_cards().iter().any(|c| c.number == query.number) {
            return Err(Error::client(format!(
                "No account {} found for currency {}",
                query.number, query.currency
            )));
        }

        Ok(generate_movements(query))
    }
}

fn auth_field(name: &str, field_type: &str, interactive: bool, optional: bool) -> AuthField {
    AuthField {
        name: name.to_string(),
        field_type: field_type.to_string(),
        interactive,
        optional,
        label_es: None,
        label_en: None,
    }
}

/// Demo providers, deliberately not sorted by country
pub fn demo_providers() -> Vec<Provider> {
    vec![
        Provider::new("test", "Test Bank", "UY"),
        Provider::new("itau_uy", "Banco Itaú", "UY"),
        Provider::new("galicia", "Banco Galicia", "AR"),
        Provider::new("bcp_pe", "BCP", "PE"),
        Provider::new("brou", "BROU", "UY"),
        Provider::new("bbva_mx", "BBVA México", "MX"),
        Provider::new("santander_ar", "Santander Río", "AR"),
    ]
}

/// Demo bank accounts
pub fn demo_accounts() -> Vec<BankAccount> {
    vec![
        BankAccount {
            id: "acc-001".to_string(),
            name: "Caja de ahorro".to_string(),
            number: "001234567".to_string(),
            branch: Some("Centro".to_string()),
            currency: "UYU".to_string(),
            balance: Decimal::new(4823475, 2),
        },
        BankAccount {
            id: "acc-002".to_string(),
            name: "Cuenta corriente".to_string(),
            number: "009876543".to_string(),
            branch: None,
            currency: "USD".to_string(),
            balance: Decimal::new(187500, 2),
        },
    ]
}

/// Demo credit cards
pub fn demo_credit_cards() -> Vec<CreditCard> {
    vec![CreditCard {
        id: "cc-001".to_string(),
        name: "Visa Internacional".to_string(),
        number: "4111".to_string(),
        close_date: NaiveDate::from_ymd_opt(2025, 1, 20),
        due_date: NaiveDate::from_ymd_opt(2025, 2, 5),
        balance_local: Decimal::new(1254990, 2),
        balance_dollar: Decimal::new(4500, 2),
    }]
}

/// One movement every three days inside the range, alternating debit/credit
fn generate_movements(query: &MovementQuery) -> Vec<Movement> {
    let details = [
        ("Supermercado", Decimal::new(245050, 2), true),
        ("Transferencia recibida", Decimal::new(1500000, 2), false),
        ("UTE", Decimal::new(189900, 2), true),
        ("Antel", Decimal::new(99000, 2), true),
        ("Sueldo", Decimal::new(6500000, 2), false),
    ];

    let mut movements = Vec::new();
    let mut date = query.range.start();
    let mut i = 0usize;
    while date <= query.range.end() {
        let (detail, amount, is_debit) = details[i % details.len()];
        movements.push(Movement {
            id: format!("{}-{}", query.number, i + 1),
            reference: format!("{:06}", 100 + i),
            date,
            detail: detail.to_string(),
            debit: if is_debit { amount } else { Decimal::ZERO },
            credit: if is_debit { Decimal::ZERO } else { amount },
        });
        date += Duration::days(3);
        i += 1;
    }
    movements
}
