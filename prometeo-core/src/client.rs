//! Banking client - the session state machine over a `BankingApi`
//!
//! The client owns the API key, the environment, the session handle and the
//! session status. Key and environment changes are explicit transitions that
//! close any open session first, so a session never outlives the key or the
//! endpoint it was opened with.

use crate::domain::result::{Error, Result};
use crate::domain::{
    BankAccount, CreditCard, DateRange, Environment, LoginOutcome, LoginRequest, Movement,
    MovementQuery, Provider, ProviderDetail, SessionKey, SessionStatus,
};
use crate::ports::{ApiTarget, BankingApi, LoginReply};

/// Login waiting for an interactive answer
struct PendingLogin {
    session: SessionKey,
    request: LoginRequest,
    field: String,
}

/// Shared banking client used by every menu plugin
pub struct BankingClient {
    api: Box<dyn BankingApi>,
    api_key: String,
    environment: Environment,
    session: Option<SessionKey>,
    pending: Option<PendingLogin>,
    status: SessionStatus,
}

impl BankingClient {
    pub fn new(api: Box<dyn BankingApi>, api_key: impl Into<String>, environment: Environment) -> Self {
        Self {
            api,
            api_key: api_key.into(),
            environment,
            session: None,
            pending: None,
            status: SessionStatus::LoggedOut,
        }
    }

    fn target(&self) -> ApiTarget<'_> {
        ApiTarget {
            api_key: &self.api_key,
            environment: self.environment,
        }
    }

    /// Name of the backend in use ("prometeo", "demo")
    pub fn backend(&self) -> &str {
        self.api.name()
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Status bookkeeping belongs to the caller driving the login
    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    // === Transitions ===

    /// Switch environment, closing any open session first.
    ///
    /// Returns whether a session was closed. The new environment is in
    /// effect and the status is `LoggedOut` even when the upstream logout
    /// fails; that failure is returned for reporting.
    pub fn change_environment(&mut self, environment: Environment) -> Result<bool> {
        let closed = self.logout();
        self.environment = environment;
        self.status = SessionStatus::LoggedOut;
        closed
    }

    /// Replace the API key, closing any open session first.
    ///
    /// Same contract as [`change_environment`](Self::change_environment).
    pub fn change_api_key(&mut self, api_key: impl Into<String>) -> Result<bool> {
        let closed = self.logout();
        self.api_key = api_key.into();
        self.status = SessionStatus::LoggedOut;
        closed
    }

    // === Session ===

    /// Log in to a provider.
    ///
    /// Any previous session is dropped before the upstream call, so a
    /// failed attempt leaves no session behind. Callers close the old
    /// session upstream with [`logout`](Self::logout) first. The status is
    /// left untouched; callers set it from the outcome.
    pub fn login(&mut self, request: &LoginRequest) -> Result<LoginOutcome> {
        self.pending = None;
        self.session = None;
        let reply = self.api.login(&self.target(), request)?;
        Ok(self.accept_reply(reply, request))
    }

    /// Answer the question of an interactive login and finish it
    pub fn answer_interaction(&mut self, answer: &str) -> Result<LoginOutcome> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| Error::validation("No login is waiting for an answer"))?;

        let request = pending.request.with_field(pending.field, answer);
        let reply = self
            .api
            .answer_interaction(&self.target(), &pending.session, &request)?;
        Ok(self.accept_reply(reply, &request))
    }

    fn accept_reply(&mut self, reply: LoginReply, request: &LoginRequest) -> LoginOutcome {
        match reply {
            LoginReply::LoggedIn(session) => {
                self.session = Some(session);
                LoginOutcome::LoggedIn
            }
            LoginReply::InteractionRequired {
                session,
                context,
                field,
            } => {
                self.pending = Some(PendingLogin {
                    session,
                    request: request.clone(),
                    field: field.clone(),
                });
                LoginOutcome::InteractionRequired { context, field }
            }
        }
    }

    /// Close the current session.
    ///
    /// Returns `false` without calling upstream when there is no session.
    /// Otherwise the session is dropped locally and the status set to
    /// `LoggedOut` before the upstream call, whatever its result.
    pub fn logout(&mut self) -> Result<bool> {
        self.pending = None;
        let Some(session) = self.session.take() else {
            return Ok(false);
        };
        self.status = SessionStatus::LoggedOut;
        self.api.logout(&self.target(), &session)?;
        Ok(true)
    }

    fn session(&self) -> Result<&SessionKey> {
        self.session.as_ref().ok_or(Error::NotLoggedIn)
    }

    // === Data ===

    pub fn get_providers(&self) -> Result<Vec<Provider>> {
        self.api.get_providers(&self.target())
    }

    pub fn get_provider_detail(&self, code: &str) -> Result<ProviderDetail> {
        self.api.get_provider_detail(&self.target(), code)
    }

    pub fn get_bank_accounts(&self) -> Result<Vec<BankAccount>> {
        let session = self.session()?;
        self.api.get_accounts(&self.target(), session)
    }

    pub fn get_credit_cards(&self) -> Result<Vec<CreditCard>> {
        let session = self.session()?;
        self.api.get_credit_cards(&self.target(), session)
    }

    pub fn get_movements(&self, account: &str, currency: &str, range: DateRange) -> Result<Vec<Movement>> {
        let session = self.session()?;
        let query = MovementQuery::new(account, currency, range);
        self.api.get_movements(&self.target(), session, &query)
    }

    pub fn get_credit_card_movements(
        &self,
        card: &str,
        currency: &str,
        range: DateRange,
    ) -> Result<Vec<Movement>> {
        let session = self.session()?;
        let query = MovementQuery::new(card, currency, range);
        self.api
            .get_credit_card_movements(&self.target(), session, &query)
    }
}
