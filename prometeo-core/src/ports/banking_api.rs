//! Banking API port
//!
//! Defines the interface to the upstream banking-aggregation service. The
//! BankingClient drives sessions through this trait without knowing whether
//! it talks to the real HTTP API or the offline demo data.

use crate::domain::result::Result;
use crate::domain::{
    BankAccount, CreditCard, Environment, LoginRequest, Movement, MovementQuery, Provider,
    ProviderDetail, SessionKey,
};

/// Who is calling and where: the API key and the environment it belongs to
#[derive(Debug, Clone, Copy)]
pub struct ApiTarget<'a> {
    pub api_key: &'a str,
    pub environment: Environment,
}

/// Successful reply to a login request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginReply {
    LoggedIn(SessionKey),
    /// The session exists but the bank needs one more answer
    InteractionRequired {
        session: SessionKey,
        context: String,
        field: String,
    },
}

/// Banking-aggregation API trait
///
/// Failed logins are reported as errors (`Error::WrongCredentials`,
/// `Error::InvalidApiKey`, ...), not as replies.
pub trait BankingApi: Send + Sync {
    /// Backend name (e.g., "prometeo", "demo")
    fn name(&self) -> &str;

    /// Log in to a provider
    fn login(&self, target: &ApiTarget<'_>, request: &LoginRequest) -> Result<LoginReply>;

    /// Complete a login that asked for an extra answer
    ///
    /// # Arguments
    /// * `session` - The pending session key from `LoginReply::InteractionRequired`
    /// * `request` - The original request with the answer appended to `extra_fields`
    fn answer_interaction(
        &self,
        target: &ApiTarget<'_>,
        session: &SessionKey,
        request: &LoginRequest,
    ) -> Result<LoginReply>;

    /// Close a session
    fn logout(&self, target: &ApiTarget<'_>, session: &SessionKey) -> Result<()>;

    /// List every provider (no session needed)
    fn get_providers(&self, target: &ApiTarget<'_>) -> Result<Vec<Provider>>;

    /// Describe one provider, including its login fields (no session needed)
    fn get_provider_detail(&self, target: &ApiTarget<'_>, code: &str) -> Result<ProviderDetail>;

    /// List the bank accounts of the session's user
    fn get_accounts(&self, target: &ApiTarget<'_>, session: &SessionKey) -> Result<Vec<BankAccount>>;

    /// List the credit cards of the session's user
    fn get_credit_cards(
        &self,
        target: &ApiTarget<'_>,
        session: &SessionKey,
    ) -> Result<Vec<CreditCard>>;

    /// Movements of a bank account
    fn get_movements(
        &self,
        target: &ApiTarget<'_>,
        session: &SessionKey,
        query: &MovementQuery,
    ) -> Result<Vec<Movement>>;

    /// Movements of a credit card
    fn get_credit_card_movements(
        &self,
        target: &ApiTarget<'_>,
        session: &SessionKey,
        query: &MovementQuery,
    ) -> Result<Vec<Movement>>;
}
