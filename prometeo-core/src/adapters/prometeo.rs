//! Prometeo banking API client
//!
//! Handles communication with the Prometeo banking API. Every request sends
//! the API key in the `X-API-Key` header; calls made inside a session add
//! the session key as the `key` query parameter.
//!
//! API Documentation: https://docs.prometeoapi.com/

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::{
    format_date, parse_date, BankAccount, CreditCard, LoginRequest, Movement, MovementQuery,
    Provider, ProviderDetail, SessionKey,
};
use crate::ports::{ApiTarget, BankingApi, LoginReply};

/// Environment variable to override the base URL of every environment.
/// Points the client at a local mock server when testing.
pub const PROMETEO_BASE_URL_ENV: &str = "PROMETEO_BASE_URL";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Field asked for when the API does not name one
const DEFAULT_INTERACTIVE_FIELD: &str = "personal_questions";

// =============================================================================
// API Response Models
// =============================================================================

#[derive(Debug, Deserialize)]
struct LoginResponse {
    status: String,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    field: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProvidersResponse {
    providers: Vec<Provider>,
}

#[derive(Debug, Deserialize)]
struct ProviderDetailResponse {
    provider: ProviderDetail,
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Vec<PrometeoAccount>,
}

/// Bank account as returned by the API
#[derive(Debug, Deserialize)]
struct PrometeoAccount {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
    name: String,
    number: String,
    #[serde(default)]
    branch: Option<String>,
    currency: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    balance: Decimal,
}

#[derive(Debug, Deserialize)]
struct CreditCardsResponse {
    credit_cards: Vec<PrometeoCreditCard>,
}

/// Credit card as returned by the API
#[derive(Debug, Deserialize)]
struct PrometeoCreditCard {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
    name: String,
    number: String,
    #[serde(default)]
    close_date: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    balance_local: Decimal,
    #[serde(default, deserialize_with = "deserialize_amount")]
    balance_dollar: Decimal,
}

#[derive(Debug, Deserialize)]
struct MovementsResponse {
    movements: Vec<PrometeoMovement>,
}

/// Movement as returned by the API
#[derive(Debug, Deserialize)]
struct PrometeoMovement {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
    #[serde(default)]
    reference: Option<String>,
    date: String,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    debit: Decimal,
    #[serde(default, deserialize_with = "deserialize_amount")]
    credit: Decimal,
}

/// Deserialize ID that can be number or string
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    match value {
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::String(s) => Ok(s),
        _ => Err(D::Error::custom("expected number or string for id")),
    }
}

/// Deserialize amount that can be number, string, empty or null (zero)
fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    match value {
        JsonValue::Null => Ok(Decimal::ZERO),
        JsonValue::Number(n) => n
            .to_string()
            .parse::<Decimal>()
            .map_err(|e| D::Error::custom(format!("invalid decimal: {}", e))),
        JsonValue::String(s) if s.trim().is_empty() => Ok(Decimal::ZERO),
        JsonValue::String(s) => s
            .trim()
            .parse::<Decimal>()
            .map_err(|e| D::Error::custom(format!("invalid decimal: {}", e))),
        _ => Err(D::Error::custom("expected number or string for amount")),
    }
}

/// Parse an API date; the API uses dd/mm/yyyy but ISO dates show up too
fn parse_api_date(raw: &str) -> Result<NaiveDate> {
    parse_date(raw)
        .or_else(|_| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                Error::provider(format!("Unexpected date '{}' in Prometeo response", raw))
            })
        })
}

fn parse_optional_api_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw {
        Some(s) if !s.trim().is_empty() => parse_api_date(s).map(Some),
        _ => Ok(None),
    }
}

// =============================================================================
// Prometeo HTTP Client
// =============================================================================

/// Prometeo API client
#[derive(Debug)]
pub struct PrometeoApi {
    client: Client,
    base_url_override: Option<String>,
}

impl PrometeoApi {
    /// Create a client that routes each environment to its own base URL.
    ///
    /// Uses the `PROMETEO_BASE_URL` environment variable if set.
    pub fn new() -> Result<Self> {
        match std::env::var(PROMETEO_BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::with_base_url(&url),
            _ => Self::build(None),
        }
    }

    /// Create a client that sends every environment to `base_url`.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(
                "Prometeo base URL must use http or https".to_string(),
            ));
        }

        Self::build(Some(base_url.trim_end_matches('/').to_string()))
    }

    fn build(base_url_override: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url_override,
        })
    }

    fn base_url<'a>(&'a self, target: &ApiTarget<'_>) -> &'a str {
        self.base_url_override
            .as_deref()
            .unwrap_or_else(|| target.environment.base_url())
    }

    /// Endpoint URL from path segments. Each segment is percent-encoded; a
    /// trailing empty segment gives the trailing slash Prometeo expects.
    fn endpoint(&self, target: &ApiTarget<'_>, segments: &[&str]) -> Result<Url> {
        let base = self.base_url(target);
        let mut url = Url::parse(base)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Base URL '{}' cannot take a path", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, target: &ApiTarget<'_>, segments: &[&str]) -> Result<RequestBuilder> {
        Ok(self
            .client
            .get(self.endpoint(target, segments)?)
            .header("X-API-Key", target.api_key))
    }

    fn post(&self, target: &ApiTarget<'_>, segments: &[&str]) -> Result<RequestBuilder> {
        Ok(self
            .client
            .post(self.endpoint(target, segments)?)
            .header("X-API-Key", target.api_key))
    }

    fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().map_err(map_request_error)?;
        let body = check_response(response)?;
        serde_json::from_value(body)
            .map_err(|e| Error::provider(format!("Failed to parse Prometeo response: {}", e)))
    }

    fn send_login(&self, request: RequestBuilder, login: &LoginRequest) -> Result<LoginReply> {
        let mut form: Vec<(&str, &str)> = vec![
            ("provider", login.provider.as_str()),
            ("username", login.username.as_str()),
            ("password", login.password.as_str()),
        ];
        for (name, value) in &login.extra_fields {
            form.push((name.as_str(), value.as_str()));
        }

        let response: LoginResponse = self.fetch(request.form(&form))?;
        map_login_response(response)
    }

    fn session_query<'a>(
        session: &'a SessionKey,
        query: &'a MovementQuery,
        start: &'a str,
        end: &'a str,
    ) -> [(&'static str, &'a str); 4] {
        [
            ("key", session.as_str()),
            ("currency", query.currency.as_str()),
            ("date_start", start),
            ("date_end", end),
        ]
    }
}

impl BankingApi for PrometeoApi {
    fn name(&self) -> &str {
        "prometeo"
    }

    fn login(&self, target: &ApiTarget<'_>, request: &LoginRequest) -> Result<LoginReply> {
        self.send_login(self.post(target, &["login", ""])?, request)
    }

    fn answer_interaction(
        &self,
        target: &ApiTarget<'_>,
        session: &SessionKey,
        request: &LoginRequest,
    ) -> Result<LoginReply> {
        let builder = self
            .post(target, &["login", ""])?
            .query(&[("key", session.as_str())]);
        self.send_login(builder, request)
    }

    fn logout(&self, target: &ApiTarget<'_>, session: &SessionKey) -> Result<()> {
        let _: JsonValue = self.fetch(
            self.get(target, &["logout", ""])?
                .query(&[("key", session.as_str())]),
        )?;
        Ok(())
    }

    fn get_providers(&self, target: &ApiTarget<'_>) -> Result<Vec<Provider>> {
        let response: ProvidersResponse = self.fetch(self.get(target, &["provider", ""])?)?;
        Ok(response.providers)
    }

    fn get_provider_detail(&self, target: &ApiTarget<'_>, code: &str) -> Result<ProviderDetail> {
        let response: ProviderDetailResponse =
            self.fetch(self.get(target, &["provider", code, ""])?)?;
        Ok(response.provider)
    }

    fn get_accounts(&self, target: &ApiTarget<'_>, session: &SessionKey) -> Result<Vec<BankAccount>> {
        let response: AccountsResponse = self.fetch(
            self.get(target, &["account", ""])?
                .query(&[("key", session.as_str())]),
        )?;
        Ok(response.accounts.into_iter().map(map_account).collect())
    }

    fn get_credit_cards(
        &self,
        target: &ApiTarget<'_>,
        session: &SessionKey,
    ) -> Result<Vec<CreditCard>> {
        let response: CreditCardsResponse = self.fetch(
            self.get(target, &["credit-card", ""])?
                .query(&[("key", session.as_str())]),
        )?;
        response.credit_cards.into_iter().map(map_credit_card).collect()
    }

    fn get_movements(
        &self,
        target: &ApiTarget<'_>,
        session: &SessionKey,
        query: &MovementQuery,
    ) -> Result<Vec<Movement>> {
        let start = format_date(query.range.start());
        let end = format_date(query.range.end());
        let response: MovementsResponse = self.fetch(
            self.get(target, &["account", query.number.as_str(), "movement", ""])?
                .query(&Self::session_query(session, query, &start, &end)),
        )?;
        response.movements.into_iter().map(map_movement).collect()
    }

    fn get_credit_card_movements(
        &self,
        target: &ApiTarget<'_>,
        session: &SessionKey,
        query: &MovementQuery,
    ) -> Result<Vec<Movement>> {
        let start = format_date(query.range.start());
        let end = format_date(query.range.end());
        let response: MovementsResponse = self.fetch(
            self.get(target, &["credit-card", query.number.as_str(), "movements"])?
                .query(&Self::session_query(session, query, &start, &end)),
        )?;
        response.movements.into_iter().map(map_movement).collect()
    }
}

// =============================================================================
// Response handling
// =============================================================================

/// Map request errors to user-friendly messages
fn map_request_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::network(format!(
            "Connection timed out after {} seconds",
            REQUEST_TIMEOUT_SECS
        ))
    } else if error.is_connect() {
        Error::network("Unable to connect to Prometeo servers")
    } else {
        Error::network(format!("Prometeo request failed: {}", error))
    }
}

/// Check HTTP status and the body's `status` field
fn check_response(response: Response) -> Result<JsonValue> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(Error::InvalidApiKey);
    }

    let text = response.text().map_err(map_request_error)?;
    let body: Option<JsonValue> = serde_json::from_str(&text).ok();

    if !status.is_success() {
        let message = body.as_ref().and_then(message_of);
        return Err(match status {
            StatusCode::NOT_FOUND => {
                Error::client(message.unwrap_or_else(|| "Resource not found".to_string()))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                Error::provider("Prometeo rate limit exceeded. Please wait a moment and try again.")
            }
            _ => Error::provider(match message {
                Some(m) => format!("HTTP {}: {}", status.as_u16(), m),
                None => format!("HTTP {}", status.as_u16()),
            }),
        });
    }

    let body = body.ok_or_else(|| Error::provider("Failed to parse Prometeo response"))?;

    if body.get("status").and_then(JsonValue::as_str) == Some("error") {
        let message = message_of(&body).unwrap_or_else(|| "Unknown error".to_string());
        return Err(classify_error_message(message));
    }

    Ok(body)
}

fn message_of(body: &JsonValue) -> Option<String> {
    body.get("message")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
}

/// Errors about accounts are request problems; the rest come from the bank
fn classify_error_message(message: String) -> Error {
    if message.to_lowercase().contains("account") {
        Error::Client(message)
    } else {
        Error::Provider(message)
    }
}

fn map_login_response(response: LoginResponse) -> Result<LoginReply> {
    match response.status.as_str() {
        "logged_in" => {
            let key = response
                .key
                .ok_or_else(|| Error::provider("Login succeeded without a session key"))?;
            Ok(LoginReply::LoggedIn(SessionKey::new(key)))
        }
        "interaction_required" => {
            let key = response
                .key
                .ok_or_else(|| Error::provider("Interactive login without a session key"))?;
            Ok(LoginReply::InteractionRequired {
                session: SessionKey::new(key),
                context: response.context.unwrap_or_default(),
                field: response
                    .field
                    .unwrap_or_else(|| DEFAULT_INTERACTIVE_FIELD.to_string()),
            })
        }
        "wrong_credentials" => Err(Error::WrongCredentials),
        other => Err(Error::provider(format!("Unexpected login status '{}'", other))),
    }
}

fn map_account(account: PrometeoAccount) -> BankAccount {
    BankAccount {
        id: account.id,
        name: account.name,
        number: account.number,
        branch: account.branch.filter(|b| !b.trim().is_empty()),
        currency: account.currency,
        balance: account.balance,
    }
}

fn map_credit_card(card: PrometeoCreditCard) -> Result<CreditCard> {
    Ok(CreditCard {
        close_date: parse_optional_api_date(card.close_date.as_deref())?,
        due_date: parse_optional_api_date(card.due_date.as_deref())?,
        id: card.id,
        name: card.name,
        number: card.number,
        balance_local: card.balance_local,
        balance_dollar: card.balance_dollar,
    })
}

fn map_movement(movement: PrometeoMovement) -> Result<Movement> {
    Ok(Movement {
        date: parse_api_date(&movement.date)?,
        id: movement.id,
        reference: movement.reference.unwrap_or_default(),
        detail: movement.detail.unwrap_or_default(),
        debit: movement.debit,
        credit: movement.credit,
    })
}

// =============================================================================
// Tests
// =============================================================================
