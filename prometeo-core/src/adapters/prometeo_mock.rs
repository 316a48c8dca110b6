//! Mock Prometeo API server for testing
//!
//! A small HTTP server that answers like the Prometeo banking API, so the
//! real HTTP client can be exercised without network access or an API key.
//!
//! - POST /login/ returns { status, key } (or wrong_credentials / interaction_required)
//! - GET /provider/ and /provider/{code}/ return provider data
//! - GET /account/, /credit-card/ and their movement endpoints need `?key=`

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serde_json::json;

/// Session key handed out by the mock
pub const MOCK_SESSION_KEY: &str = "mock_session";

/// Mock Prometeo server for testing
pub struct MockPrometeoServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Configuration for mock behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// API key the server accepts
    pub api_key: String,
    /// Currency of the mock accounts; other currencies get "Account not found"
    pub currency: String,
    /// Ask for a security answer before completing the login
    pub interaction_required: bool,
    /// Fail logins with a provider error
    pub provider_error: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            api_key: "valid_key".to_string(),
            currency: "UYU".to_string(),
            interaction_required: false,
            provider_error: false,
        }
    }
}

impl MockPrometeoServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        // Non-blocking accept so the server can be stopped
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        thread::spawn(move || handle_connection(stream, &cfg));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    /// Get the base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockPrometeoServer {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Request {
    method: String,
    path: String,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
    form: HashMap<String, String>,
}

/// Read one HTTP request: headers first, then Content-Length bytes of body
fn read_request(stream: &mut TcpStream) -> Option<Request> {
    stream.set_nonblocking(false).ok()?;

    let mut data = Vec::new();
    let mut buffer = [0; 4096];
    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = find_header_end(&data) {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while data.len() < body_start + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }
    let body_end = data.len().min(body_start + content_length);
    let body = String::from_utf8_lossy(&data[body_start..body_end]).to_string();

    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), parse_urlencoded(q)),
        None => (target, HashMap::new()),
    };

    Some(Request {
        method,
        path,
        query,
        headers,
        form: parse_urlencoded(&body),
    })
}

fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_urlencoded(s: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(s.as_bytes())
        .into_owned()
        .collect()
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig) {
    let Some(request) = read_request(&mut stream) else {
        return;
    };

    if request.headers.get("x-api-key") != Some(&config.api_key) {
        send_response(&mut stream, 403, "Forbidden", &json!({"message": "Key not Found"}));
        return;
    }

    let (status, body) = route(&request, config);
    let text = if status == 200 { "OK" } else { "Not Found" };
    send_response(&mut stream, status, text, &body);
}

fn route(request: &Request, config: &MockConfig) -> (u16, serde_json::Value) {
    let path = request.path.as_str();
    let has_session = request.query.get("key").map(String::as_str) == Some(MOCK_SESSION_KEY);
    let invalid_session = json!({"status": "error", "message": "Invalid key"});

    match (request.method.as_str(), path) {
        ("POST", "/login/") => (200, login(request, config)),
        ("GET", "/logout/") => (200, json!({"status": "logged_out"})),
        ("GET", "/provider/") => (
            200,
            json!({
                "status": "success",
                "providers": [
                    {"code": "test", "name": "Test Bank", "country": "UY"},
                    {"code": "bbva_ar", "name": "BBVA Francés", "country": "AR"},
                    {"code": "santander_pe", "name": "Santander", "country": "PE"}
                ]
            }),
        ),
        ("GET", "/provider/test/") => (
            200,
            json!({
                "status": "success",
                "provider": {
                    "name": "Test Bank",
                    "country": "UY",
                    "auth_fields": [
                        {"name": "username", "type": "text", "interactive": false, "optional": false},
                        {"name": "password", "type": "password", "interactive": false, "optional": false}
                    ]
                }
            }),
        ),
        ("GET", "/provider/odd%20code%2F1/") => (
            200,
            json!({
                "status": "success",
                "provider": {"name": "Odd Bank", "country": "AR", "auth_fields": []}
            }),
        ),
        ("GET", "/account/") if has_session => (
            200,
            json!({
                "status": "success",
                "accounts": [
                    {"id": 1, "name": "Caja de ahorro", "number": "001234", "branch": "Centro",
                     "currency": config.currency, "balance": 1500.75}
                ]
            }),
        ),
        ("GET", "/credit-card/") if has_session => (
            200,
            json!({
                "status": "success",
                "credit_cards": [
                    {"id": 2, "name": "Visa", "number": "4111", "close_date": "20/01/2025",
                     "due_date": "05/02/2025", "balance_local": "2500.00", "balance_dollar": 30}
                ]
            }),
        ),
        ("GET", p) if p.starts_with("/account/") || p.starts_with("/credit-card/") => {
            if !has_session {
                (200, invalid_session)
            } else if request.query.get("currency") != Some(&config.currency) {
                (200, json!({"status": "error", "message": "Account not found"}))
            } else {
                (
                    200,
                    json!({
                        "status": "success",
                        "movements": [
                            {"id": 10, "reference": "000123", "date": "02/01/2025",
                             "detail": "Supermarket", "debit": 350.5, "credit": ""},
                            {"id": 11, "reference": "000124", "date": "03/01/2025",
                             "detail": "Salary", "debit": "", "credit": 50000}
                        ]
                    }),
                )
            }
        }
        _ => (404, json!({"status": "error", "message": "Endpoint not found"})),
    }
}

fn login(request: &Request, config: &MockConfig) -> serde_json::Value {
    if config.provider_error {
        return json!({"status": "error", "message": "Bank unavailable"});
    }

    let form = &request.form;
    let valid = form.get("provider").map(String::as_str) == Some("test")
        && form.get("username").map(String::as_str) == Some("12345")
        && form.get("password").map(String::as_str) == Some("gfdsa");

    if !valid {
        return json!({"status": "wrong_credentials"});
    }

    if config.interaction_required && !form.contains_key("personal_questions") {
        return json!({
            "status": "interaction_required",
            "key": "pending_session",
            "context": "What is your pet's name?",
            "field": "personal_questions"
        });
    }

    json!({"status": "logged_in", "key": MOCK_SESSION_KEY})
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &serde_json::Value) {
    let body = body.to_string();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;
    use crate::adapters::prometeo::PrometeoApi;
    use crate::domain::result::Error;
    use crate::domain::{DateRange, Environment, LoginRequest, MovementQuery, SessionKey};
    use crate::ports::{ApiTarget, BankingApi, LoginReply};

    fn target(api_key: &str) -> ApiTarget<'_> {
        ApiTarget {
            api_key,
            environment: Environment::Sandbox,
        }
    }

    fn january() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_login_with_demo_credentials() {
        let server = MockPrometeoServer::start(MockConfig::default()).unwrap();
        let api = PrometeoApi::with_base_url(&server.base_url()).unwrap();

        let reply = api
            .login(&target("valid_key"), &LoginRequest::sandbox_demo())
            .unwrap();
        assert_eq!(reply, LoginReply::LoggedIn(SessionKey::new(MOCK_SESSION_KEY)));
    }

    #[test]
    fn test_login_wrong_credentials() {
        let server = MockPrometeoServer::start(MockConfig::default()).unwrap();
        let api = PrometeoApi::with_base_url(&server.base_url()).unwrap();

        let result = api.login(
            &target("valid_key"),
            &LoginRequest::new("test", "12345", "wrong"),
        );
        assert!(matches!(result, Err(Error::WrongCredentials)));
    }

    #[test]
    fn test_invalid_api_key() {
        let server = MockPrometeoServer::start(MockConfig::default()).unwrap();
        let api = PrometeoApi::with_base_url(&server.base_url()).unwrap();

        let result = api.get_providers(&target("bogus"));
        assert!(matches!(result, Err(Error::InvalidApiKey)));
    }

    #[test]
    fn test_login_provider_error() {
        let server = MockPrometeoServer::start(MockConfig {
            provider_error: true,
            ..Default::default()
        })
        .unwrap();
        let api = PrometeoApi::with_base_url(&server.base_url()).unwrap();

        let result = api.login(&target("valid_key"), &LoginRequest::sandbox_demo());
        match result {
            Err(Error::Provider(message)) => assert_eq!(message, "Bank unavailable"),
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[test]
    fn test_interactive_login() {
        let server = MockPrometeoServer::start(MockConfig {
            interaction_required: true,
            ..Default::default()
        })
        .unwrap();
        let api = PrometeoApi::with_base_url(&server.base_url()).unwrap();
        let request = LoginRequest::sandbox_demo();

        let reply = api.login(&target("valid_key"), &request).unwrap();
        let (session, field) = match reply {
            LoginReply::InteractionRequired { session, field, .. } => (session, field),
            other => panic!("expected interaction, got {:?}", other),
        };

        let answered = request.with_field(field, "Firulais");
        let reply = api
            .answer_interaction(&target("valid_key"), &session, &answered)
            .unwrap();
        assert_eq!(reply, LoginReply::LoggedIn(SessionKey::new(MOCK_SESSION_KEY)));
    }

    #[test]
    fn test_providers_and_detail() {
        let server = MockPrometeoServer::start(MockConfig::default()).unwrap();
        let api = PrometeoApi::with_base_url(&server.base_url()).unwrap();

        let providers = api.get_providers(&target("valid_key")).unwrap();
        assert_eq!(providers.len(), 3);

        let detail = api.get_provider_detail(&target("valid_key"), "test").unwrap();
        assert_eq!(detail.name, "Test Bank");
        assert_eq!(detail.auth_fields.len(), 2);
        assert_eq!(detail.auth_fields[1].field_type, "password");

        let missing = api.get_provider_detail(&target("valid_key"), "nope");
        assert!(matches!(missing, Err(Error::Client(_))));

        // Reserved characters stay inside their path segment
        let odd = api
            .get_provider_detail(&target("valid_key"), "odd code/1")
            .unwrap();
        assert_eq!(odd.name, "Odd Bank");
    }

    #[test]
    fn test_accounts_and_movements() {
        let server = MockPrometeoServer::start(MockConfig::default()).unwrap();
        let api = PrometeoApi::with_base_url(&server.base_url()).unwrap();
        let session = SessionKey::new(MOCK_SESSION_KEY);

        let accounts = api.get_accounts(&target("valid_key"), &session).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, "1");
        assert_eq!(accounts[0].balance, Decimal::new(150075, 2));

        let query = MovementQuery::new(accounts[0].number.clone(), "UYU", january());
        let movements = api
            .get_movements(&target("valid_key"), &session, &query)
            .unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].detail, "Supermarket");
        assert_eq!(movements[1].credit, Decimal::new(50000, 0));
    }

    #[test]
    fn test_movements_wrong_currency_is_client_error() {
        let server = MockPrometeoServer::start(MockConfig::default()).unwrap();
        let api = PrometeoApi::with_base_url(&server.base_url()).unwrap();
        let session = SessionKey::new(MOCK_SESSION_KEY);

        let query = MovementQuery::new("001234", "USD", january());
        let result = api.get_movements(&target("valid_key"), &session, &query);
        assert!(matches!(result, Err(Error::Client(_))));
    }

    #[test]
    fn test_credit_cards_and_movements() {
        let server = MockPrometeoServer::start(MockConfig::default()).unwrap();
        let api = PrometeoApi::with_base_url(&server.base_url()).unwrap();
        let session = SessionKey::new(MOCK_SESSION_KEY);

        let cards = api.get_credit_cards(&target("valid_key"), &session).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].due_date, NaiveDate::from_ymd_opt(2025, 2, 5));

        let query = MovementQuery::new(cards[0].number.clone(), "UYU", january());
        let movements = api
            .get_credit_card_movements(&target("valid_key"), &session, &query)
            .unwrap();
        assert_eq!(movements.len(), 2);
    }

    #[test]
    fn test_expired_session_is_provider_error() {
        let server = MockPrometeoServer::start(MockConfig::default()).unwrap();
        let api = PrometeoApi::with_base_url(&server.base_url()).unwrap();

        let query = MovementQuery::new("001234", "UYU", january());
        let result = api.get_movements(
            &target("valid_key"),
            &SessionKey::new("stale"),
            &query,
        );
        assert!(matches!(result, Err(Error::Provider(_))));
    }

    #[test]
    fn test_logout() {
        let server = MockPrometeoServer::start(MockConfig::default()).unwrap();
        let api = PrometeoApi::with_base_url(&server.base_url()).unwrap();

        api.logout(&target("valid_key"), &SessionKey::new(MOCK_SESSION_KEY))
            .unwrap();
    }

    #[test]
    fn test_connection_refused_is_network_error() {
        let server = MockPrometeoServer::start(MockConfig::default()).unwrap();
        let url = server.base_url();
        drop(server);

        let api = PrometeoApi::with_base_url(&url).unwrap();
        let result = api.get_providers(&target("valid_key"));
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
