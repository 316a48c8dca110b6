//! Session domain model: environments, session status and login payloads

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::Error;

/// Upstream endpoint the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Sandbox,
    Testing,
    Production,
}

impl Environment {
    /// Every environment, in menu order
    pub const ALL: [Environment; 3] = [
        Environment::Sandbox,
        Environment::Testing,
        Environment::Production,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Testing => "testing",
            Environment::Production => "production",
        }
    }

    /// Base URL of the banking API for this environment
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Sandbox => "https://banking.sandbox.prometeoapi.com",
            Environment::Testing => "https://test.prometeo.qualia.uy",
            Environment::Production => "https://prometeo.qualia.uy",
        }
    }

    pub fn is_sandbox(&self) -> bool {
        matches!(self, Environment::Sandbox)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sandbox" => Ok(Environment::Sandbox),
            "testing" => Ok(Environment::Testing),
            "production" => Ok(Environment::Production),
            other => Err(Error::Config(format!("Unknown environment: {}", other))),
        }
    }
}

/// Session status as seen by the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    LoggedOut,
    LoggedIn,
    WrongCredentials,
    InteractionRequired,
    ProviderError,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::LoggedOut => "logged out",
            SessionStatus::LoggedIn => "logged in",
            SessionStatus::WrongCredentials => "wrong credentials",
            SessionStatus::InteractionRequired => "interaction required",
            SessionStatus::ProviderError => "provider error",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque session token returned by a successful login
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Session keys grant account access; keep them out of debug output.
impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(***)")
    }
}

/// Credentials for a provider login
#[derive(Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub provider: String,
    pub username: String,
    pub password: String,
    /// Answers to interactive fields (field name, value)
    pub extra_fields: Vec<(String, String)>,
}

impl LoginRequest {
    pub fn new(
        provider: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            username: username.into(),
            password: password.into(),
            extra_fields: Vec::new(),
        }
    }

    /// Demo credentials accepted by the sandbox environment
    pub fn sandbox_demo() -> Self {
        Self::new("test", "12345", "gfdsa")
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_fields.push((name.into(), value.into()));
        self
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("provider", &self.provider)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Outcome of a login that did not fail outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn,
    /// The bank wants one more answer (e.g. a security question)
    InteractionRequired { context: String, field: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_round_trip_names() {
        for env in Environment::ALL {
            assert_eq!(env.as_str().parse::<Environment>().unwrap(), env);
        }
        assert_eq!(" SandBox ".parse::<Environment>().unwrap(), Environment::Sandbox);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_default_environment_is_sandbox() {
        assert!(Environment::default().is_sandbox());
        assert!(!Environment::Production.is_sandbox());
    }

    #[test]
    fn test_secrets_hidden_from_debug() {
        let key = SessionKey::new("abc123");
        assert!(!format!("{:?}", key).contains("abc123"));

        let request = LoginRequest::new("bank", "user", "hunter2");
        let debug = format!("{:?}", request);
        assert!(debug.contains("bank"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_sandbox_demo_credentials() {
        let request = LoginRequest::sandbox_demo();
        assert_eq!(request.provider, "test");
        assert_eq!(request.username, "12345");
        assert_eq!(request.password, "gfdsa");
    }
}
