//! Prometeo Core - banking session and data access for the Prometeo API
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: Core entities (Provider, BankAccount, Movement, session types)
//! - **ports**: Trait definitions for external dependencies (BankingApi)
//! - **adapters**: Concrete implementations (Prometeo HTTP, offline demo)
//! - **client**: Session state machine shared by every CLI plugin
//! - **services**: Event logging
//! - **config**: settings.json and API key storage

pub mod adapters;
pub mod client;
pub mod config;
pub mod domain;
mod log_migrations;
pub mod ports;
pub mod services;

use anyhow::Result;

use adapters::demo::DemoBankingApi;
use adapters::prometeo::PrometeoApi;
use ports::BankingApi;

// Re-export commonly used types at crate root
pub use client::BankingClient;
pub use config::{ApiKeyStore, Config};
pub use domain::result::{Error, Result as CoreResult};
pub use domain::{
    BankAccount, CreditCard, DateRange, Environment, LoginOutcome, LoginRequest, Movement,
    Provider, ProviderDetail, SessionStatus,
};
pub use services::{LogEvent, LoggingService};

/// Build the backend selected by the configuration: the offline demo
/// backend in demo mode, the Prometeo HTTP API otherwise
pub fn backend_for(config: &Config) -> Result<Box<dyn BankingApi>> {
    if config.demo_mode {
        return Ok(Box::new(DemoBankingApi::new()));
    }
    Ok(Box::new(PrometeoApi::new()?))
}

/// Banking client for the configured environment and backend
pub fn open_client(config: &Config, api_key: impl Into<String>) -> Result<BankingClient> {
    let api = backend_for(config)?;
    Ok(BankingClient::new(api, api_key, config.environment))
}
