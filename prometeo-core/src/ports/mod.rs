//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The client and
//! the CLI depend only on these traits, not on concrete implementations.

mod banking_api;

pub use banking_api::{ApiTarget, BankingApi, LoginReply};
