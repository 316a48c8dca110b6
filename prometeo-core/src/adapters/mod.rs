//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Prometeo HTTP client for the BankingApi port
//! - Demo (offline) backend for demo mode and tests

pub mod demo;
pub mod prometeo;

#[cfg(test)]
pub mod prometeo_mock;
