//! Core domain entities
//!
//! Pure data structures describing what the Prometeo API hands back, plus
//! the session state the client tracks. No I/O happens here.

mod account;
mod movement;
mod provider;
pub mod result;
mod session;

pub use account::{BankAccount, CreditCard};
pub use movement::{
    format_date, parse_date, DateRange, Movement, MovementQuery, DATE_FORMAT,
    DEFAULT_DAY_INTERVAL, MIN_WARNING_INTERVAL,
};
pub use provider::{search_providers, AuthField, Provider, ProviderDetail};
pub use session::{Environment, LoginOutcome, LoginRequest, SessionKey, SessionStatus};
