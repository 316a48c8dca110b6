//! Bank account and credit card domain models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A bank account owned by the logged-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: String,
    pub name: String,
    pub number: String,
    pub branch: Option<String>,
    /// ISO 4217 currency code
    pub currency: String,
    pub balance: Decimal,
}

/// A credit card owned by the logged-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCard {
    pub id: String,
    pub name: String,
    pub number: String,
    pub close_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    /// Balance in the card's local currency
    pub balance_local: Decimal,
    /// Balance in US dollars
    pub balance_dollar: Decimal,
}
