use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's saved search. Read-only to the pipeline.
///
/// Empty `keywords` or `categories` place no constraint on that axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub user_id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub min_price: Option<BigDecimal>,
    #[serde(default)]
    pub max_price: Option<BigDecimal>,
}

/// An entitled user with a delivery destination and at least one filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub user_id: Uuid,
    /// Channel-specific address, a Telegram chat id for the Telegram notifier
    pub destination: String,
    pub filters: Vec<Filter>,
}
