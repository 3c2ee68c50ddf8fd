//! Notification delivery.
//!
//! `Notifier` is the seam the alert coordinator talks to. Telegram is the
//! production channel; the log notifier formats the same message without
//! sending it.

mod log_provider;
mod message;
mod provider;
mod telegram_provider;

pub use log_provider::LogNotifier;
pub use message::{escape_html, format_listings};
pub use provider::{DeliveryResult, Notifier};
pub use telegram_provider::TelegramNotifier;

use std::sync::Arc;

use crate::config::{NotifierConfig, NotifierKind};
use crate::error::AppResult;

/// Builds the notifier selected by configuration.
pub fn build_notifier(config: &NotifierConfig) -> AppResult<Arc<dyn Notifier>> {
    Ok(match config.kind {
        NotifierKind::Telegram => Arc::new(TelegramNotifier::new(&config.telegram)?),
        NotifierKind::Log => Arc::new(LogNotifier::new(config.telegram.preview_length)),
    })
}
