//! HTML message body for a batch of listings.

use bigdecimal::{BigDecimal, RoundingMode, Zero};

use crate::models::Listing;

const HEADER: &str = "<b>New Upwork Jobs:</b>\n\n";

/// Telegram-flavoured HTML listing the given jobs.
///
/// Every listing becomes a linked title, its budget (`N/A` when zero) and a
/// description preview cut at `preview_length` characters.
pub fn format_listings(listings: &[Listing], preview_length: usize) -> String {
    let mut message = String::from(HEADER);

    for listing in listings {
        message.push_str(&format!(
            "• <a href='{}'>{}</a> | <b>{}</b>\n{}\n\n",
            escape_html(&listing.url),
            escape_html(&listing.title),
            format_budget(&listing.budget),
            escape_html(&preview(&listing.description, preview_length)),
        ));
    }

    message
}

fn format_budget(budget: &BigDecimal) -> String {
    if budget.is_zero() {
        "N/A".to_string()
    } else {
        format!("${}", budget.with_scale_round(2, RoundingMode::HalfUp))
    }
}

fn preview(text: &str, limit: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Escapes the characters Telegram's HTML parse mode treats as markup,
/// including quotes since titles and urls land in attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
