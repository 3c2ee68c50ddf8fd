use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::Value;

use crate::models::RawListing;

#[derive(Debug, Default, Deserialize)]
pub(super) struct ApifyItem {
    pub title: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub description: Option<String>,
    pub category: Option<ApifyNamed>,
    pub skills: Option<Vec<ApifyNamed>>,
    pub fixed: Option<ApifyFixed>,
    pub hourly: Option<ApifyHourly>,
    pub buyer: Option<ApifyBuyer>,
    pub ts_publish: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ApifyNamed {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ApifyMoney {
    pub amount: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ApifyFixed {
    pub budget: Option<ApifyMoney>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ApifyHourly {
    pub max: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ApifyBuyer {
    pub location: Option<ApifyLocation>,
    pub stats: Option<ApifyStats>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ApifyLocation {
    pub country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApifyStats {
    pub total_charges: Option<ApifyMoney>,
    pub score: Option<Value>,
}

/// Numbers and numeric strings; anything else is treated as absent.
fn decimal(value: Option<&Value>) -> Option<BigDecimal> {
    match value? {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

impl From<ApifyItem> for RawListing {
    /// Fixed-price jobs carry `fixed.budget.amount`, hourly ones `hourly.max`.
    fn from(item: ApifyItem) -> Self {
        let is_fixed = item
            .job_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("fixed"));

        let budget = if is_fixed {
            decimal(
                item.fixed
                    .as_ref()
                    .and_then(|f| f.budget.as_ref())
                    .and_then(|b| b.amount.as_ref()),
            )
        } else {
            decimal(item.hourly.as_ref().and_then(|h| h.max.as_ref()))
        };

        let stats = item.buyer.as_ref().and_then(|b| b.stats.as_ref());

        RawListing {
            budget,
            client_location: item
                .buyer
                .as_ref()
                .and_then(|b| b.location.as_ref())
                .and_then(|l| l.country.clone()),
            client_spend: decimal(
                stats
                    .and_then(|s| s.total_charges.as_ref())
                    .and_then(|c| c.amount.as_ref()),
            ),
            client_rating: decimal(stats.and_then(|s| s.score.as_ref())),
            category: item.category.and_then(|c| c.name),
            skills: item
                .skills
                .map(|skills| skills.into_iter().filter_map(|s| s.name).collect()),
            title: item.title,
            url: item.url,
            job_type: item.job_type,
            description: item.description,
            published_at: item.ts_publish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_item_mapping() {
        let item: ApifyItem = serde_json::from_value(serde_json::json!({
            "title": "Logo for a bakery",
            "url": "https://www.upwork.com/jobs/Logo-for-bakery_~01abc",
            "type": "FIXED",
            "description": "Need branding",
            "category": {"name": "Design"},
            "skills": [{"name": "Illustrator"}, {"name": null}, {"name": "Branding"}],
            "fixed": {"budget": {"amount": 150.5}},
            "hourly": {"max": 99},
            "buyer": {
                "location": {"country": "Germany"},
                "stats": {"totalCharges": {"amount": "12000"}, "score": 4.9}
            },
            "ts_publish": "2025-03-01T11:58:00.000Z"
        }))
        .unwrap();

        let raw = RawListing::from(item);
        assert_eq!(raw.budget, Some(BigDecimal::from_str("150.5").unwrap()));
        assert_eq!(raw.category.as_deref(), Some("Design"));
        assert_eq!(raw.skills, Some(vec!["Illustrator".to_string(), "Branding".to_string()]));
        assert_eq!(raw.client_location.as_deref(), Some("Germany"));
        assert_eq!(raw.client_spend, Some(BigDecimal::from(12000)));
        assert_eq!(raw.client_rating, Some(BigDecimal::from_str("4.9").unwrap()));
        assert_eq!(raw.published_at.as_deref(), Some("2025-03-01T11:58:00.000Z"));
    }

    #[test]
    fn test_hourly_item_uses_hourly_max_and_tolerates_gaps() {
        let item: ApifyItem = serde_json::from_value(serde_json::json!({
            "title": "Rust backend",
            "url": "https://www.upwork.com/jobs/~02def",
            "type": "HOURLY",
            "hourly": {"max": 60},
            "buyer": null,
            "category": null
        }))
        .unwrap();

        let raw = RawListing::from(item);
        assert_eq!(raw.budget, Some(BigDecimal::from(60)));
        assert!(raw.category.is_none());
        assert!(raw.client_spend.is_none());
        assert!(raw.skills.is_none());
    }
}
