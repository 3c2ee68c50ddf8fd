//! Listing models: the raw record handed over by a source and the
//! normalised row persisted in `listings`.

use bigdecimal::BigDecimal;
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::io::Write;
use validator::Validate;

/// Category used when a source does not provide one
pub const UNCATEGORIZED: &str = "uncategorized";

/// Payment model of a listing
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Hourly,
    Fixed,
}

impl JobType {
    /// Sources send `FIXED`/`HOURLY` in any case; anything but fixed is hourly.
    pub fn from_source(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(ref v) if v == "fixed" => JobType::Fixed,
            _ => JobType::Hourly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Hourly => "hourly",
            JobType::Fixed => "fixed",
        }
    }
}

impl ToSql<Text, Pg> for JobType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<Text, Pg> for JobType {
    fn from_sql(bytes: <Pg as diesel::backend::Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "hourly" => Ok(JobType::Hourly),
            "fixed" => Ok(JobType::Fixed),
            _ => Err(format!("Unrecognized job_type: {}", s).into()),
        }
    }
}

/// Source-agnostic listing as fetched, before normalisation.
///
/// Every field is optional; the ingestor decides what is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub title: Option<String>,
    pub url: Option<String>,
    pub job_type: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub skills: Option<Vec<String>>,
    pub budget: Option<BigDecimal>,
    pub client_location: Option<String>,
    pub client_spend: Option<BigDecimal>,
    pub client_rating: Option<BigDecimal>,
    /// RFC 3339 publish time as reported by the source
    pub published_at: Option<String>,
}

/// A stored job posting. Immutable once inserted.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable, Validate,
)]
#[diesel(table_name = crate::schema::listings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Listing {
    #[validate(length(min = 1, message = "id cannot be derived from url"))]
    pub id: String,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(url(message = "url is not a valid URL"))]
    pub url: String,
    pub category: String,
    pub job_type: JobType,
    pub description: String,
    pub skills: Vec<String>,
    pub budget: BigDecimal,
    pub client_location: Option<String>,
    pub client_spend: Option<BigDecimal>,
    pub client_rating: Option<BigDecimal>,
    #[diesel(serialize_as = jiff_diesel::Timestamp, deserialize_as = jiff_diesel::Timestamp)]
    pub published_at: Timestamp,
    #[diesel(serialize_as = jiff_diesel::Timestamp, deserialize_as = jiff_diesel::Timestamp)]
    pub ingested_at: Timestamp,
}

impl Listing {
    /// Lowercased `title + ' ' + description`, the text keywords are searched in.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.description).to_lowercase()
    }
}
