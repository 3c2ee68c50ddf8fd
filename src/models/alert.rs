use diesel::prelude::*;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of an alert: one per (user, listing) for the lifetime of the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlertKey {
    pub user_id: Uuid,
    pub listing_id: String,
}

impl AlertKey {
    pub fn new(user_id: Uuid, listing_id: impl Into<String>) -> Self {
        Self {
            user_id,
            listing_id: listing_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Selectable)]
#[diesel(table_name = crate::schema::alert_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AlertRecord {
    pub id: i64,
    pub user_id: Uuid,
    pub listing_id: String,
    #[diesel(serialize_as = jiff_diesel::Timestamp, deserialize_as = jiff_diesel::Timestamp)]
    pub sent_at: Timestamp,
    /// False when the record was written after a failed delivery attempt
    pub delivered: bool,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = crate::schema::alert_records)]
pub struct NewAlertRecord {
    pub user_id: Uuid,
    pub listing_id: String,
    #[diesel(serialize_as = jiff_diesel::Timestamp, deserialize_as = jiff_diesel::Timestamp)]
    pub sent_at: Timestamp,
    pub delivered: bool,
}

impl NewAlertRecord {
    pub fn key(&self) -> AlertKey {
        AlertKey::new(self.user_id, self.listing_id.clone())
    }
}
