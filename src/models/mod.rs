mod alert;
mod filter;
mod listing;

pub use alert::{AlertKey, AlertRecord, NewAlertRecord};
pub use filter::{Filter, Subscriber};
pub use listing::{JobType, Listing, RawListing, UNCATEGORIZED};
