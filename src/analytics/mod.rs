pub mod airtable;

pub use airtable::{AirtableLogger, AnalyticsEvent};
