pub mod airtable;

pub use airtable::{AirtableStore, Columns};
