//! Extraction pipeline: turns a loaded page into typed records.
//!
//! Each record kind has a [`RecordSchema`] listing its fields. Every field
//! carries CSS selector [`Strategy`] values in preference order, each guarded
//! by a [`Validator`]. [`extract_record`] walks the schema against a
//! [`BrowserHandle`](crate::browser::BrowserHandle) and fills unmatched
//! fields from placeholders, tagging the result with its [`Provenance`].

mod pipeline;
mod record;
mod schema;

pub use pipeline::{Extracted, FieldMatch, Provenance, extract_field, extract_record};
pub use record::{CompanyRecord, FieldValues, JobRecord, ProfileRecord, Record, RecordKind};
pub use schema::{FieldSpec, RecordSchema, Strategy, Validator};
