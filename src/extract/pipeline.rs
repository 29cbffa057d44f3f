//! Runs a [`RecordSchema`] against a loaded page.

use serde::Serialize;
use tracing::debug;

use super::{FieldValues, Record, RecordSchema, Strategy};
use crate::browser::{BrowserError, BrowserHandle};

/// Result of trying one field's strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMatch {
    /// A strategy produced an accepted text.
    Matched {
        /// Trimmed text.
        value: String,
        /// Index of the winning strategy.
        strategy_index: usize,
    },
    /// No strategy produced an accepted text.
    NoMatch,
}

/// How a record's values were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    /// At least one field came from the page.
    Extracted {
        /// Number of fields matched by a strategy.
        matched_fields: usize,
    },
    /// Every value is a placeholder.
    Placeholder,
}

/// A record together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extracted {
    pub record: Record,
    pub provenance: Provenance,
}

impl Extracted {
    /// Whether the record is made only of placeholder values.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self.provenance, Provenance::Placeholder)
    }

    /// Builds an all-placeholder record of the schema's kind.
    #[must_use]
    pub fn placeholder(schema: &RecordSchema, source_url: Option<String>) -> Self {
        let values = schema
            .fields
            .iter()
            .filter_map(|field| field.placeholder.map(|p| (field.name, p.to_string())))
            .collect();
        Self {
            record: Record::from_fields(schema.kind, values, source_url),
            provenance: Provenance::Placeholder,
        }
    }
}

/// Tries `strategies` in order and returns the first accepted text.
///
/// A strategy whose selector matches nothing, or matches only texts its
/// validator rejects, falls through to the next one.
///
/// # Errors
///
/// Any browser error other than a selector miss, such as a closed handle or
/// an unparseable selector.
pub async fn extract_field(
    handle: &mut dyn BrowserHandle,
    strategies: &[Strategy],
) -> Result<FieldMatch, BrowserError> {
    for (index, strategy) in strategies.iter().enumerate() {
        let texts = match handle.select_texts(strategy.selector).await {
            Ok(texts) => texts,
            Err(e) if e.is_selector_miss() => continue,
            Err(e) => return Err(e),
        };

        if let Some(text) = texts.iter().find(|t| strategy.validator.accepts(t)) {
            return Ok(FieldMatch::Matched {
                value: text.trim().to_string(),
                strategy_index: index,
            });
        }
    }
    Ok(FieldMatch::NoMatch)
}

/// Extracts one record from the page currently loaded in `handle`.
///
/// Unmatched fields take their placeholder, or stay absent if they have
/// none. A record with no matched field at all is reported as
/// [`Provenance::Placeholder`].
///
/// # Errors
///
/// Propagates non-miss browser errors from [`extract_field`].
pub async fn extract_record(
    handle: &mut dyn BrowserHandle,
    schema: &RecordSchema,
    source_url: Option<String>,
) -> Result<Extracted, BrowserError> {
    let mut values = FieldValues::new();
    let mut matched_fields = 0;

    for field in &schema.fields {
        match extract_field(handle, &field.strategies).await? {
            FieldMatch::Matched {
                value,
                strategy_index,
            } => {
                debug!(field = field.name, strategy_index, "field matched");
                matched_fields += 1;
                values.insert(field.name, value);
            }
            FieldMatch::NoMatch => {
                debug!(field = field.name, "field fell back");
                if let Some(placeholder) = field.placeholder {
                    values.insert(field.name, placeholder.to_string());
                }
            }
        }
    }

    let provenance = if matched_fields == 0 {
        Provenance::Placeholder
    } else {
        Provenance::Extracted { matched_fields }
    };

    Ok(Extracted {
        record: Record::from_fields(schema.kind, values, source_url),
        provenance,
    })
}
