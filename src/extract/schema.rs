//! Declarative record schemas: ordered selector strategies per field.
//!
//! A [`FieldSpec`] lists [`Strategy`] values in preference order. Each
//! strategy is a CSS selector plus a [`Validator`] that decides whether a
//! candidate text is plausible for the field. The first strategy that yields
//! an accepted text wins; a field nothing matches falls back to its
//! placeholder, or stays empty if it has none.

use super::RecordKind;

/// Decides whether a candidate text is acceptable for a field.
#[derive(Debug, Clone, Copy)]
pub enum Validator {
    /// Any non-blank text.
    NonEmpty,
    /// Character count within `[min_len, max_len]`.
    Plausible {
        /// Minimum characters.
        min_len: usize,
        /// Maximum characters.
        max_len: usize,
    },
    /// Contains at least one needle, compared case-insensitively.
    Contains(&'static [&'static str]),
    /// Arbitrary predicate.
    Custom(fn(&str) -> bool),
}

impl Validator {
    /// Applies the validator to trimmed `text`. Blank text never passes.
    #[must_use]
    pub fn accepts(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        match self {
            Self::NonEmpty => true,
            Self::Plausible { min_len, max_len } => {
                let len = text.chars().count();
                (*min_len..=*max_len).contains(&len)
            }
            Self::Contains(needles) => {
                let lowered = text.to_lowercase();
                needles
                    .iter()
                    .any(|needle| lowered.contains(&needle.to_lowercase()))
            }
            Self::Custom(predicate) => predicate(text),
        }
    }
}

/// One way of locating a field.
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    /// CSS selector.
    pub selector: &'static str,
    /// Acceptance test for the selector's texts.
    pub validator: Validator,
}

impl Strategy {
    /// Creates a strategy.
    #[must_use]
    pub const fn new(selector: &'static str, validator: Validator) -> Self {
        Self { selector, validator }
    }
}

/// One field of a record schema.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name, as [`Record::from_fields`](super::Record::from_fields) expects it.
    pub name: &'static str,
    /// Strategies in preference order.
    pub strategies: Vec<Strategy>,
    /// Value used when no strategy matches.
    pub placeholder: Option<&'static str>,
}

impl FieldSpec {
    /// A field with no placeholder.
    #[must_use]
    pub fn optional(name: &'static str, strategies: Vec<Strategy>) -> Self {
        Self {
            name,
            strategies,
            placeholder: None,
        }
    }

    /// A field that falls back to `placeholder`.
    #[must_use]
    pub fn with_placeholder(
        name: &'static str,
        strategies: Vec<Strategy>,
        placeholder: &'static str,
    ) -> Self {
        Self {
            name,
            strategies,
            placeholder: Some(placeholder),
        }
    }
}

/// Fields that make up one record kind.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    /// Kind of record produced.
    pub kind: RecordKind,
    /// Fields in extraction order.
    pub fields: Vec<FieldSpec>,
}

const PLAUSIBLE_TITLE: Validator = Validator::Plausible {
    min_len: 5,
    max_len: 100,
};
const PLAUSIBLE_NAME: Validator = Validator::Plausible {
    min_len: 2,
    max_len: 100,
};
const SHORT_TEXT: Validator = Validator::Plausible {
    min_len: 2,
    max_len: 200,
};

fn looks_like_place(text: &str) -> bool {
    let lowered = text.to_lowercase();
    text.contains(',') || lowered.contains("remote")
}

fn looks_like_year(text: &str) -> bool {
    text.len() == 4 && text.chars().all(|c| c.is_ascii_digit())
}

impl RecordSchema {
    /// Job posting detail page.
    #[must_use]
    pub fn job() -> Self {
        use Validator::{Contains, Custom};

        Self {
            kind: RecordKind::Job,
            fields: vec![
                FieldSpec::with_placeholder(
                    "title",
                    vec![
                        Strategy::new(".jobs-unified-top-card__job-title", PLAUSIBLE_TITLE),
                        Strategy::new(".job-details-jobs-unified-top-card__job-title", PLAUSIBLE_TITLE),
                        Strategy::new("h1, h2, h3", PLAUSIBLE_TITLE),
                        Strategy::new(".artdeco-entity-lockup__title", PLAUSIBLE_TITLE),
                    ],
                    "Exciting Career Opportunity",
                ),
                FieldSpec::with_placeholder(
                    "company",
                    vec![
                        Strategy::new(".jobs-unified-top-card__company-name", PLAUSIBLE_NAME),
                        Strategy::new(".jobs-details-top-card__company-url", PLAUSIBLE_NAME),
                        Strategy::new(".job-details-jobs-unified-top-card__primary-description a", PLAUSIBLE_NAME),
                        Strategy::new(".artdeco-entity-lockup__subtitle", PLAUSIBLE_NAME),
                        Strategy::new("a[data-control-name='company_link']", PLAUSIBLE_NAME),
                    ],
                    "Leading Company",
                ),
                FieldSpec::with_placeholder(
                    "location",
                    vec![
                        Strategy::new(".jobs-unified-top-card__bullet", Custom(looks_like_place)),
                        Strategy::new(".jobs-unified-top-card__workplace-type", Custom(looks_like_place)),
                        Strategy::new(
                            ".jobs-unified-top-card__subtitle-primary-grouping span",
                            Custom(looks_like_place),
                        ),
                    ],
                    "Flexible Location",
                ),
                FieldSpec::with_placeholder(
                    "experience",
                    vec![Strategy::new(
                        ".jobs-unified-top-card__job-insight span",
                        Contains(&["level", "experience", "senior", "entry", "associate"]),
                    )],
                    "Great opportunity for all levels",
                ),
                FieldSpec::with_placeholder(
                    "job_type",
                    vec![Strategy::new(
                        ".jobs-unified-top-card__job-insight span",
                        Contains(&["full-time", "part-time", "contract", "internship", "temporary"]),
                    )],
                    "Full-time",
                ),
                FieldSpec::with_placeholder(
                    "posted_by",
                    vec![
                        Strategy::new(".jobs-poster__name", PLAUSIBLE_NAME),
                        Strategy::new(".hirer-card__hirer-information strong", PLAUSIBLE_NAME),
                    ],
                    "LinkedIn",
                ),
            ],
        }
    }

    /// Company about page.
    #[must_use]
    pub fn company() -> Self {
        use Validator::{Contains, Custom};

        Self {
            kind: RecordKind::Company,
            fields: vec![
                FieldSpec::with_placeholder(
                    "name",
                    vec![
                        Strategy::new(".org-top-card-summary__title", PLAUSIBLE_NAME),
                        Strategy::new("h1", PLAUSIBLE_NAME),
                    ],
                    "Leading Company",
                ),
                FieldSpec::optional(
                    "industry",
                    vec![
                        Strategy::new(".org-top-card-summary-info-list__info-item", SHORT_TEXT),
                        Strategy::new(".org-page-details__definition-text", SHORT_TEXT),
                    ],
                ),
                FieldSpec::optional(
                    "size",
                    vec![Strategy::new(
                        ".org-about-company-module__company-size-definition-text, dd",
                        Contains(&["employees"]),
                    )],
                ),
                FieldSpec::optional(
                    "headquarters",
                    vec![Strategy::new(
                        ".org-about-company-module__headquarters, dd",
                        Custom(looks_like_place),
                    )],
                ),
                FieldSpec::optional(
                    "founded",
                    vec![Strategy::new(
                        ".org-about-company-module__founded, dd",
                        Custom(looks_like_year),
                    )],
                ),
                FieldSpec::optional(
                    "website",
                    vec![Strategy::new(
                        ".org-about-us-company-module__website, dd a",
                        Contains(&["http", "www."]),
                    )],
                ),
                FieldSpec::optional(
                    "about",
                    vec![
                        Strategy::new(".org-about-us-organization-description__text", Validator::NonEmpty),
                        Strategy::new("section.about p", Validator::NonEmpty),
                    ],
                ),
            ],
        }
    }

    /// Member profile page.
    #[must_use]
    pub fn profile() -> Self {
        Self {
            kind: RecordKind::Profile,
            fields: vec![
                FieldSpec::with_placeholder(
                    "name",
                    vec![
                        Strategy::new("h1.text-heading-xlarge", PLAUSIBLE_NAME),
                        Strategy::new(".pv-top-card--list li", PLAUSIBLE_NAME),
                        Strategy::new("h1", PLAUSIBLE_NAME),
                    ],
                    "LinkedIn Member",
                ),
                FieldSpec::optional(
                    "headline",
                    vec![Strategy::new(".text-body-medium.break-words", SHORT_TEXT)],
                ),
                FieldSpec::optional(
                    "location",
                    vec![
                        Strategy::new(".pv-text-details__left-panel .text-body-small", SHORT_TEXT),
                        Strategy::new("span.text-body-small.inline", SHORT_TEXT),
                    ],
                ),
                FieldSpec::optional(
                    "experience",
                    vec![
                        Strategy::new(".experience__list", Validator::NonEmpty),
                        Strategy::new("#experience ~ .pvs-list__outer-container", Validator::NonEmpty),
                    ],
                ),
            ],
        }
    }

    /// The built-in schema for `kind`.
    #[must_use]
    pub fn for_kind(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Job => Self::job(),
            RecordKind::Company => Self::company(),
            RecordKind::Profile => Self::profile(),
        }
    }
}
