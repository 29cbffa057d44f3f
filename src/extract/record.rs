//! Domain records produced by extraction.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which kind of record a schema produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A job posting.
    Job,
    /// A company page.
    Company,
    /// A member profile.
    Profile,
}

impl RecordKind {
    /// Stable lower-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::Company => "company",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "job" => Ok(Self::Job),
            "company" => Ok(Self::Company),
            "profile" => Ok(Self::Profile),
            other => Err(format!("unknown record kind '{other}'")),
        }
    }
}

/// A job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub experience: String,
    pub job_type: String,
    pub posted_by: String,
    pub url: Option<String>,
}

/// A company page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub name: String,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub headquarters: Option<String>,
    pub founded: Option<String>,
    pub website: Option<String>,
    pub about: Option<String>,
    pub url: Option<String>,
}

/// A member profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub name: String,
    pub headline: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
    pub url: Option<String>,
}

/// Any extracted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Job(JobRecord),
    Company(CompanyRecord),
    Profile(ProfileRecord),
}

/// Field values keyed by schema field name.
pub type FieldValues = BTreeMap<&'static str, String>;

impl Record {
    /// The record's kind.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Job(_) => RecordKind::Job,
            Self::Company(_) => RecordKind::Company,
            Self::Profile(_) => RecordKind::Profile,
        }
    }

    /// Assembles a record of `kind` from extracted field values.
    ///
    /// Missing required text fields become empty strings; schemas give every
    /// required field a placeholder, so that only happens for hand-built input.
    #[must_use]
    pub fn from_fields(kind: RecordKind, mut fields: FieldValues, url: Option<String>) -> Self {
        let mut take = |name: &str| fields.remove(name);
        match kind {
            RecordKind::Job => Self::Job(JobRecord {
                title: take("title").unwrap_or_default(),
                company: take("company").unwrap_or_default(),
                location: take("location").unwrap_or_default(),
                experience: take("experience").unwrap_or_default(),
                job_type: take("job_type").unwrap_or_default(),
                posted_by: take("posted_by").unwrap_or_default(),
                url,
            }),
            RecordKind::Company => Self::Company(CompanyRecord {
                name: take("name").unwrap_or_default(),
                industry: take("industry"),
                size: take("size"),
                headquarters: take("headquarters"),
                founded: take("founded"),
                website: take("website"),
                about: take("about"),
                url,
            }),
            RecordKind::Profile => Self::Profile(ProfileRecord {
                name: take("name").unwrap_or_default(),
                headline: take("headline"),
                location: take("location"),
                experience: take("experience"),
                url,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kind_round_trips_through_str() {
        for kind in [RecordKind::Job, RecordKind::Company, RecordKind::Profile] {
            assert_eq!(kind.as_str().parse::<RecordKind>().unwrap(), kind);
        }
        assert!("user".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_from_fields_builds_job() {
        let mut fields = FieldValues::new();
        fields.insert("title", "Rust Engineer".to_string());
        fields.insert("company", "Ferrous".to_string());
        fields.insert("location", "Berlin, Germany".to_string());

        let record = Record::from_fields(RecordKind::Job, fields, Some("https://x.test/jobs/view/1".into()));
        let Record::Job(job) = record else {
            panic!("expected a job record");
        };
        assert_eq!(job.title, "Rust Engineer");
        assert_eq!(job.location, "Berlin, Germany");
        assert!(job.experience.is_empty());
        assert_eq!(job.url.as_deref(), Some("https://x.test/jobs/view/1"));
    }

    #[test]
    fn test_from_fields_optional_company_fields() {
        let mut fields = FieldValues::new();
        fields.insert("name", "Ferrous".to_string());
        fields.insert("founded", "2019".to_string());

        let record = Record::from_fields(RecordKind::Company, fields, None);
        assert_eq!(record.kind(), RecordKind::Company);
        let Record::Company(company) = record else {
            panic!("expected a company record");
        };
        assert_eq!(company.founded.as_deref(), Some("2019"));
        assert!(company.industry.is_none());
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let record = Record::Profile(ProfileRecord {
            name: "Ada".into(),
            headline: None,
            location: None,
            experience: None,
            url: None,
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "profile");
        assert_eq!(json["name"], "Ada");
    }
}
