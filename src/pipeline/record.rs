use crate::error::{CrawlerError, ErrorKind};
use serde::Serialize;
use serde_json::{json, Value};
use std::{fmt, time::Duration};

/// Failure recorded in a result slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    pub code: &'static str,
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl From<&CrawlerError> for RecordError {
    fn from(err: &CrawlerError) -> Self {
        Self {
            code: err.error_code(),
            kind: err.kind(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<CrawlerError> for RecordError {
    fn from(err: CrawlerError) -> Self {
        Self::from(&err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The payload validated. `empty_fields` lists required fields the
    /// capability left empty.
    Extracted { value: T, empty_fields: Vec<String> },
    Failed { error: RecordError },
    /// Not attempted because an earlier target failed under fail-fast.
    Skipped,
}

/// One result slot; slot `index` always belongs to input URL `index`
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRecord<T> {
    pub index: usize,
    pub url: String,
    pub elapsed: Duration,
    pub outcome: Outcome<T>,
}

impl<T> ExtractionRecord<T> {
    pub fn status(&self) -> &'static str {
        match &self.outcome {
            Outcome::Extracted { empty_fields, .. } if !empty_fields.is_empty() => "partial",
            Outcome::Extracted { .. } => "extracted",
            Outcome::Failed { .. } => "failed",
            Outcome::Skipped => "skipped",
        }
    }

    pub fn value(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Extracted { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&RecordError> {
        match &self.outcome {
            Outcome::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn empty_fields(&self) -> &[String] {
        match &self.outcome {
            Outcome::Extracted { empty_fields, .. } => empty_fields,
            _ => &[],
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self.outcome, Outcome::Extracted { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

impl<T: Serialize> ExtractionRecord<T> {
    /// Machine-readable form; the payload sits under `value_key`.
    pub fn to_json(&self, value_key: &str) -> Value {
        let mut record = json!({
            "index": self.index,
            "url": self.url,
            "status": self.status(),
            "elapsed_ms": self.elapsed.as_millis() as u64,
        });

        match &self.outcome {
            Outcome::Extracted {
                value,
                empty_fields,
            } => {
                record[value_key] = serde_json::to_value(value).unwrap_or_else(|err| {
                    json!({ "serialization_error": err.to_string() })
                });
                record["empty_fields"] = json!(empty_fields);
            }
            Outcome::Failed { error } => {
                record["error"] = json!(error);
            }
            Outcome::Skipped => {}
        }

        record
    }
}

/// Counts over one run's records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    /// Extracted records, partial ones included
    pub extracted: usize,
    pub partial: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn from_records<T>(records: &[ExtractionRecord<T>]) -> Self {
        records.iter().fold(
            Self {
                total: records.len(),
                ..Self::default()
            },
            |mut summary, record| {
                match &record.outcome {
                    Outcome::Extracted { empty_fields, .. } => {
                        summary.extracted += 1;
                        if !empty_fields.is_empty() {
                            summary.partial += 1;
                        }
                    }
                    Outcome::Failed { .. } => summary.failed += 1,
                    Outcome::Skipped => summary.skipped += 1,
                }
                summary
            },
        )
    }

    /// True when every target produced a payload.
    pub fn is_complete(&self) -> bool {
        self.extracted == self.total
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} targets: {} extracted ({} partial), {} failed, {} skipped",
            self.total, self.extracted, self.partial, self.failed, self.skipped
        )
    }
}
