use super::{
    capability::ExtractionCapability,
    record::{ExtractionRecord, Outcome, RecordError},
    task::TaskTemplate,
};
use crate::{
    error::{CrawlerError, Result},
    schema::{deserialize_payload, empty_required_fields, validate_payload, CompletionSchema, SchemaHandle},
};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};
use tracing::{info, warn};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(300);

/// What the driver does after a target fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record the failure in its slot and move on.
    #[default]
    Continue,
    /// Stop invoking the capability; later targets are recorded as skipped.
    FailFast,
}

/// Runs one extraction per target URL and collects index-ordered records.
#[derive(Debug)]
pub struct TaskDriver<C> {
    capability: C,
    template: TaskTemplate,
    call_timeout: Duration,
    concurrency: usize,
    policy: FailurePolicy,
}

impl<C: ExtractionCapability> TaskDriver<C> {
    pub fn new(capability: C) -> Self {
        Self {
            capability,
            template: TaskTemplate::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            concurrency: 1,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_template(mut self, template: TaskTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Bound on in-flight extraction calls; 1 runs targets strictly in sequence.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn capability(&self) -> &C {
        &self.capability
    }

    /// Extract a `T` from every URL. Returns exactly one record per URL, in
    /// input order, whatever order the calls complete in.
    pub async fn run<T: CompletionSchema>(&self, urls: &[String]) -> Vec<ExtractionRecord<T>> {
        let schema = T::schema();
        let aborted = AtomicBool::new(false);

        info!(
            targets = urls.len(),
            concurrency = self.concurrency,
            policy = ?self.policy,
            schema = schema.schema_name(),
            "starting extraction run"
        );

        stream::iter(urls.iter().enumerate())
            .map(|(index, url)| {
                let aborted = &aborted;
                async move {
                    if aborted.load(Ordering::SeqCst) {
                        info!(url = %url, index, "skipped after earlier failure");
                        return ExtractionRecord {
                            index,
                            url: url.clone(),
                            elapsed: Duration::ZERO,
                            outcome: Outcome::Skipped,
                        };
                    }

                    let record = self.extract_one::<T>(index, url, schema).await;
                    if record.is_failed() && self.policy == FailurePolicy::FailFast {
                        aborted.store(true, Ordering::SeqCst);
                    }
                    record
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn extract_one<T: CompletionSchema>(
        &self,
        index: usize,
        url: &str,
        schema: &SchemaHandle,
    ) -> ExtractionRecord<T> {
        let instruction = self.template.render(url);
        let started = Instant::now();

        let result =
            match tokio::time::timeout(self.call_timeout, self.capability.extract(&instruction, schema)).await {
                Ok(result) => result.and_then(|payload| accept::<T>(payload, schema)),
                Err(_) => Err(CrawlerError::Timeout(format!(
                    "extraction did not finish within {}s",
                    self.call_timeout.as_secs_f64()
                ))),
            };

        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;

        let outcome = match result {
            Ok((value, empty_fields)) => {
                if empty_fields.is_empty() {
                    info!(url = %url, index, elapsed_ms, "extracted");
                } else {
                    warn!(
                        url = %url,
                        index,
                        elapsed_ms,
                        empty_fields = ?empty_fields,
                        "partial extraction"
                    );
                }
                Outcome::Extracted {
                    value,
                    empty_fields,
                }
            }
            Err(err) => {
                warn!(
                    url = %url,
                    index,
                    elapsed_ms,
                    error_code = err.error_code(),
                    error = %err,
                    "extraction failed"
                );
                Outcome::Failed {
                    error: RecordError::from(&err),
                }
            }
        };

        ExtractionRecord {
            index,
            url: url.to_string(),
            elapsed,
            outcome,
        }
    }
}

/// Check the returned payload's shape and decode it. The values themselves
/// are taken on trust.
fn accept<T: CompletionSchema>(payload: Value, schema: &SchemaHandle) -> Result<(T, Vec<String>)> {
    validate_payload(schema, &payload)?;
    let empty_fields = empty_required_fields(schema, &payload);
    let value = deserialize_payload::<T>(payload, schema)?;
    Ok((value, empty_fields))
}
