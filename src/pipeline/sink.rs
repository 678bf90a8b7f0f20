use super::record::{ExtractionRecord, Outcome, RunSummary};
use crate::error::Result;
use serde::Serialize;
use std::{
    fmt::Display,
    io::{self, Write},
};

/// Destination for result records, written in slot order.
pub trait ResultSink<T> {
    fn write_record(&mut self, record: &ExtractionRecord<T>) -> Result<()>;

    /// Called once after the last record.
    fn finish(&mut self, _summary: &RunSummary) -> Result<()> {
        Ok(())
    }
}

/// Write every record, then finish the sink with the run summary.
pub fn write_all<T, S>(sink: &mut S, records: &[ExtractionRecord<T>]) -> Result<RunSummary>
where
    S: ResultSink<T> + ?Sized,
{
    for record in records {
        sink.write_record(record)?;
    }
    let summary = RunSummary::from_records(records);
    sink.finish(&summary)?;
    Ok(summary)
}

/// Human-readable output, one block per record
#[derive(Debug)]
pub struct PrettySink<W> {
    writer: W,
}

impl<W: Write> PrettySink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<T: Display, W: Write> ResultSink<T> for PrettySink<W> {
    fn write_record(&mut self, record: &ExtractionRecord<T>) -> Result<()> {
        let header = format!(
            "[{}] {} ({:.1}s)",
            record.index + 1,
            record.url,
            record.elapsed.as_secs_f64()
        );

        match &record.outcome {
            Outcome::Extracted {
                value,
                empty_fields,
            } => {
                writeln!(self.writer, "{header}")?;
                writeln!(self.writer, "{value}")?;
                if !empty_fields.is_empty() {
                    writeln!(
                        self.writer,
                        "! partial extraction, empty fields: {}",
                        empty_fields.join(", ")
                    )?;
                }
            }
            Outcome::Failed { error } => {
                writeln!(self.writer, "{header} FAILED [{}]", error.code)?;
                writeln!(self.writer, "  {}", error.message)?;
            }
            Outcome::Skipped => {
                writeln!(self.writer, "{header} SKIPPED after earlier failure")?;
            }
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self, _summary: &RunSummary) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One JSON object per line
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
    value_key: String,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            value_key: "investor".to_string(),
        }
    }

    /// Key the extracted payload is written under (default `investor`).
    pub fn with_value_key(mut self, value_key: impl Into<String>) -> Self {
        self.value_key = value_key.into();
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<T: Serialize, W: Write> ResultSink<T> for JsonLinesSink<W> {
    fn write_record(&mut self, record: &ExtractionRecord<T>) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &record.to_json(&self.value_key))
            .map_err(io::Error::from)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self, _summary: &RunSummary) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
