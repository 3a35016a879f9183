//! Renders discoveries for people and for other tools.
//!
//! `text` prints one logical path per line. `csv` and `jsonl` print one
//! [`ReportRecord`] per discovery, stamped with the local time it was
//! written.
use crate::error::ReportError;
use crate::scanner::progress::Discovery;
use chrono::{Local, SecondsFormat};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Csv,
    JsonLines,
}

impl ReportFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Csv => "csv",
            Self::JsonLines => "jsonl",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "csv" => Ok(Self::Csv),
            "jsonl" | "json-lines" | "ndjson" => Ok(Self::JsonLines),
            other => Err(format!("unknown report format '{other}' (expected text, csv or jsonl)")),
        }
    }
}

/// One output row.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRecord {
    pub logical_path: String,
    pub root: String,
    /// Number of archives the file sits inside.
    pub container_depth: usize,
    /// `true` when the file exists on disk as-is (not inside an archive).
    pub on_disk: bool,
    /// RFC 3339, local time.
    pub discovered_at: String,
}

impl ReportRecord {
    pub fn from_discovery(discovery: &Discovery) -> Self {
        Self {
            logical_path: discovery.logical_path.to_string(),
            root: discovery.root.display().to_string(),
            container_depth: discovery.logical_path.container_depth(),
            on_disk: discovery.physical_path.is_some(),
            discovered_at: Local::now().to_rfc3339_opts(SecondsFormat::Millis, false),
        }
    }
}

enum Output<W: Write> {
    Text(W),
    Csv(csv::Writer<W>),
    JsonLines(W),
}

/// Streams discoveries to `W` in the chosen format.
pub struct ReportWriter<W: Write> {
    output: Output<W>,
    written: u64,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(format: ReportFormat, writer: W) -> Self {
        let output = match format {
            ReportFormat::Text => Output::Text(writer),
            ReportFormat::Csv => Output::Csv(csv::WriterBuilder::new().from_writer(writer)),
            ReportFormat::JsonLines => Output::JsonLines(writer),
        };
        Self { output, written: 0 }
    }

    pub fn write(&mut self, discovery: &Discovery) -> Result<(), ReportError> {
        match &mut self.output {
            Output::Text(w) => writeln!(w, "{}", discovery.logical_path)?,
            Output::Csv(w) => w.serialize(ReportRecord::from_discovery(discovery))?,
            Output::JsonLines(w) => {
                serde_json::to_writer(&mut *w, &ReportRecord::from_discovery(discovery))?;
                w.write_all(b"\n")?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Records written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W, ReportError> {
        match self.output {
            Output::Text(mut w) | Output::JsonLines(mut w) => {
                w.flush()?;
                Ok(w)
            }
            Output::Csv(w) => {
                let mut w = w.into_inner().map_err(|e| ReportError::Io(e.into_error()))?;
                w.flush()?;
                Ok(w)
            }
        }
    }
}
