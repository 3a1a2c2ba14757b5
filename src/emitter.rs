use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

use crate::config::CampaignHeader;
use crate::record::{CompanySummary, Record};

/// Destination for the campaign header and extracted records
pub trait RecordSink {
    fn header(&mut self, header: &CampaignHeader) -> Result<()>;

    fn record(&mut self, record: &Record) -> Result<()>;

    /// Called once after every walk has finished
    fn finish(&mut self) -> Result<()>;
}

#[derive(Serialize)]
struct Line<'a, T: Serialize> {
    table: &'static str,
    #[serde(flatten)]
    body: &'a T,
}

/// One JSON object per line, flushed as soon as it is written
pub struct StreamEmitter<W: Write> {
    out: W,
    lines: usize,
}

impl<W: Write> StreamEmitter<W> {
    pub fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    pub fn lines_written(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line<T: Serialize>(&mut self, table: &'static str, body: &T) -> Result<()> {
        serde_json::to_writer(&mut self.out, &Line { table, body })
            .context("Failed to serialize output line")?;
        self.out.write_all(b"\n").context("Failed to write output")?;
        self.out.flush().context("Failed to flush output")?;
        self.lines += 1;
        Ok(())
    }
}

impl<W: Write> RecordSink for StreamEmitter<W> {
    fn header(&mut self, header: &CampaignHeader) -> Result<()> {
        self.write_line("campaign", header)
    }

    fn record(&mut self, record: &Record) -> Result<()> {
        self.write_line("rating", record)
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush().context("Failed to flush output")
    }
}

#[derive(Serialize)]
struct Aggregate<'a> {
    campaign: Option<&'a CampaignHeader>,
    companies: &'a [CompanySummary],
}

/// Collects every record and writes a single object when finished.
///
/// Nothing reaches the output until `finish`, so a killed run loses
/// everything. Prefer [`StreamEmitter`].
pub struct AggregateEmitter<W: Write> {
    out: W,
    header: Option<CampaignHeader>,
    companies: Vec<CompanySummary>,
}

impl<W: Write> AggregateEmitter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            header: None,
            companies: Vec::new(),
        }
    }

    pub fn companies(&self) -> &[CompanySummary] {
        &self.companies
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for AggregateEmitter<W> {
    fn header(&mut self, header: &CampaignHeader) -> Result<()> {
        self.header = Some(header.clone());
        Ok(())
    }

    fn record(&mut self, record: &Record) -> Result<()> {
        self.companies.push(record.summary());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let aggregate = Aggregate {
            campaign: self.header.as_ref(),
            companies: &self.companies,
        };
        serde_json::to_writer(&mut self.out, &aggregate).context("Failed to serialize output")?;
        self.out.write_all(b"\n").context("Failed to write output")?;
        self.out.flush().context("Failed to flush output")
    }
}
