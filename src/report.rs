use crate::{fingerprint::OriginKey, occurrence::OccurrenceIndex, template::TemplateStore};
use anyhow::{Context, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::io::Write;

pub const SUMMARY_FILE: &str = "summary.csv";
pub const SYMBOL_FILE: &str = "invalid_symbols.csv";
const SUMMARY_HEADER: &str = "#TYPE,INSTANCE,VENUE,DATE,COUNT,GREP_FILE,EXAMPLE";
const SYMBOL_HEADER: &str = "#SYMBOL,VENUE,DATE";

/// Writes the template summary and the invalid symbol table.
pub struct ReportWriter<W: Write> {
    summary: csv::Writer<W>,
    symbols: csv::Writer<W>,
}

fn table<W: Write>(mut out: W, header: &str) -> Result<csv::Writer<W>> {
    writeln!(out, "{}", header)?;
    Ok(WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out))
}

impl<W: Write> ReportWriter<W> {
    /// Write both headers and get ready for rows.
    pub fn new(summary: W, symbols: W) -> Result<Self> {
        Ok(Self {
            summary: table(summary, SUMMARY_HEADER).context("failed to write summary header")?,
            symbols: table(symbols, SYMBOL_HEADER).context("failed to write symbol header")?,
        })
    }

    /// Append one row per (template, origin) group in `index`, labelled with the
    /// template's current form in `store`. Returns the number of rows written.
    pub fn write_summary(&mut self, index: &OccurrenceIndex, store: &TemplateStore) -> Result<usize> {
        let mut rows = 0;
        for (label, origin, occurrences) in index.groups() {
            let first = match occurrences.first() {
                Some(first) => first,
                None => continue,
            };
            self.summary.write_record([
                format!("{}...", store.relabel(label)),
                first.loader.map(String::from).unwrap_or_default(),
                origin.venue.clone(),
                origin.date.clone(),
                occurrences.len().to_string(),
                first.file.display().to_string(),
                first.line.trim_end().to_owned(),
            ])?;
            rows += 1;
        }
        self.summary.flush()?;
        Ok(rows)
    }

    pub fn write_symbol(&mut self, symbol: &str, origin: &OriginKey) -> Result<()> {
        self.symbols.write_record([symbol, origin.venue.as_str(), origin.date.as_str()])?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.summary.flush()?;
        self.symbols.flush()?;
        Ok(())
    }

    /// Flush and hand back the underlying writers.
    pub fn into_inner(self) -> Result<(W, W)> {
        let summary = self.summary.into_inner().map_err(|e| e.into_error())?;
        let symbols = self.symbols.into_inner().map_err(|e| e.into_error())?;
        Ok((summary, symbols))
    }
}
