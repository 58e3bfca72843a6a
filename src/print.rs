// src/print.rs
use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Mutex;

use crate::model::AnalysisReport;

pub trait Printer: Send + Sync {
    fn print(&self, report: &AnalysisReport) -> Result<()>;
}

/// Compact JSON report on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutPrinter;

impl Printer for StdoutPrinter {
    fn print(&self, report: &AnalysisReport) -> Result<()> {
        let stdout = std::io::stdout();
        write_report(&mut stdout.lock(), report)
    }
}

/// Writes into any sink; handy for capturing output.
pub struct WriterPrinter<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> WriterPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|p| p.into_inner())
    }
}

impl<W: Write + Send> Printer for WriterPrinter<W> {
    fn print(&self, report: &AnalysisReport) -> Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        write_report(&mut *out, report)
    }
}

fn write_report(out: &mut dyn Write, report: &AnalysisReport) -> Result<()> {
    let line = serde_json::to_string(report).context("serialize analysis report")?;
    writeln!(out, "{line}").context("write analysis report")?;
    out.flush().context("flush analysis report")
}
