use std::io::Write;

use anyhow::{Context, Result};
use mailprobe::CheckResponse;
use serde::Serialize;

use crate::args::OutputFormat;

#[derive(Serialize)]
pub struct OutputRow {
    pub input: String,
    #[serde(flatten)]
    pub response: CheckResponse,
}

impl OutputRow {
    pub fn new(input: impl Into<String>, response: CheckResponse) -> Self {
        Self {
            input: input.into(),
            response,
        }
    }
}

pub fn emit<W: Write>(out: &mut W, rows: &[OutputRow], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, rows).context("serialize JSON")?;
            writeln!(out)?;
        }
        OutputFormat::Ndjson => {
            for row in rows {
                serde_json::to_writer(&mut *out, row).context("serialize NDJSON")?;
                writeln!(out)?;
            }
        }
        OutputFormat::Human => {
            for row in rows {
                write_human(out, row)?;
            }
        }
    }
    Ok(())
}

fn write_human<W: Write>(out: &mut W, row: &OutputRow) -> Result<()> {
    match &row.response {
        CheckResponse::Checked {
            status,
            mx_host,
            logs,
            is_deliverable,
            risky,
            ..
        } => {
            let label = match (is_deliverable, risky) {
                (true, true) => "RISKY",
                (true, false) => "OK",
                _ => "KO",
            };
            writeln!(out, "{:<6} {} -> {} (mx: {})", label, row.input, status, mx_host)?;
            if *risky {
                writeln!(out, "       catch-all: le MX accepte aussi une adresse inexistante")?;
            }
            for (step, text) in logs.iter() {
                writeln!(out, "       {step}: {}", text.replace('\n', " | "))?;
            }
        }
        CheckResponse::ProbeFailed {
            status,
            mx_host,
            logs,
            ..
        } => {
            writeln!(out, "ERROR  {} -> {} (mx: {})", row.input, status, mx_host)?;
            for (step, text) in logs.iter() {
                writeln!(out, "       {step}: {}", text.replace('\n', " | "))?;
            }
        }
        CheckResponse::Refused { error, .. } => {
            writeln!(out, "ERROR  {} -> {}", row.input, error)?;
        }
    }
    Ok(())
}

/// 0 when every address is deliverable, 2 otherwise.
pub fn exit_code(rows: &[OutputRow]) -> i32 {
    if !rows.is_empty() && rows.iter().all(|row| row.response.is_deliverable()) {
        0
    } else {
        2
    }
}
