use crate::args::HistoryFormat;
use crate::clock::Clock;
use crate::commands::{open_escrow, Out};
use crate::model::Transaction;
use crate::{Config, Result};
use anyhow::Context;
use std::sync::Arc;

const HEADERS: [&str; 6] = ["date", "type", "amount", "description", "method", "id"];

fn row(t: &Transaction) -> [String; 6] {
    [
        t.date().format("%Y-%m-%d %H:%M").to_string(),
        t.kind().to_string(),
        t.amount().to_string(),
        t.description().to_string(),
        t.method().unwrap_or_default().to_string(),
        t.id().to_string(),
    ]
}

/// Renders the ledger newest first in the requested format.
pub async fn history(
    config: &Config,
    clock: Arc<dyn Clock>,
    format: HistoryFormat,
) -> Result<Out<Vec<Transaction>>> {
    let escrow = open_escrow(config, clock).await?;
    let transactions: Vec<Transaction> = escrow
        .state()
        .transactions
        .newest_first()
        .cloned()
        .collect();
    if transactions.is_empty() {
        return Ok(Out::new("No transactions yet", transactions));
    }
    let rendered = match format {
        HistoryFormat::Table => table(&transactions),
        HistoryFormat::Json => serde_json::to_string_pretty(&transactions)
            .context("Unable to serialize transactions")?,
        HistoryFormat::Csv => csv(&transactions)?,
    };
    Ok(Out::new(rendered, transactions))
}

fn table(transactions: &[Transaction]) -> String {
    // The id column is left out of the table to keep it readable.
    let rows: Vec<[String; 6]> = transactions.iter().map(row).collect();
    let columns = HEADERS.len() - 1;
    let mut widths: Vec<usize> = HEADERS[..columns].iter().map(|h| h.len()).collect();
    for r in &rows {
        for (width, cell) in widths.iter_mut().zip(r.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(HEADERS[..columns].to_vec())];
    for r in &rows {
        out.push(line(r[..columns].iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

fn csv(transactions: &[Transaction]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(HEADERS)
        .context("Unable to write the CSV header")?;
    for t in transactions {
        writer
            .write_record(row(t))
            .context("Unable to write a CSV record")?;
    }
    let bytes = writer
        .into_inner()
        .context("Unable to finish writing CSV")?;
    String::from_utf8(bytes).context("The CSV output is not valid UTF-8")
}
