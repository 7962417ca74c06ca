//! CSV Export
//!
//! Two tables separated by two blank lines: token balances (with a fallback
//! row for wallets holding no tokens), then native balances. Downstream
//! tooling reads this layout byte for byte.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};

use crate::client::Snapshot;
use crate::error::DashboardResult;

const TOKEN_HEADER: [&str; 5] = [
    "Block Height",
    "Block Hash",
    "Network Name",
    "Token Symbol",
    "Token Balance",
];

const NATIVE_HEADER: [&str; 5] = [
    "Block Height",
    "Block Hash",
    "Network Symbol",
    "Network Name",
    "Native Balance",
];

fn table_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> DashboardResult<Vec<u8>> {
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Serialise a snapshot to the export format
pub fn export_csv(snapshot: &Snapshot) -> DashboardResult<String> {
    let mut tokens = table_writer();
    tokens.write_record(TOKEN_HEADER)?;
    for wallet in &snapshot.wallets {
        if wallet.tokens.is_empty() {
            let height = wallet.block_height.to_string();
            tokens.write_record([
                height.as_str(),
                wallet.address.as_str(),
                wallet.native_balance.as_str(),
                "",
                "",
            ])?;
            continue;
        }

        for token in &wallet.tokens {
            let height = token.block_height.to_string();
            tokens.write_record([
                height.as_str(),
                token.address.as_str(),
                wallet.native_symbol.as_str(),
                token.symbol.as_str(),
                token.balance.as_str(),
            ])?;
        }
    }

    let mut natives = table_writer();
    natives.write_record(NATIVE_HEADER)?;
    for wallet in &snapshot.wallets {
        let height = wallet.block_height.to_string();
        natives.write_record([
            height.as_str(),
            wallet.address.as_str(),
            wallet.native_symbol.as_str(),
            wallet.chain.as_str(),
            wallet.native_balance.as_str(),
        ])?;
    }

    let mut out = finish(tokens)?;
    out.extend_from_slice(b"\n\n");
    out.extend_from_slice(&finish(natives)?);

    String::from_utf8(out).map_err(|e| std::io::Error::other(e.to_string()).into())
}

/// Calendar date (UTC) of the snapshot timestamp
pub fn snapshot_date(timestamp: &str) -> Option<NaiveDate> {
    let timestamp = timestamp.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    let formats = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(timestamp, fmt) {
            return Some(dt.date());
        }
    }

    timestamp
        .get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
}

/// `Snapshot_{id}_{exchange}_{YYYY-MM-DD}.csv`; `fallback` stands in for an
/// unparseable timestamp
pub fn file_name(snapshot: &Snapshot, fallback: NaiveDate) -> String {
    // One `_` per UTF-16 unit, so an astral character takes two
    let mut exchange = String::with_capacity(snapshot.exchange.len());
    for c in snapshot.exchange.chars() {
        if c.is_ascii_alphanumeric() {
            exchange.push(c);
        } else {
            exchange.extend(std::iter::repeat('_').take(c.len_utf16()));
        }
    }
    let date = snapshot_date(&snapshot.timestamp).unwrap_or(fallback);

    format!(
        "Snapshot_{}_{}_{}.csv",
        snapshot.snapshot_id,
        exchange,
        date.format("%Y-%m-%d")
    )
}

/// Write the export into `dir`, returning the file path
pub fn write_csv(snapshot: &Snapshot, dir: &Path, today: NaiveDate) -> DashboardResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name(snapshot, today));
    std::fs::write(&path, export_csv(snapshot)?)?;

    tracing::info!(snapshot = %snapshot.snapshot_id, path = ?path, "Snapshot exported");
    Ok(path)
}
