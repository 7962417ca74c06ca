//! Snapshot Viewer

use std::fmt::Write;

use crate::client::{RecordId, ReserveBackend, Snapshot};
use crate::error::DashboardResult;

/// Fetch one snapshot; a 404 surfaces as `NotFound`
pub async fn load_snapshot(backend: &dyn ReserveBackend, id: &RecordId) -> DashboardResult<Snapshot> {
    let snapshot = backend.snapshot(id).await?;
    tracing::debug!(%id, wallets = snapshot.wallets.len(), "Snapshot loaded");
    Ok(snapshot)
}

/// All snapshots, newest first as the backend orders them
pub async fn list_snapshots(backend: &dyn ReserveBackend) -> DashboardResult<Vec<Snapshot>> {
    backend.snapshots().await
}

/// Text view of a snapshot's wallets and token balances
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} - snapshot {} ({})",
        snapshot.exchange, snapshot.snapshot_id, snapshot.timestamp
    );

    if snapshot.wallets.is_empty() {
        out.push_str("  no wallets\n");
        return out;
    }

    for wallet in &snapshot.wallets {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Block Height: {}", wallet.block_height);
        let _ = writeln!(out, "  Address:      {} [{}]", wallet.address, wallet.chain);
        if let Some(hash) = wallet.block_hash.as_deref().filter(|h| !h.is_empty()) {
            let _ = writeln!(out, "  Block Hash:   {}", hash);
        }
        let _ = writeln!(
            out,
            "  Balance:      {} {}",
            wallet.native_balance, wallet.native_symbol
        );

        for token in &wallet.tokens {
            let _ = writeln!(out, "    {:<10} {}", token.symbol, token.balance);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeBackend;
    use crate::client::{SnapshotToken, SnapshotWallet};

    fn snapshot() -> Snapshot {
        Snapshot {
            snapshot_id: RecordId::from(9),
            exchange: "Acme".into(),
            timestamp: "2025-06-01T12:00:00Z".into(),
            wallets: vec![SnapshotWallet {
                address: "0xabc".into(),
                chain: "ethereum".into(),
                block_height: 19_000_000,
                block_hash: None,
                native_balance: "1.5".into(),
                native_symbol: "ETH".into(),
                tokens: vec![SnapshotToken {
                    symbol: "USDT".into(),
                    balance: "250".into(),
                    block_height: 19_000_000,
                    address: "0xdef".into(),
                }],
            }],
        }
    }

    #[test]
    fn test_render_lists_balances() {
        let text = render_snapshot(&snapshot());
        assert!(text.starts_with("Acme - snapshot 9 (2025-06-01T12:00:00Z)"));
        assert!(text.contains("Block Height: 19000000"));
        assert!(text.contains("1.5 ETH"));
        assert!(text.contains("USDT"));
        assert!(text.contains("250"));
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_not_found() {
        let backend = FakeBackend::default();
        backend.snapshots.lock().unwrap().push(snapshot());

        assert_eq!(
            load_snapshot(&backend, &RecordId::from(9))
                .await
                .unwrap()
                .exchange,
            "Acme"
        );
        let err = load_snapshot(&backend, &RecordId::from(10)).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
