//! Landing overview: totals and the most recent snapshots

use crate::client::{RecordId, ReserveBackend, Snapshot};
use crate::error::DashboardResult;

/// How many snapshots the overview shows
pub const RECENT_SNAPSHOTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub id: RecordId,
    pub exchange: String,
    pub timestamp: String,
    pub wallets: usize,
}

impl From<&Snapshot> for SnapshotSummary {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            id: snapshot.snapshot_id.clone(),
            exchange: snapshot.exchange.clone(),
            timestamp: snapshot.timestamp.clone(),
            wallets: snapshot.wallets.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overview {
    pub exchanges: usize,
    pub lists: usize,
    pub snapshots: usize,
    pub recent: Vec<SnapshotSummary>,
}

impl Overview {
    pub async fn load(backend: &dyn ReserveBackend) -> DashboardResult<Self> {
        let (exchanges, lists, snapshots) =
            tokio::join!(backend.exchanges(), backend.lists(), backend.snapshots());
        let exchanges = exchanges?;
        let lists = lists?;
        let snapshots = snapshots?;

        Ok(Self {
            exchanges: exchanges.len(),
            lists: lists.len(),
            snapshots: snapshots.len(),
            recent: snapshots
                .iter()
                .take(RECENT_SNAPSHOTS)
                .map(SnapshotSummary::from)
                .collect(),
        })
    }
}
