//! Remote services
//!
//! - **api**: REST client for the reserve backend
//! - **dto**: request and response shapes
//! - **metadata**: best-effort token metadata lookup
//!
//! Workflows depend on the [`ReserveBackend`] trait rather than on the
//! concrete client, so they can be driven against an in-memory backend.

mod api;
pub mod dto;
mod metadata;

pub use api::ApiClient;
pub use dto::{
    Exchange, ImportRequest, ImportResponse, ImportToken, ImportWallet, ListDetail,
    PersistedToken, PersistedWallet, RecordId, ReserveRequest, ReserveResponse, Snapshot,
    SnapshotToken, SnapshotWallet, WalletList,
};
pub use metadata::{
    CoinGeckoClient, NoMetadata, TokenMetadata, TokenMetadataProvider, DEFAULT_DECIMALS,
};

use async_trait::async_trait;

use crate::error::DashboardResult;

/// Operations the dashboard needs from the reserve backend
#[async_trait]
pub trait ReserveBackend: Send + Sync {
    /// `GET /exchanges`
    async fn exchanges(&self) -> DashboardResult<Vec<Exchange>>;

    /// `POST /exchanges`
    async fn create_exchange(&self, name: &str) -> DashboardResult<Exchange>;

    /// `GET /lists`
    async fn lists(&self) -> DashboardResult<Vec<WalletList>>;

    /// `POST /lists`
    async fn create_list(&self, name: &str, exchange_id: &RecordId) -> DashboardResult<WalletList>;

    /// `GET /lists/{id}`
    async fn list_detail(&self, id: &RecordId) -> DashboardResult<ListDetail>;

    /// `POST /import`
    async fn import(&self, request: &ImportRequest) -> DashboardResult<ImportResponse>;

    /// `POST /reserves`
    async fn create_reserve(&self, request: &ReserveRequest) -> DashboardResult<ReserveResponse>;

    /// `GET /snapshots`
    async fn snapshots(&self) -> DashboardResult<Vec<Snapshot>>;

    /// `GET /snapshots/{id}`
    async fn snapshot(&self, id: &RecordId) -> DashboardResult<Snapshot>;

    /// `GET /chains`, enabled chain ids only
    async fn chains(&self) -> DashboardResult<Vec<String>>;
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory backend shared by workflow tests

    use super::*;
    use crate::error::DashboardError;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeBackend {
        pub exchanges: Mutex<Vec<Exchange>>,
        pub lists: Mutex<Vec<WalletList>>,
        pub details: Mutex<Vec<ListDetail>>,
        pub snapshots: Mutex<Vec<Snapshot>>,
        pub chains: Vec<String>,
        pub import_status: Mutex<Option<String>>,
        pub fail_network: bool,
        pub reserve_snapshot_id: Option<RecordId>,
        /// Method name of every call, in order
        pub calls: Mutex<Vec<String>>,
        pub imports: Mutex<Vec<ImportRequest>>,
        pub reserves: Mutex<Vec<ReserveRequest>>,
    }

    impl FakeBackend {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &str) -> DashboardResult<()> {
            self.calls.lock().unwrap().push(call.to_string());
            if self.fail_network {
                return Err(DashboardError::Http {
                    status: 503,
                    message: "backend down".into(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ReserveBackend for FakeBackend {
        async fn exchanges(&self) -> DashboardResult<Vec<Exchange>> {
            self.record("exchanges")?;
            Ok(self.exchanges.lock().unwrap().clone())
        }

        async fn create_exchange(&self, name: &str) -> DashboardResult<Exchange> {
            self.record("create_exchange")?;
            let mut exchanges = self.exchanges.lock().unwrap();
            let exchange = Exchange {
                id: RecordId::from(exchanges.len() as u64 + 1),
                name: name.to_string(),
            };
            exchanges.push(exchange.clone());
            Ok(exchange)
        }

        async fn lists(&self) -> DashboardResult<Vec<WalletList>> {
            self.record("lists")?;
            Ok(self.lists.lock().unwrap().clone())
        }

        async fn create_list(&self, name: &str, exchange_id: &RecordId) -> DashboardResult<WalletList> {
            self.record("create_list")?;
            let mut lists = self.lists.lock().unwrap();
            let list = WalletList {
                id: RecordId::from(100 + lists.len() as u64),
                name: name.to_string(),
                exchange_id: exchange_id.clone(),
                exchange_name: None,
                created_at: None,
            };
            lists.push(list.clone());
            Ok(list)
        }

        async fn list_detail(&self, id: &RecordId) -> DashboardResult<ListDetail> {
            self.record("list_detail")?;
            self.details
                .lock()
                .unwrap()
                .iter()
                .find(|d| &d.id == id)
                .cloned()
                .ok_or_else(|| DashboardError::NotFound(format!("/lists/{}", id)))
        }

        async fn import(&self, request: &ImportRequest) -> DashboardResult<ImportResponse> {
            self.record("import")?;
            self.imports.lock().unwrap().push(request.clone());
            let status = self
                .import_status
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| "ok".to_string());
            Ok(ImportResponse {
                status,
                results: Vec::new(),
            })
        }

        async fn create_reserve(&self, request: &ReserveRequest) -> DashboardResult<ReserveResponse> {
            self.record("create_reserve")?;
            self.reserves.lock().unwrap().push(request.clone());
            let body = match &self.reserve_snapshot_id {
                Some(id) => serde_json::json!({ "snapshot_id": id }),
                None => serde_json::json!({}),
            };
            Ok(serde_json::from_value(body).unwrap())
        }

        async fn snapshots(&self) -> DashboardResult<Vec<Snapshot>> {
            self.record("snapshots")?;
            Ok(self.snapshots.lock().unwrap().clone())
        }

        async fn snapshot(&self, id: &RecordId) -> DashboardResult<Snapshot> {
            self.record("snapshot")?;
            self.snapshots
                .lock()
                .unwrap()
                .iter()
                .find(|s| &s.snapshot_id == id)
                .cloned()
                .ok_or_else(|| DashboardError::NotFound(format!("/snapshots/{}", id)))
        }

        async fn chains(&self) -> DashboardResult<Vec<String>> {
            self.record("chains")?;
            Ok(self.chains.clone())
        }
    }
}
