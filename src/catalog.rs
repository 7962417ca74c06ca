//! Exchanges and Lists
//!
//! Local copy of the backend's exchanges and lists with one active
//! exchange. Creations go to the backend first and are appended locally
//! from the response.

use crate::client::{Exchange, RecordId, ReserveBackend, WalletList};
use crate::error::{DashboardResult, ValidationError};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    exchanges: Vec<Exchange>,
    lists: Vec<WalletList>,
    active: Option<RecordId>,
}

impl Catalog {
    /// Fetch exchanges and lists together; the first exchange becomes active
    pub async fn load(backend: &dyn ReserveBackend) -> DashboardResult<Self> {
        let (exchanges, lists) = tokio::join!(backend.exchanges(), backend.lists());
        let exchanges = exchanges?;
        let lists = lists?;

        let active = exchanges.first().map(|e| e.id.clone());
        tracing::debug!(
            exchanges = exchanges.len(),
            lists = lists.len(),
            "Catalog loaded"
        );

        Ok(Self {
            exchanges,
            lists,
            active,
        })
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn lists(&self) -> &[WalletList] {
        &self.lists
    }

    pub fn active(&self) -> Option<&Exchange> {
        let id = self.active.as_ref()?;
        self.exchanges.iter().find(|e| &e.id == id)
    }

    /// Switch the active exchange; unknown ids leave it unchanged
    pub fn set_active(&mut self, id: &RecordId) -> bool {
        if self.exchanges.iter().any(|e| &e.id == id) {
            self.active = Some(id.clone());
            true
        } else {
            false
        }
    }

    /// Lists belonging to the active exchange
    pub fn filtered_lists(&self) -> Vec<&WalletList> {
        match &self.active {
            Some(active) => self
                .lists
                .iter()
                .filter(|list| &list.exchange_id == active)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn list(&self, id: &RecordId) -> Option<&WalletList> {
        self.lists.iter().find(|list| &list.id == id)
    }

    /// Create an exchange and make it active
    pub async fn add_exchange(
        &mut self,
        backend: &dyn ReserveBackend,
        name: &str,
    ) -> DashboardResult<&Exchange> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName("exchange").into());
        }

        let exchange = backend.create_exchange(name).await?;
        tracing::info!(id = %exchange.id, name = %exchange.name, "Exchange created");

        self.active = Some(exchange.id.clone());
        self.exchanges.push(exchange);
        Ok(&self.exchanges[self.exchanges.len() - 1])
    }

    /// Create a list under the active exchange
    pub async fn add_list(
        &mut self,
        backend: &dyn ReserveBackend,
        name: &str,
    ) -> DashboardResult<&WalletList> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName("list").into());
        }
        let exchange_id = self
            .active
            .clone()
            .ok_or(ValidationError::NoActiveExchange)?;

        let list = backend.create_list(name, &exchange_id).await?;
        tracing::info!(id = %list.id, exchange = %exchange_id, "List created");

        self.lists.push(list);
        Ok(&self.lists[self.lists.len() - 1])
    }
}
