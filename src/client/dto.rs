//! Request/Response DTOs
//!
//! Shapes exchanged with the reserve backend. The backend is loose about
//! scalar types (ids and balances arrive as numbers or strings), so the
//! readers here accept both.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ============================================
// Identifiers and loose scalars
// ============================================

/// Backend record identifier, numeric or textual on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as a number when its text is the canonical rendering of one.
    ///
    /// `"42"` is numeric; `"007"` and `"+7"` stay textual.
    pub fn as_number(&self) -> Option<u64> {
        self.0
            .parse::<u64>()
            .ok()
            .filter(|n| n.to_string() == self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl std::str::FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            Err("id is empty".to_string())
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_number() {
            Some(n) => serializer.serialize_u64(n),
            None => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        loose_string(deserializer).map(RecordId)
    }
}

/// Accept a string, number or bool and keep its textual rendering
fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Block heights sometimes arrive quoted
fn loose_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("invalid block height {}", n))),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(0),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid block height {:?}", s))),
        serde_json::Value::Null => Ok(0),
        other => Err(D::Error::custom(format!(
            "expected block height, got {}",
            other
        ))),
    }
}

// ============================================
// Session
// ============================================

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

// ============================================
// Exchanges and lists
// ============================================

/// A tenant grouping lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: RecordId,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateExchangeRequest<'a> {
    pub name: &'a str,
}

/// A named collection of wallets under one exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletList {
    pub id: RecordId,
    pub name: String,
    pub exchange_id: RecordId,
    #[serde(default)]
    pub exchange_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateListRequest<'a> {
    pub name: &'a str,
    pub exchange_id: &'a RecordId,
}

/// `GET /lists` answers with either a bare array or `{lists: [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListsEnvelope {
    Bare(Vec<WalletList>),
    Wrapped {
        #[serde(default)]
        lists: Vec<WalletList>,
    },
}

impl ListsEnvelope {
    pub(crate) fn into_lists(self) -> Vec<WalletList> {
        match self {
            ListsEnvelope::Bare(lists) => lists,
            ListsEnvelope::Wrapped { lists } => lists,
        }
    }
}

/// Token registered under a persisted wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedToken {
    #[serde(default, deserialize_with = "loose_string")]
    pub address: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub symbol: String,
    #[serde(default)]
    pub decimals: Option<u32>,
}

/// Wallet as stored by the backend after an import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedWallet {
    pub address: String,
    pub chain: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub native_balance: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub native_symbol: String,
    #[serde(default)]
    pub tokens: Vec<PersistedToken>,
}

/// `GET /lists/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListDetail {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub exchange_id: Option<RecordId>,
    #[serde(default)]
    pub wallets: Vec<PersistedWallet>,
}

// ============================================
// Import
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportToken {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportWallet {
    pub chain: String,
    pub address: String,
    /// Omitted entirely when the wallet has no tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<ImportToken>>,
}

/// `POST /import`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportRequest {
    pub wallets: Vec<ImportWallet>,
    pub list_id: RecordId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportResponse {
    #[serde(default)]
    pub status: String,
    /// Per-wallet outcomes, when the backend reports them
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

impl ImportResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

// ============================================
// Reserves and snapshots
// ============================================

/// `POST /reserves`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReserveRequest {
    pub list_id: RecordId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReserveResponse {
    #[serde(default)]
    snapshot_id: Option<RecordId>,
    #[serde(default)]
    id: Option<RecordId>,
}

impl ReserveResponse {
    /// Identifier of the snapshot the query produced, if the backend says
    pub fn snapshot_id(&self) -> Option<&RecordId> {
        self.snapshot_id
            .as_ref()
            .or(self.id.as_ref())
            .filter(|id| !id.as_str().is_empty())
    }
}

/// Token balance inside a snapshot wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotToken {
    #[serde(default, deserialize_with = "loose_string")]
    pub symbol: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub balance: String,
    #[serde(default, deserialize_with = "loose_u64")]
    pub block_height: u64,
    #[serde(default, deserialize_with = "loose_string")]
    pub address: String,
}

/// Wallet balances inside a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotWallet {
    #[serde(default, deserialize_with = "loose_string")]
    pub address: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub chain: String,
    #[serde(default, deserialize_with = "loose_u64")]
    pub block_height: u64,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub native_balance: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub native_symbol: String,
    #[serde(default)]
    pub tokens: Vec<SnapshotToken>,
}

/// Immutable backend-computed balance report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshot")]
pub struct Snapshot {
    pub snapshot_id: RecordId,
    pub exchange: String,
    pub timestamp: String,
    pub wallets: Vec<SnapshotWallet>,
}

/// The list endpoint names the key `id`, the detail endpoint `snapshot_id`
#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    snapshot_id: Option<RecordId>,
    #[serde(default)]
    id: Option<RecordId>,
    #[serde(default, deserialize_with = "loose_string")]
    exchange: String,
    #[serde(default, deserialize_with = "loose_string")]
    timestamp: String,
    #[serde(default)]
    wallets: Vec<SnapshotWallet>,
}

impl TryFrom<RawSnapshot> for Snapshot {
    type Error = String;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        let snapshot_id = raw
            .snapshot_id
            .or(raw.id)
            .ok_or_else(|| "snapshot without id".to_string())?;

        Ok(Snapshot {
            snapshot_id,
            exchange: raw.exchange,
            timestamp: raw.timestamp,
            wallets: raw.wallets,
        })
    }
}

/// `GET /snapshots` answers with either a bare array or `{snapshots: [...]}`;
/// anything else is treated as empty
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SnapshotsEnvelope {
    Bare(Vec<serde_json::Value>),
    Wrapped { snapshots: Vec<serde_json::Value> },
    Other(serde::de::IgnoredAny),
}

impl SnapshotsEnvelope {
    /// Decode each entry on its own; an entry that does not decode is
    /// skipped with a warning and does not hide the others.
    pub(crate) fn into_snapshots(self) -> Vec<Snapshot> {
        let entries = match self {
            SnapshotsEnvelope::Bare(entries) => entries,
            SnapshotsEnvelope::Wrapped { snapshots } => snapshots,
            SnapshotsEnvelope::Other(_) => return Vec::new(),
        };

        entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<Snapshot>(entry) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping malformed snapshot entry");
                    None
                }
            })
            .collect()
    }
}

// ============================================
// Chains
// ============================================

/// Entry of `GET /chains`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ChainEntry {
    Id(String),
    Detailed {
        #[serde(alias = "chain")]
        id: String,
        #[serde(default = "enabled_by_default")]
        enabled: bool,
    },
}

fn enabled_by_default() -> bool {
    true
}

impl ChainEntry {
    pub(crate) fn into_enabled_id(self) -> Option<String> {
        match self {
            ChainEntry::Id(id) => Some(id),
            ChainEntry::Detailed { id, enabled: true } => Some(id),
            ChainEntry::Detailed { enabled: false, .. } => None,
        }
    }
}
