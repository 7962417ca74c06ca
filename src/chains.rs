//! Chain Registry
//!
//! Maps a chain identifier to its display name, address pattern and a
//! sample address. The set of selectable chains comes either from the
//! compiled-in table or from the backend's `GET /chains`; in the latter
//! case a chain still needs an entry in the compiled pattern table to be
//! usable.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::ValidationError;

/// Static description of a chain
#[derive(Debug, Clone, Copy)]
struct ChainSpec {
    id: &'static str,
    display_name: &'static str,
    pattern: &'static str,
    sample_address: &'static str,
    supports_tokens: bool,
    /// Platform id used by the token metadata service
    metadata_platform: &'static str,
}

const EVM_ADDRESS: &str = r"^0x[a-fA-F0-9]{40}$";

const CHAIN_TABLE: &[ChainSpec] = &[
    ChainSpec {
        id: "ethereum",
        display_name: "Ethereum",
        pattern: EVM_ADDRESS,
        sample_address: "0x742d35Cc6634C0532925a3b844Bc454e4438f44e",
        supports_tokens: true,
        metadata_platform: "ethereum",
    },
    ChainSpec {
        id: "bitcoin",
        display_name: "Bitcoin",
        pattern: r"^(?:[13][a-km-zA-HJ-NP-Z1-9]{25,34}|bc1[a-z0-9]{39,59})$",
        sample_address: "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh",
        supports_tokens: false,
        metadata_platform: "bitcoin",
    },
    ChainSpec {
        id: "solana",
        display_name: "Solana",
        pattern: r"^[1-9A-HJ-NP-Za-km-z]{32,44}$",
        sample_address: "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM",
        supports_tokens: true,
        metadata_platform: "solana",
    },
    ChainSpec {
        id: "avax_cchain",
        display_name: "Avalanche C-Chain",
        pattern: EVM_ADDRESS,
        sample_address: "0x8db97C7cEcE249c2b98bDC0226Cc4C2A57BF52FC",
        supports_tokens: true,
        metadata_platform: "avalanche",
    },
    ChainSpec {
        id: "avax_xchain",
        display_name: "Avalanche X-Chain",
        pattern: r"^X-avax1[02-9ac-hj-np-z]{38}$",
        sample_address: "X-avax1tzdcgj4ehsvhhgpl7zylwpw0gl2rxcg4r5afk5",
        supports_tokens: true,
        metadata_platform: "avalanche",
    },
    ChainSpec {
        id: "tron",
        display_name: "Tron",
        pattern: r"^T[1-9A-HJ-NP-Za-km-z]{33}$",
        sample_address: "TLa2f6VPqDgRE67v1736s7bJ8Ray5wYjU7",
        supports_tokens: true,
        metadata_platform: "tron",
    },
    ChainSpec {
        id: "chiliz",
        display_name: "Chiliz",
        pattern: EVM_ADDRESS,
        sample_address: "0x3506424F91fD33084466F402d5D97f05F8e3b4AF",
        supports_tokens: true,
        metadata_platform: "chiliz",
    },
    ChainSpec {
        id: "xrp",
        display_name: "XRP Ledger",
        pattern: r"^r[1-9A-HJ-NP-Za-km-z]{24,34}$",
        sample_address: "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh",
        supports_tokens: true,
        metadata_platform: "xrp",
    },
];

fn compiled_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        CHAIN_TABLE
            .iter()
            .map(|spec| Regex::new(spec.pattern).expect("chain table patterns are valid"))
            .collect()
    })
}

/// Resolved chain entry
#[derive(Debug, Clone)]
pub struct ChainInfo {
    pub id: &'static str,
    pub display_name: &'static str,
    pub address_pattern: &'static Regex,
    pub sample_address: &'static str,
    pub supports_tokens: bool,
    pub metadata_platform: &'static str,
}

impl ChainInfo {
    /// Whether `address` is well-formed for this chain
    pub fn matches(&self, address: &str) -> bool {
        self.address_pattern.is_match(address)
    }
}

/// Which side decides the selectable chains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainSourceKind {
    #[default]
    Static,
    Fetched,
}

impl FromStr for ChainSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "static" => Ok(ChainSourceKind::Static),
            "fetched" => Ok(ChainSourceKind::Fetched),
            other => Err(format!("unknown chain source {:?}", other)),
        }
    }
}

/// Chain set backing a registry
#[derive(Debug, Clone, Default)]
pub enum ChainSource {
    /// Every chain of the compiled table
    #[default]
    Static,
    /// Chains enabled by the backend
    Fetched(BTreeSet<String>),
}

/// Registry of selectable chains and their address rules
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    source: ChainSource,
}

impl ChainRegistry {
    pub fn new(source: ChainSource) -> Self {
        Self { source }
    }

    /// Registry over the compiled table
    pub fn builtin() -> Self {
        Self::new(ChainSource::Static)
    }

    /// Registry over a backend-provided chain list
    pub fn fetched<I, S>(enabled: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ChainSource::Fetched(
            enabled.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn source(&self) -> &ChainSource {
        &self.source
    }

    /// Resolve a chain id, `None` when it is not selectable or has no pattern
    pub fn lookup(&self, chain: &str) -> Option<ChainInfo> {
        if let ChainSource::Fetched(enabled) = &self.source {
            if !enabled.contains(chain) {
                return None;
            }
        }

        CHAIN_TABLE
            .iter()
            .zip(compiled_patterns())
            .find(|(spec, _)| spec.id == chain)
            .map(|(spec, pattern)| ChainInfo {
                id: spec.id,
                display_name: spec.display_name,
                address_pattern: pattern,
                sample_address: spec.sample_address,
                supports_tokens: spec.supports_tokens,
                metadata_platform: spec.metadata_platform,
            })
    }

    /// True iff `chain` resolves and `address` matches its pattern
    pub fn validate(&self, chain: &str, address: &str) -> bool {
        self.lookup(chain)
            .map(|info| info.matches(address))
            .unwrap_or(false)
    }

    /// Resolve and check in one step, with a typed reason on failure
    pub fn check(&self, chain: &str, address: &str) -> Result<ChainInfo, ValidationError> {
        let info = self
            .lookup(chain)
            .ok_or_else(|| ValidationError::InvalidChain(chain.to_string()))?;

        if !info.matches(address) {
            return Err(ValidationError::InvalidAddress {
                chain: chain.to_string(),
                address: address.to_string(),
            });
        }

        Ok(info)
    }

    /// Chains a user can pick, in table order
    pub fn available(&self) -> Vec<ChainInfo> {
        CHAIN_TABLE
            .iter()
            .filter_map(|spec| self.lookup(spec.id))
            .collect()
    }

    /// Backend chains that have no address pattern
    pub fn unmatched(&self) -> Vec<String> {
        match &self.source {
            ChainSource::Static => Vec::new(),
            ChainSource::Fetched(enabled) => enabled
                .iter()
                .filter(|id| !CHAIN_TABLE.iter().any(|spec| spec.id == id.as_str()))
                .cloned()
                .collect(),
        }
    }
}

impl fmt::Display for ChainInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}
