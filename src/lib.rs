//! # PoR Dashboard
//!
//! Administrative client for a Proof of Reserve backend: organise exchange
//! wallets and tokens into lists, trigger reserve snapshots, and review and
//! export them as CSV.
//!
//! ## Modules
//!
//! - [`client`]: REST client for the reserve backend and token metadata
//! - [`session`]: session context, persistence and the session guard
//! - [`chains`]: chain registry and address validation
//! - [`builder`]: draft of wallets and tokens, bulk import
//! - [`catalog`]: exchanges and lists
//! - [`snapshot`]: query trigger, viewer and CSV export
//! - [`overview`]: landing totals
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use por_dashboard::builder::DraftList;
//! use por_dashboard::chains::ChainRegistry;
//! use por_dashboard::client::{ApiClient, NoMetadata, RecordId};
//! use por_dashboard::session::SessionContext;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = ApiClient::new("http://localhost:8000", SessionContext::anonymous());
//!     client.login("admin", "secret").await?;
//!
//!     // Queue a wallet with one token
//!     let mut draft = DraftList::new(ChainRegistry::builtin());
//!     let wallet = draft.add_wallet(Some("ethereum"), "0x742d35Cc6634C0532925a3b844Bc454e4438f44e")?;
//!     draft
//!         .add_token(wallet, "0xdAC17F958D2ee523a2206206994597C13D831ec7", &NoMetadata)
//!         .await?;
//!
//!     // Send it to list 3
//!     draft.submit_import(&RecordId::from(3), &client).await?;
//!
//!     client.logout();
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod catalog;
pub mod chains;
pub mod client;
pub mod config;
pub mod error;
pub mod notify;
pub mod overview;
pub mod session;
pub mod snapshot;

pub use config::Config;
pub use error::{DashboardError, DashboardResult, ValidationError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
