//! Draft Builder
//!
//! In-memory draft of wallets and tokens for one list. Nothing here is
//! authoritative: the draft is sent to `POST /import` as a whole and then
//! replaced by the backend's view of the list.

use std::io::Read;

use crate::chains::ChainRegistry;
use crate::client::{
    ImportRequest, ImportToken, ImportWallet, ListDetail, RecordId, ReserveBackend,
    TokenMetadataProvider, DEFAULT_DECIMALS,
};
use crate::error::{DashboardError, DashboardResult, ValidationError};

/// Token queued under a draft wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftToken {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

/// Wallet queued for import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftWallet {
    pub chain: String,
    pub address: String,
    pub tokens: Vec<DraftToken>,
}

/// Wallet input form state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletForm {
    pub chain: Option<String>,
    pub address: String,
}

impl WalletForm {
    pub fn clear(&mut self) {
        self.chain = None;
        self.address.clear();
    }
}

/// Where the builder currently is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuilderPhase {
    #[default]
    Editing,
    /// Token form open for the wallet at this index
    TokenModal { wallet_index: usize },
    /// Import request in flight
    Importing,
}

/// Result of [`DraftList::submit_import`]
#[derive(Debug)]
pub enum ImportOutcome {
    /// Draft was empty; nothing was sent
    Skipped,
    /// Import accepted and the draft cleared.
    ///
    /// `list` is the re-fetch of the target list, which can fail on its own
    /// without undoing the import.
    Imported {
        wallets: usize,
        list: DashboardResult<ListDetail>,
    },
}

/// Summary of a bulk draft load
#[derive(Debug, Default)]
pub struct DraftLoadReport {
    pub rows_processed: usize,
    pub wallets_added: usize,
    pub tokens_added: usize,
    pub errors: Vec<ValidationError>,
}

impl DraftLoadReport {
    pub fn rows_failed(&self) -> usize {
        self.errors.len()
    }
}

/// Draft of wallets and tokens for a single list
#[derive(Debug, Clone, Default)]
pub struct DraftList {
    registry: ChainRegistry,
    wallets: Vec<DraftWallet>,
    form: WalletForm,
    phase: BuilderPhase,
}

impl DraftList {
    pub fn new(registry: ChainRegistry) -> Self {
        Self {
            registry,
            ..Default::default()
        }
    }

    pub fn wallets(&self) -> &[DraftWallet] {
        &self.wallets
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    pub fn phase(&self) -> BuilderPhase {
        self.phase
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn form(&self) -> &WalletForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut WalletForm {
        &mut self.form
    }

    /// Validate and append a wallet; clears the form on success
    pub fn add_wallet(&mut self, chain: Option<&str>, address: &str) -> Result<usize, ValidationError> {
        let chain = chain
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(ValidationError::ChainNotSelected)?;

        let address = address.trim();
        if address.is_empty() {
            return Err(ValidationError::EmptyAddress);
        }

        let info = self.registry.check(chain, address)?;

        self.wallets.push(DraftWallet {
            chain: info.id.to_string(),
            address: address.to_string(),
            tokens: Vec::new(),
        });
        self.form.clear();

        tracing::debug!(chain = info.id, address, "Draft wallet added");
        Ok(self.wallets.len() - 1)
    }

    /// Submit the current form contents
    pub fn add_wallet_from_form(&mut self) -> Result<usize, ValidationError> {
        let WalletForm { chain, address } = self.form.clone();
        self.add_wallet(chain.as_deref(), &address)
    }

    /// Validate a token against its wallet's chain, then look up metadata.
    ///
    /// A failed lookup never blocks the add: the token keeps an empty name
    /// and symbol and [`DEFAULT_DECIMALS`].
    pub async fn add_token(
        &mut self,
        wallet_index: usize,
        token_address: &str,
        metadata: &dyn TokenMetadataProvider,
    ) -> Result<&DraftToken, ValidationError> {
        let chain = self
            .wallets
            .get(wallet_index)
            .map(|w| w.chain.clone())
            .ok_or(ValidationError::WalletNotFound(wallet_index))?;

        let info = self
            .registry
            .lookup(&chain)
            .ok_or_else(|| ValidationError::InvalidChain(chain.clone()))?;
        if !info.supports_tokens {
            return Err(ValidationError::TokensUnsupported(chain));
        }

        let token_address = token_address.trim();
        if token_address.is_empty() {
            return Err(ValidationError::EmptyAddress);
        }
        if !info.matches(token_address) {
            return Err(ValidationError::InvalidAddress {
                chain,
                address: token_address.to_string(),
            });
        }

        let found = match metadata.lookup(info.metadata_platform, token_address).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    chain = info.id,
                    token = token_address,
                    error = %e,
                    "Token metadata lookup failed, using defaults"
                );
                Default::default()
            }
        };

        let token = DraftToken {
            address: token_address.to_string(),
            name: found.name.unwrap_or_default(),
            symbol: found.symbol.unwrap_or_default(),
            decimals: found.decimals.unwrap_or(DEFAULT_DECIMALS),
        };

        let tokens = &mut self.wallets[wallet_index].tokens;
        tokens.push(token);
        Ok(&tokens[tokens.len() - 1])
    }

    /// Remove a wallet; out of range is a no-op
    pub fn remove_wallet(&mut self, index: usize) -> Option<DraftWallet> {
        if index >= self.wallets.len() {
            return None;
        }

        if let BuilderPhase::TokenModal { wallet_index } = self.phase {
            if wallet_index >= index {
                self.phase = BuilderPhase::Editing;
            }
        }
        Some(self.wallets.remove(index))
    }

    /// Remove a token; out of range is a no-op
    pub fn remove_token(&mut self, wallet_index: usize, token_index: usize) -> Option<DraftToken> {
        let wallet = self.wallets.get_mut(wallet_index)?;
        if token_index >= wallet.tokens.len() {
            return None;
        }
        Some(wallet.tokens.remove(token_index))
    }

    /// Target the token form at a wallet
    pub fn open_token_modal(&mut self, wallet_index: usize) -> Result<(), ValidationError> {
        let wallet = self
            .wallets
            .get(wallet_index)
            .ok_or(ValidationError::WalletNotFound(wallet_index))?;

        let supports_tokens = self
            .registry
            .lookup(&wallet.chain)
            .map(|info| info.supports_tokens)
            .unwrap_or(false);
        if !supports_tokens {
            return Err(ValidationError::TokensUnsupported(wallet.chain.clone()));
        }

        self.phase = BuilderPhase::TokenModal { wallet_index };
        Ok(())
    }

    pub fn close_token_modal(&mut self) {
        self.phase = BuilderPhase::Editing;
    }

    /// Wire form of the draft; wallets without tokens omit the field
    pub fn to_import_request(&self, list_id: &RecordId) -> ImportRequest {
        let wallets = self
            .wallets
            .iter()
            .map(|wallet| ImportWallet {
                chain: wallet.chain.clone(),
                address: wallet.address.clone(),
                tokens: if wallet.tokens.is_empty() {
                    None
                } else {
                    Some(
                        wallet
                            .tokens
                            .iter()
                            .map(|t| ImportToken {
                                address: t.address.clone(),
                                name: t.name.clone(),
                                symbol: t.symbol.clone(),
                                decimals: t.decimals,
                            })
                            .collect(),
                    )
                },
            })
            .collect();

        ImportRequest {
            wallets,
            list_id: list_id.clone(),
        }
    }

    /// Send the draft to the backend.
    ///
    /// An empty draft makes no call. On an "ok" status the draft is cleared
    /// and the list is re-fetched afterwards; a failed re-fetch is carried in
    /// the outcome, not returned as an error. On any import failure the draft
    /// is left untouched.
    pub async fn submit_import(
        &mut self,
        list_id: &RecordId,
        backend: &dyn ReserveBackend,
    ) -> DashboardResult<ImportOutcome> {
        if self.wallets.is_empty() {
            tracing::debug!(%list_id, "Empty draft, import skipped");
            return Ok(ImportOutcome::Skipped);
        }

        let request = self.to_import_request(list_id);
        self.phase = BuilderPhase::Importing;
        let response = backend.import(&request).await;
        self.phase = BuilderPhase::Editing;

        let response = response?;
        for result in &response.results {
            tracing::debug!(%list_id, %result, "Import result");
        }

        if !response.is_ok() {
            tracing::warn!(%list_id, status = %response.status, "Import rejected");
            return Err(DashboardError::ImportRejected(response.status));
        }

        let imported = self.wallets.len();
        self.wallets.clear();
        tracing::info!(%list_id, wallets = imported, "Import accepted");

        let list = backend.list_detail(list_id).await;
        if let Err(e) = &list {
            tracing::warn!(%list_id, error = %e, "List re-fetch after import failed");
        }
        Ok(ImportOutcome::Imported {
            wallets: imported,
            list,
        })
    }

    /// Load draft rows `chain,address[,token]` from CSV.
    ///
    /// A header row is detected by its first cell. Rows naming the same
    /// chain and address share one wallet. Bad rows are reported and skipped.
    pub async fn load_csv<R: Read>(
        &mut self,
        source: R,
        metadata: &dyn TokenMetadataProvider,
    ) -> DashboardResult<DraftLoadReport> {
        let rows = read_draft_rows(source)?;

        let mut report = DraftLoadReport::default();
        for (line, record) in rows {
            let chain = record.get(0).unwrap_or_default();
            let address = record.get(1).unwrap_or_default();
            let token = record.get(2).unwrap_or_default();

            let existing = self
                .wallets
                .iter()
                .position(|w| w.chain == chain && w.address == address);

            let wallet_index = match existing {
                Some(index) => index,
                None => match self.add_wallet(Some(chain), address) {
                    Ok(index) => {
                        report.wallets_added += 1;
                        index
                    }
                    Err(e) => {
                        report.errors.push(malformed(line, e));
                        continue;
                    }
                },
            };

            if !token.is_empty() {
                match self.add_token(wallet_index, token, metadata).await {
                    Ok(_) => report.tokens_added += 1,
                    Err(e) => {
                        report.errors.push(malformed(line, e));
                        continue;
                    }
                }
            }

            report.rows_processed += 1;
        }

        tracing::info!(
            processed = report.rows_processed,
            failed = report.rows_failed(),
            "Draft rows loaded"
        );
        Ok(report)
    }
}

/// Non-empty records with their 1-based line numbers, header skipped
fn read_draft_rows<R: Read>(source: R) -> DashboardResult<Vec<(usize, csv::StringRecord)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let mut rows = Vec::new();
    for (line_num, record) in reader.records().enumerate() {
        let record = record?;
        let line = line_num + 1;
        if line == 1 && record.get(0).is_some_and(|c| c.eq_ignore_ascii_case("chain")) {
            continue;
        }
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push((line, record));
    }
    Ok(rows)
}

fn malformed(row: usize, error: ValidationError) -> ValidationError {
    ValidationError::MalformedRow {
        row,
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeBackend;
    use crate::client::{NoMetadata, PersistedWallet, TokenMetadata};
    use async_trait::async_trait;

    const ETH_WALLET: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";
    const USDT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";
    const BTC_WALLET: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";

    struct FixedMetadata;

    #[async_trait]
    impl TokenMetadataProvider for FixedMetadata {
        async fn lookup(&self, _platform: &str, _address: &str) -> DashboardResult<TokenMetadata> {
            Ok(TokenMetadata {
                name: Some("Tether".into()),
                symbol: Some("usdt".into()),
                decimals: Some(6),
            })
        }
    }

    struct FailingMetadata;

    #[async_trait]
    impl TokenMetadataProvider for FailingMetadata {
        async fn lookup(&self, _platform: &str, _address: &str) -> DashboardResult<TokenMetadata> {
            Err(DashboardError::Http {
                status: 429,
                message: "rate limited".into(),
            })
        }
    }

    fn draft() -> DraftList {
        DraftList::new(ChainRegistry::builtin())
    }

    fn backend_with_list(id: u64) -> FakeBackend {
        let backend = FakeBackend::default();
        backend.details.lock().unwrap().push(ListDetail {
            id: RecordId::from(id),
            name: "Hot wallets".into(),
            exchange_id: None,
            wallets: vec![PersistedWallet {
                address: ETH_WALLET.into(),
                chain: "ethereum".into(),
                native_balance: "1.25".into(),
                native_symbol: "ETH".into(),
                tokens: Vec::new(),
            }],
        });
        backend
    }

    #[test]
    fn test_add_then_remove_wallet() {
        let mut draft = draft();
        draft.form_mut().chain = Some("ethereum".into());
        draft.form_mut().address = ETH_WALLET.into();

        let index = draft.add_wallet_from_form().unwrap();
        assert_eq!(index, 0);
        assert_eq!(
            draft.wallets(),
            &[DraftWallet {
                chain: "ethereum".into(),
                address: ETH_WALLET.into(),
                tokens: Vec::new(),
            }]
        );
        assert_eq!(draft.form(), &WalletForm::default());

        draft.remove_wallet(0);
        assert!(draft.is_empty());
    }

    #[test]
    fn test_add_wallet_validation() {
        let mut draft = draft();

        assert_eq!(
            draft.add_wallet(None, ETH_WALLET),
            Err(ValidationError::ChainNotSelected)
        );
        assert_eq!(
            draft.add_wallet(Some("ethereum"), "   "),
            Err(ValidationError::EmptyAddress)
        );
        assert_eq!(
            draft.add_wallet(Some("dogecoin"), ETH_WALLET),
            Err(ValidationError::InvalidChain("dogecoin".into()))
        );
        assert!(matches!(
            draft.add_wallet(Some("bitcoin"), ETH_WALLET),
            Err(ValidationError::InvalidAddress { .. })
        ));
        assert!(draft.is_empty());
    }

    #[test]
    fn test_failed_add_keeps_form() {
        let mut draft = draft();
        draft.form_mut().chain = Some("tron".into());
        draft.form_mut().address = "0x1234".into();

        assert!(draft.add_wallet_from_form().is_err());
        assert_eq!(draft.form().address, "0x1234");
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let mut draft = draft();
        draft.add_wallet(Some("ethereum"), ETH_WALLET).unwrap();

        assert!(draft.remove_wallet(5).is_none());
        assert!(draft.remove_token(0, 3).is_none());
        assert!(draft.remove_token(9, 0).is_none());
        assert_eq!(draft.wallets().len(), 1);
    }

    #[tokio::test]
    async fn test_add_token_with_metadata() {
        let mut draft = draft();
        draft.add_wallet(Some("ethereum"), ETH_WALLET).unwrap();

        let token = draft.add_token(0, USDT, &FixedMetadata).await.unwrap().clone();
        assert_eq!(token.name, "Tether");
        assert_eq!(token.symbol, "usdt");
        assert_eq!(token.decimals, 6);
    }

    #[tokio::test]
    async fn test_add_token_degrades_on_lookup_failure() {
        let mut draft = draft();
        draft.add_wallet(Some("ethereum"), ETH_WALLET).unwrap();

        let token = draft.add_token(0, USDT, &FailingMetadata).await.unwrap();
        assert_eq!(
            token,
            &DraftToken {
                address: USDT.into(),
                name: String::new(),
                symbol: String::new(),
                decimals: 18,
            }
        );
    }

    #[tokio::test]
    async fn test_add_then_remove_token_restores_draft() {
        let mut draft = draft();
        draft.add_wallet(Some("ethereum"), ETH_WALLET).unwrap();
        let before = draft.wallets().to_vec();

        draft.add_token(0, USDT, &NoMetadata).await.unwrap();
        assert_eq!(draft.wallets()[0].tokens.len(), 1);

        draft.remove_token(0, 0);
        assert_eq!(draft.wallets(), before.as_slice());
    }

    #[tokio::test]
    async fn test_add_token_validation() {
        let mut draft = draft();
        draft.add_wallet(Some("bitcoin"), BTC_WALLET).unwrap();
        draft.add_wallet(Some("ethereum"), ETH_WALLET).unwrap();

        assert_eq!(
            draft.add_token(0, BTC_WALLET, &NoMetadata).await.unwrap_err(),
            ValidationError::TokensUnsupported("bitcoin".into())
        );
        assert_eq!(
            draft.add_token(7, USDT, &NoMetadata).await.unwrap_err(),
            ValidationError::WalletNotFound(7)
        );
        assert_eq!(
            draft.add_token(1, "", &NoMetadata).await.unwrap_err(),
            ValidationError::EmptyAddress
        );
        // validated against the wallet's chain
        assert!(matches!(
            draft
                .add_token(1, "TLa2f6VPqDgRE67v1736s7bJ8Ray5wYjU7", &NoMetadata)
                .await
                .unwrap_err(),
            ValidationError::InvalidAddress { .. }
        ));
        assert!(draft.wallets().iter().all(|w| w.tokens.is_empty()));
    }

    #[test]
    fn test_token_modal_phases() {
        let mut draft = draft();
        draft.add_wallet(Some("bitcoin"), BTC_WALLET).unwrap();
        draft.add_wallet(Some("ethereum"), ETH_WALLET).unwrap();

        assert_eq!(
            draft.open_token_modal(0),
            Err(ValidationError::TokensUnsupported("bitcoin".into()))
        );
        draft.open_token_modal(1).unwrap();
        assert_eq!(draft.phase(), BuilderPhase::TokenModal { wallet_index: 1 });

        draft.close_token_modal();
        assert_eq!(draft.phase(), BuilderPhase::Editing);

        draft.open_token_modal(1).unwrap();
        draft.remove_wallet(1);
        assert_eq!(draft.phase(), BuilderPhase::Editing);
    }

    #[tokio::test]
    async fn test_empty_draft_skips_import() {
        let backend = FakeBackend::default();
        let mut draft = draft();

        let outcome = draft
            .submit_import(&RecordId::from(10), &backend)
            .await
            .unwrap();
        assert!(matches!(outcome, ImportOutcome::Skipped));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_import_clears_draft_then_refetches() {
        let backend = backend_with_list(10);
        let mut draft = draft();
        draft.add_wallet(Some("ethereum"), ETH_WALLET).unwrap();
        draft.add_wallet(Some("bitcoin"), BTC_WALLET).unwrap();
        draft.add_token(0, USDT, &NoMetadata).await.unwrap();

        let outcome = draft
            .submit_import(&RecordId::from(10), &backend)
            .await
            .unwrap();

        assert!(draft.is_empty());
        assert_eq!(draft.phase(), BuilderPhase::Editing);
        assert_eq!(backend.calls(), vec!["import", "list_detail"]);
        match outcome {
            ImportOutcome::Imported { wallets, list } => {
                assert_eq!(wallets, 2);
                assert_eq!(list.unwrap().wallets.len(), 1);
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let imports = backend.imports.lock().unwrap();
        let sent = &imports[0];
        assert_eq!(sent.wallets[0].tokens.as_ref().map(Vec::len), Some(1));
        assert_eq!(sent.wallets[1].tokens, None);
    }

    #[tokio::test]
    async fn test_failed_refetch_still_reports_import() {
        // Import accepted, but list 10 is unknown to the backend
        let backend = FakeBackend::default();
        let mut draft = draft();
        draft.add_wallet(Some("ethereum"), ETH_WALLET).unwrap();

        let outcome = draft
            .submit_import(&RecordId::from(10), &backend)
            .await
            .unwrap();

        assert!(draft.is_empty());
        assert_eq!(backend.calls(), vec!["import", "list_detail"]);
        match outcome {
            ImportOutcome::Imported { wallets, list } => {
                assert_eq!(wallets, 1);
                assert!(matches!(list, Err(DashboardError::NotFound(_))));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(backend.imports.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_import_keeps_draft() {
        let backend = backend_with_list(10);
        *backend.import_status.lock().unwrap() = Some("error".into());

        let mut draft = draft();
        draft.add_wallet(Some("ethereum"), ETH_WALLET).unwrap();
        let before = draft.wallets().to_vec();

        let err = draft
            .submit_import(&RecordId::from(10), &backend)
            .await
            .unwrap_err();

        assert!(matches!(err, DashboardError::ImportRejected(ref s) if s == "error"));
        assert_eq!(draft.wallets(), before.as_slice());
        assert_eq!(backend.calls(), vec!["import"]);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_draft() {
        let backend = FakeBackend {
            fail_network: true,
            ..Default::default()
        };

        let mut draft = draft();
        draft.add_wallet(Some("ethereum"), ETH_WALLET).unwrap();

        assert!(draft
            .submit_import(&RecordId::from(10), &backend)
            .await
            .is_err());
        assert_eq!(draft.wallets().len(), 1);
        assert_eq!(draft.phase(), BuilderPhase::Editing);
    }

    #[tokio::test]
    async fn test_load_csv_groups_rows() {
        let data = format!(
            "chain,address,token\n\
             ethereum,{eth},{usdt}\n\
             ethereum,{eth},0x6B175474E89094C44Da98b954EedeAC495271d0F\n\
             bitcoin,{btc},\n\
             bitcoin,{btc},{usdt}\n\
             solana,0x1234,\n",
            eth = ETH_WALLET,
            btc = BTC_WALLET,
            usdt = USDT
        );

        let mut draft = draft();
        let report = draft.load_csv(data.as_bytes(), &NoMetadata).await.unwrap();

        assert_eq!(report.wallets_added, 2);
        assert_eq!(report.tokens_added, 2);
        assert_eq!(report.rows_processed, 3);
        assert_eq!(report.rows_failed(), 2);
        assert!(matches!(
            report.errors[0],
            ValidationError::MalformedRow { row: 5, .. }
        ));

        assert_eq!(draft.wallets().len(), 2);
        assert_eq!(draft.wallets()[0].tokens.len(), 2);
        assert!(draft.wallets()[1].tokens.is_empty());
    }
}
