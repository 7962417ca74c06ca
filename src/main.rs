//! PoR Dashboard CLI
//!
//! Terminal front-end for the Proof of Reserve dashboard:
//! - Log in and out
//! - Manage exchanges and lists
//! - Import wallets and tokens into a list
//! - Trigger, view and export snapshots

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use por_dashboard::builder::{DraftList, ImportOutcome};
use por_dashboard::catalog::Catalog;
use por_dashboard::chains::{ChainRegistry, ChainSourceKind};
use por_dashboard::client::{
    ApiClient, CoinGeckoClient, ListDetail, NoMetadata, RecordId, ReserveBackend,
    TokenMetadataProvider,
};
use por_dashboard::config::{generate_default_config, LoggingConfig};
use por_dashboard::notify::Notification;
use por_dashboard::overview::Overview;
use por_dashboard::session::{Access, SessionGuard, SessionStore};
use por_dashboard::snapshot::{self, QueryOutcome, QueryTrigger};
use por_dashboard::{Config, DashboardError, DashboardResult, ValidationError};

#[derive(Parser)]
#[command(name = "por")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Proof of Reserve dashboard")]
#[command(long_about = "Organise exchange wallets and tokens into lists, trigger reserve snapshots,\nand review or export them as CSV.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Backend API URL (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session token
    Login {
        #[arg(short, long)]
        username: String,
        /// Password (prompted when omitted)
        #[arg(short, long, env = "POR_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session token
    Logout,

    /// Totals and the most recent snapshots
    Overview,

    /// List exchanges
    Exchanges,

    /// Create an exchange
    AddExchange {
        name: String,
    },

    /// Lists of an exchange (default: the first one)
    Lists {
        /// Exchange id
        #[arg(short, long)]
        exchange: Option<RecordId>,
        /// Show lists of every exchange
        #[arg(long)]
        all: bool,
    },

    /// Create a list under an exchange
    CreateList {
        name: String,
        /// Exchange id (default: the first one)
        #[arg(short, long)]
        exchange: Option<RecordId>,
    },

    /// Show the wallets of a list
    ShowList {
        id: RecordId,
    },

    /// Selectable chains with sample addresses
    Chains,

    /// Check an address against a chain's pattern
    Validate {
        chain: String,
        address: String,
    },

    /// Import wallets and tokens into a list
    Import {
        /// Target list id
        list: RecordId,
        /// CSV with rows chain,address[,token]
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Wallet as CHAIN:ADDRESS[:TOKEN,...]
        #[arg(short, long)]
        wallet: Vec<String>,
        /// Print the request instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Trigger a reserve snapshot for a list
    Query {
        /// List id
        list: RecordId,
        /// Historical date (default: live)
        #[arg(short, long)]
        date: Option<String>,
        /// Do not open the snapshot the backend returns
        #[arg(long)]
        no_show: bool,
    },

    /// List snapshots
    Snapshots,

    /// Show a snapshot
    Snapshot {
        id: RecordId,
    },

    /// Export a snapshot as CSV
    Export {
        id: RecordId,
        /// Output directory (default: [export] output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    /// Name of the user action, used in notifications
    fn action(&self) -> &'static str {
        match self {
            Commands::Login { .. } => "Login",
            Commands::Logout => "Logout",
            Commands::Overview => "Load overview",
            Commands::Exchanges => "Load exchanges",
            Commands::AddExchange { .. } => "Add exchange",
            Commands::Lists { .. } => "Load lists",
            Commands::CreateList { .. } => "Create list",
            Commands::ShowList { .. } => "Load list",
            Commands::Chains => "Load chains",
            Commands::Validate { .. } => "Validate address",
            Commands::Import { .. } => "Import",
            Commands::Query { .. } => "Reserve query",
            Commands::Snapshots => "Load snapshots",
            Commands::Snapshot { .. } => "Load snapshot",
            Commands::Export { .. } => "Export snapshot",
            Commands::Config { .. } => "Generate config",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The configured subscriber depends on the config, so warnings raised
    // while loading it go through a plain one
    let mut config = with_bootstrap_logging(std::io::stderr, || match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config {:?}", path)),
        None => Ok(Config::load_default()),
    })?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }

    init_logging(&config.logging);

    let action = cli.command.action();
    let store = SessionStore::new(config.session.file.clone());

    let result = match cli.command {
        Commands::Config { output } => write_config(output).map(Some),
        Commands::Login { username, password } => login(&config, &store, &username, password).await.map(Some),
        Commands::Logout => logout(&config, &store).map(Some),
        command => {
            let session = store.context();
            if SessionGuard::check(&session) == Access::RedirectToLogin {
                println!("Not logged in.");
                println!();
                println!("Log in first with:");
                println!("  por login --username <name>");
                return Ok(());
            }

            if store.take_tutorial()? {
                print_tutorial();
            }

            let dashboard = Dashboard {
                client: ApiClient::new(&config.api.base_url, session),
                config,
                today: Local::now().date_naive(),
            };
            dashboard.run(command).await
        }
    };

    match result {
        Ok(Some(notification)) => notification.emit(),
        Ok(None) => {}
        Err(e) => {
            let notification = Notification::from_error(action, &e);
            notification.emit();
            if notification.is_error() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Run `f` with a warn-level subscriber writing to `writer`
fn with_bootstrap_logging<W, T>(writer: W, f: impl FnOnce() -> T) -> T
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(writer)
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "por={level},por_dashboard={level}",
            level = config.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_tutorial() {
    println!("Welcome to the PoR dashboard.");
    println!();
    println!("  1. Create an exchange:        por add-exchange \"Acme\"");
    println!("  2. Create a list under it:    por create-list \"Hot wallets\"");
    println!("  3. Import wallets and tokens: por import <list-id> --wallet ethereum:0x...");
    println!("  4. Trigger a snapshot:        por query <list-id> [--date YYYY-MM-DD]");
    println!("  5. Export it as CSV:          por export <snapshot-id>");
    println!();
}

fn write_config(output: Option<PathBuf>) -> DashboardResult<Notification> {
    let config = generate_default_config();

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &config)?;
            Ok(Notification::success(format!("Config written to {:?}", path)))
        }
        None => {
            print!("{}", config);
            Ok(Notification::info("Default config printed"))
        }
    }
}

async fn login(
    config: &Config,
    store: &SessionStore,
    username: &str,
    password: Option<String>,
) -> DashboardResult<Notification> {
    let password = match password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    let mut client = ApiClient::new(&config.api.base_url, store.context());
    let token = client.login(username, &password).await?;
    store.store_token(&token)?;

    Ok(Notification::success(format!("Logged in as {}", username)))
}

fn logout(config: &Config, store: &SessionStore) -> DashboardResult<Notification> {
    let mut client = ApiClient::new(&config.api.base_url, store.context());
    client.logout();
    store.clear_token()?;

    Ok(Notification::success("Logged out"))
}

fn prompt(label: &str) -> std::io::Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Authenticated commands
struct Dashboard {
    client: ApiClient,
    config: Config,
    today: NaiveDate,
}

impl Dashboard {
    async fn registry(&self) -> DashboardResult<ChainRegistry> {
        match self.config.chains.source {
            ChainSourceKind::Static => Ok(ChainRegistry::builtin()),
            ChainSourceKind::Fetched => {
                let registry = ChainRegistry::fetched(self.client.chains().await?);
                for chain in registry.unmatched() {
                    tracing::warn!(%chain, "Backend chain has no address pattern, hidden");
                }
                Ok(registry)
            }
        }
    }

    fn metadata(&self) -> Box<dyn TokenMetadataProvider> {
        if self.config.metadata.enabled {
            Box::new(CoinGeckoClient::new(&self.config.metadata))
        } else {
            Box::new(NoMetadata)
        }
    }

    async fn catalog(&self, exchange: Option<&RecordId>) -> DashboardResult<Catalog> {
        let mut catalog = Catalog::load(&self.client).await?;
        if let Some(id) = exchange {
            if !catalog.set_active(id) {
                return Err(DashboardError::NotFound(format!("exchange {}", id)));
            }
        }
        Ok(catalog)
    }

    async fn run(&self, command: Commands) -> DashboardResult<Option<Notification>> {
        match command {
            Commands::Overview => {
                let overview = Overview::load(&self.client).await?;

                println!("Exchanges: {}", overview.exchanges);
                println!("Lists:     {}", overview.lists);
                println!("Snapshots: {}", overview.snapshots);
                println!();

                if overview.recent.is_empty() {
                    println!("No snapshots yet.");
                } else {
                    println!("Recent snapshots:");
                    println!("{:<10} {:<20} {:<28} {}", "ID", "Exchange", "Timestamp", "Wallets");
                    println!("{}", "-".repeat(68));
                    for s in &overview.recent {
                        println!("{:<10} {:<20} {:<28} {}", s.id, s.exchange, s.timestamp, s.wallets);
                    }
                }
                Ok(None)
            }

            Commands::Exchanges => {
                let catalog = self.catalog(None).await?;
                if catalog.exchanges().is_empty() {
                    println!("No exchanges yet.");
                    println!();
                    println!("Create one with:");
                    println!("  por add-exchange <name>");
                } else {
                    println!("{:<10} {}", "ID", "Name");
                    println!("{}", "-".repeat(40));
                    for exchange in catalog.exchanges() {
                        println!("{:<10} {}", exchange.id, exchange.name);
                    }
                }
                Ok(None)
            }

            Commands::AddExchange { name } => {
                let mut catalog = self.catalog(None).await?;
                let exchange = catalog.add_exchange(&self.client, &name).await?;
                Ok(Some(Notification::success(format!(
                    "Exchange {} created (id {})",
                    exchange.name, exchange.id
                ))))
            }

            Commands::Lists { exchange, all } => {
                let catalog = self.catalog(exchange.as_ref()).await?;
                let lists: Vec<_> = if all {
                    catalog.lists().iter().collect()
                } else {
                    if let Some(active) = catalog.active() {
                        println!("Exchange: {} ({})", active.name, active.id);
                        println!();
                    }
                    catalog.filtered_lists()
                };

                if lists.is_empty() {
                    println!("No lists.");
                } else {
                    println!("{:<10} {:<30} {:<10} {}", "ID", "Name", "Exchange", "Created");
                    println!("{}", "-".repeat(70));
                    for list in lists {
                        println!(
                            "{:<10} {:<30} {:<10} {}",
                            list.id,
                            list.name,
                            list.exchange_id,
                            list.created_at.as_deref().unwrap_or("-")
                        );
                    }
                }
                Ok(None)
            }

            Commands::CreateList { name, exchange } => {
                let mut catalog = self.catalog(exchange.as_ref()).await?;
                let list = catalog.add_list(&self.client, &name).await?;
                Ok(Some(Notification::success(format!(
                    "List {} created (id {})",
                    list.name, list.id
                ))))
            }

            Commands::ShowList { id } => {
                let detail = self.client.list_detail(&id).await?;
                print_list(&detail);
                Ok(None)
            }

            Commands::Chains => {
                let registry = self.registry().await?;
                println!("{:<14} {:<20} {:<7} {}", "Chain", "Name", "Tokens", "Sample address");
                println!("{}", "-".repeat(90));
                for info in registry.available() {
                    println!(
                        "{:<14} {:<20} {:<7} {}",
                        info.id,
                        info.display_name,
                        if info.supports_tokens { "yes" } else { "no" },
                        info.sample_address
                    );
                }

                let unmatched = registry.unmatched();
                if !unmatched.is_empty() {
                    println!();
                    println!("Enabled by the backend but not selectable: {}", unmatched.join(", "));
                }
                Ok(None)
            }

            Commands::Validate { chain, address } => {
                let registry = self.registry().await?;
                let info = registry.check(&chain, address.trim())?;
                Ok(Some(Notification::success(format!(
                    "{} is a valid {} address",
                    address.trim(),
                    info.display_name
                ))))
            }

            Commands::Import {
                list,
                file,
                wallet,
                dry_run,
            } => self.import(&list, file, &wallet, dry_run).await,

            Commands::Query {
                list,
                date,
                no_show,
            } => {
                let policy = self.config.dates.policy();
                let date = date.as_deref().map(|d| policy.format.parse(d)).transpose()?;

                let trigger = QueryTrigger::new(&self.client, policy);
                match trigger.query(&list, date, self.today).await? {
                    QueryOutcome::Snapshot(id) => {
                        let created = Notification::success(format!("Snapshot {} created", id));
                        if no_show {
                            return Ok(Some(created));
                        }
                        created.emit();
                        match snapshot::load_snapshot(&self.client, &id).await {
                            Ok(snapshot) => {
                                println!();
                                print!("{}", snapshot::render_snapshot(&snapshot));
                                Ok(None)
                            }
                            Err(e) => Ok(Some(Notification::from_error("Load snapshot", &e))),
                        }
                    }
                    QueryOutcome::Accepted => Ok(Some(Notification::success("Reserve query accepted"))),
                }
            }

            Commands::Snapshots => {
                let snapshots = snapshot::list_snapshots(&self.client).await?;
                if snapshots.is_empty() {
                    println!("No snapshots yet.");
                } else {
                    println!("{:<10} {:<20} {:<28} {}", "ID", "Exchange", "Timestamp", "Wallets");
                    println!("{}", "-".repeat(68));
                    for s in &snapshots {
                        println!(
                            "{:<10} {:<20} {:<28} {}",
                            s.snapshot_id,
                            s.exchange,
                            s.timestamp,
                            s.wallets.len()
                        );
                    }
                }
                Ok(None)
            }

            Commands::Snapshot { id } => {
                let snapshot = snapshot::load_snapshot(&self.client, &id).await?;
                print!("{}", snapshot::render_snapshot(&snapshot));
                Ok(None)
            }

            Commands::Export { id, output } => {
                let snapshot = snapshot::load_snapshot(&self.client, &id).await?;
                let dir = output.unwrap_or_else(|| self.config.export.output_dir.clone());
                let path = snapshot::write_csv(&snapshot, &dir, self.today)?;
                Ok(Some(Notification::success(format!("Exported to {:?}", path))))
            }

            Commands::Login { .. } | Commands::Logout | Commands::Config { .. } => Ok(None),
        }
    }

    async fn import(
        &self,
        list: &RecordId,
        file: Option<PathBuf>,
        wallets: &[String],
        dry_run: bool,
    ) -> DashboardResult<Option<Notification>> {
        let metadata = self.metadata();
        let mut draft = DraftList::new(self.registry().await?);

        if let Some(path) = file {
            let reader = std::fs::File::open(&path)?;
            let report = draft.load_csv(reader, metadata.as_ref()).await?;

            println!("Rows processed: {}", report.rows_processed);
            println!("Rows failed:    {}", report.rows_failed());
            if !report.errors.is_empty() {
                println!();
                println!("Errors (first 10):");
                for error in report.errors.iter().take(10) {
                    println!("  {}", error);
                }
            }
        }

        for spec in wallets {
            let (chain, address, tokens) = parse_wallet_spec(spec)?;
            let index = draft.add_wallet(Some(chain), address)?;
            for token in tokens {
                draft.add_token(index, token, metadata.as_ref()).await?;
            }
        }

        println!();
        println!("Draft:");
        for wallet in draft.wallets() {
            println!("  {} {} ({} tokens)", wallet.chain, wallet.address, wallet.tokens.len());
            for token in &wallet.tokens {
                let label = if token.symbol.is_empty() { "?" } else { token.symbol.as_str() };
                println!("    {:<8} {} ({} decimals)", label, token.address, token.decimals);
            }
        }
        println!();

        if dry_run {
            let request = draft.to_import_request(list);
            let body = serde_json::to_string_pretty(&request)
                .map_err(|e| DashboardError::Decode(e.to_string()))?;
            println!("{}", body);
            println!();
            println!("(Dry run - nothing was sent)");
            return Ok(None);
        }

        match draft.submit_import(list, &self.client).await? {
            ImportOutcome::Skipped => Ok(Some(Notification::info("Nothing to import"))),
            ImportOutcome::Imported { wallets, list: refetch } => {
                Notification::success(format!("Imported {} wallets into list {}", wallets, list))
                    .emit();
                // The import stands even when the list cannot be shown
                match refetch {
                    Ok(detail) => {
                        println!();
                        print_list(&detail);
                        Ok(None)
                    }
                    Err(e) => Ok(Some(Notification::from_error("Load list", &e))),
                }
            }
        }
    }
}

/// `CHAIN:ADDRESS[:TOKEN,...]`
fn parse_wallet_spec(spec: &str) -> Result<(&str, &str, Vec<&str>), ValidationError> {
    let mut parts = spec.splitn(3, ':');
    let chain = parts.next().unwrap_or_default().trim();
    let address = parts.next().unwrap_or_default().trim();
    if chain.is_empty() {
        return Err(ValidationError::ChainNotSelected);
    }
    if address.is_empty() {
        return Err(ValidationError::EmptyAddress);
    }

    let tokens = parts
        .next()
        .map(|tokens| {
            tokens
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok((chain, address, tokens))
}

fn print_list(detail: &ListDetail) {
    println!("{} (id {})", detail.name, detail.id);
    println!();

    if detail.wallets.is_empty() {
        println!("No wallets in this list yet.");
        return;
    }

    for wallet in &detail.wallets {
        let balance = if wallet.native_balance.is_empty() {
            "-".to_string()
        } else {
            format!("{} {}", wallet.native_balance, wallet.native_symbol)
        };
        println!("  {:<12} {:<48} {}", wallet.chain, wallet.address, balance);
        for token in &wallet.tokens {
            println!("    {:<8} {} {}", token.symbol, token.address, token.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_config_warnings_reach_stderr_before_init() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("config.toml");
        std::fs::write(&broken, "[dates\n").unwrap();

        let captured = Captured::default();
        let sink = captured.clone();
        with_bootstrap_logging(move || sink.clone(), || Config::load_first(&[broken.clone()]));

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Failed to load config"), "{}", output);
    }

    #[test]
    fn test_parse_wallet_spec() {
        assert_eq!(
            parse_wallet_spec("ethereum:0xabc").unwrap(),
            ("ethereum", "0xabc", Vec::new())
        );
        assert_eq!(
            parse_wallet_spec("ethereum:0xabc:0x1, 0x2").unwrap(),
            ("ethereum", "0xabc", vec!["0x1", "0x2"])
        );
        assert_eq!(
            parse_wallet_spec(":0xabc"),
            Err(ValidationError::ChainNotSelected)
        );
        assert_eq!(
            parse_wallet_spec("bitcoin"),
            Err(ValidationError::EmptyAddress)
        );
    }

    #[test]
    fn test_parse_query_command() {
        let cli = Cli::try_parse_from(["por", "query", "12", "--date", "2025-03-01"]).unwrap();
        match cli.command {
            Commands::Query {
                list,
                date,
                no_show,
            } => {
                assert_eq!(list, RecordId::from(12));
                assert_eq!(date.as_deref(), Some("2025-03-01"));
                assert!(!no_show);
            }
            _ => panic!("expected query"),
        }

        let cli = Cli::try_parse_from(["por", "query", "12", "--no-show"]).unwrap();
        assert!(matches!(cli.command, Commands::Query { no_show: true, .. }));
    }
}
