use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

mod auth;
mod config;
mod output;
mod paths;
mod shell;

use crate::config::AppConfig;
use crate::output::OutputFormat;
use catalog_client_core::{
    CacheStore, CatalogApi, HttpCatalogApi, KeyScope, MutationController, Product, ProductPatch,
    QueryController, SessionStore, session::SESSION_FILE,
};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(author, version, about = "Product catalog manager", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to the configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to the catalog
    Login,

    /// Log out and clear the session
    Logout,

    /// Show session status
    Status,

    /// List products
    List {
        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Products per page
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one product
    Show {
        id: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Edit a product
    Edit {
        id: u64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        price: Option<f64>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Delete a product
    Delete {
        id: u64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List product categories
    Categories {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Interactive session with a live cache
    Shell,
}

/// Application context: one cache store and its controllers, created at
/// startup and dropped with the process
pub struct App {
    pub config: AppConfig,
    pub session: SessionStore,
    pub store: Arc<CacheStore>,
    pub queries: Arc<QueryController>,
    pub mutations: Arc<MutationController>,
}

impl App {
    fn new(config: AppConfig) -> Result<Self> {
        let api: Arc<dyn CatalogApi> = Arc::new(
            HttpCatalogApi::new(config.api_config()).context("failed to build HTTP client")?,
        );
        let store = Arc::new(CacheStore::new(config.cache_policy()));
        let queries = Arc::new(QueryController::new(store.clone(), api.clone()));
        let mutations = Arc::new(MutationController::with_settings(
            store.clone(),
            api,
            config.mutation_settings(),
        ));
        let session = SessionStore::new(paths::data_dir().join(SESSION_FILE));
        Ok(Self {
            config,
            session,
            store,
            queries,
            mutations,
        })
    }
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{}: {error:#}", "Error".red());
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config_path = cli.config.unwrap_or_else(paths::config_path);
    let config = config::load_config(&config_path)?;
    let app = App::new(config)?;

    match cli.command {
        Commands::Login => auth::login(&app.session, &app.config.credentials()),
        Commands::Logout => auth::logout(&app.session),
        Commands::Status => auth::status(&app.session),
        Commands::List {
            category,
            page,
            limit,
            format,
        } => {
            auth::require_session(&app.session)?;
            let snapshot = app.queries.products(app.config.query_options()).await;
            if let Some(message) = &snapshot.error {
                eprintln!("{}: {message} (re-run to retry)", "Warning".yellow());
            }
            match snapshot.products() {
                Some(products) => {
                    let page = page_of(products, category.as_deref(), page, limit);
                    output::print_products(&page, format)
                }
                None => bail!("Could not load products"),
            }
        }
        Commands::Show { id, format } => {
            auth::require_session(&app.session)?;
            let snapshot = app.queries.product(id, app.config.query_options()).await;
            match snapshot.product() {
                Some(product) => output::print_product(product, format),
                None => bail!(
                    "Could not load product {id}: {}",
                    snapshot.error.as_deref().unwrap_or("not found")
                ),
            }
        }
        Commands::Edit {
            id,
            title,
            price,
            description,
            category,
        } => {
            auth::require_session(&app.session)?;
            let patch = ProductPatch {
                title,
                price,
                description,
                category,
            };
            if patch.is_empty() {
                bail!("Nothing to change; pass at least one of --title/--price/--description/--category");
            }
            if let Err(reason) = patch.validate() {
                bail!("Invalid edit: {reason}");
            }
            let confirmed = app.mutations.update_product(id, patch).await?;
            println!("✓ Updated product {id}");
            output::print_product(&confirmed, OutputFormat::Text)
        }
        Commands::Delete { id, yes } => {
            auth::require_session(&app.session)?;
            if !yes {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete product {id}?"))
                    .default(false)
                    .interact()
                    .context("Failed to read confirmation")?;
                if !confirmed {
                    println!("Aborted.");
                    return Ok(());
                }
            }
            let ack = app.mutations.delete_product(id).await?;
            println!("✓ Deleted product {}", ack.id);
            Ok(())
        }
        Commands::Categories { format } => {
            auth::require_session(&app.session)?;
            let snapshot = app.queries.categories(app.config.query_options()).await;
            match snapshot.categories() {
                Some(categories) => output::print_categories(categories, format),
                None => bail!(
                    "Could not load categories: {}",
                    snapshot.error.as_deref().unwrap_or("no data")
                ),
            }
        }
        Commands::Shell => shell::run(&app).await,
    }
}

/// Client-side category filter and pagination over the cached list
fn page_of(products: &[Product], category: Option<&str>, page: usize, limit: usize) -> Vec<Product> {
    let limit = limit.max(1);
    let filtered: Vec<&Product> = products
        .iter()
        .filter(|product| category.is_none_or(|c| product.category.eq_ignore_ascii_case(c)))
        .collect();
    let start = page.saturating_sub(1).saturating_mul(limit);
    filtered
        .into_iter()
        .skip(start)
        .take(limit)
        .cloned()
        .collect()
}

/// Invalidate everything and re-read the product list
pub async fn refresh_all(app: &App) -> Result<()> {
    app.store.invalidate(KeyScope::All);
    let snapshot = app.queries.products(app.config.query_options()).await;
    match &snapshot.error {
        Some(message) => bail!("Refresh failed: {message}"),
        None => Ok(()),
    }
}
