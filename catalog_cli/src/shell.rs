//! Interactive shell over one long-lived cache store
//!
//! Unlike the one-shot subcommands, the shell keeps the store alive between
//! reads, so freshness, coalescing, and optimistic updates are observable:
//! a second `list` within the freshness window never touches the network,
//! `edit` shows the optimistic value immediately, and `focus` simulates the
//! window regaining focus.

use anyhow::{Context, Result};
use catalog_client_core::{FocusSignal, ProductPatch, RevalidationTrigger};
use colored::Colorize;
use dialoguer::Input;

use crate::output::{self, OutputFormat};
use crate::{App, auth};

pub async fn run(app: &App) -> Result<()> {
    auth::require_session(&app.session)?;

    let focus = FocusSignal::new();
    let _trigger = RevalidationTrigger::bind(&focus, app.queries.clone());

    println!("Catalog shell. Type 'help' for commands, 'quit' to leave.");
    loop {
        let line: String = Input::new()
            .with_prompt("catalog")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read command")?;

        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        let result = match command {
            "quit" | "exit" => break,
            "help" => {
                print_help();
                Ok(())
            }
            "list" => list(app, args.first().copied()).await,
            "show" => show(app, &args).await,
            "edit" => edit(app, &args).await,
            "delete" => delete(app, &args).await,
            "categories" => categories(app).await,
            "refresh" => refresh(app).await,
            "focus" => {
                focus.emit();
                println!("Focus event sent; active reads are revalidating in the background.");
                tokio::task::yield_now().await;
                Ok(())
            }
            "stats" => {
                let stats = app.store.stats();
                println!(
                    "hits: {}  misses: {}  entries: {}",
                    stats.hit_count, stats.miss_count, stats.entry_count
                );
                Ok(())
            }
            other => {
                println!("Unknown command '{other}'. Type 'help' for commands.");
                Ok(())
            }
        };

        if let Err(error) = result {
            eprintln!("{}: {error:#}", "Error".red());
        }
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  list [category]          List products, optionally filtered");
    println!("  show <id>                Show one product");
    println!("  edit <id> <field> <value>  Edit title, price, description, or category");
    println!("  delete <id>              Delete a product");
    println!("  categories               List categories");
    println!("  refresh                  Mark everything stale and reload the list");
    println!("  focus                    Simulate the window regaining focus");
    println!("  stats                    Show cache hit/miss counters");
    println!("  quit                     Leave the shell");
}

async fn list(app: &App, category: Option<&str>) -> Result<()> {
    let snapshot = app.queries.products(app.config.query_options()).await;
    if let Some(message) = &snapshot.error {
        eprintln!("{}: {message} (showing last known data)", "Warning".yellow());
    }
    let Some(products) = snapshot.products() else {
        anyhow::bail!("Could not load products");
    };
    let filtered: Vec<_> = products
        .iter()
        .filter(|product| category.is_none_or(|c| product.category.eq_ignore_ascii_case(c)))
        .cloned()
        .collect();
    output::print_products(&filtered, OutputFormat::Text)
}

async fn show(app: &App, args: &[&str]) -> Result<()> {
    let id = parse_id(args.first())?;
    let snapshot = app.queries.product(id, app.config.query_options()).await;
    match snapshot.product() {
        Some(product) => output::print_product(product, OutputFormat::Text),
        None => anyhow::bail!(
            "Could not load product {id}: {}",
            snapshot.error.as_deref().unwrap_or("not found")
        ),
    }
}

async fn edit(app: &App, args: &[&str]) -> Result<()> {
    let id = parse_id(args.first())?;
    if args.len() < 3 {
        anyhow::bail!("Usage: edit <id> <field> <value>");
    }
    let field = args[1];
    let value = args[2..].join(" ");

    let mut patch = ProductPatch::default();
    match field {
        "title" => patch.title = Some(value),
        "price" => {
            patch.price = Some(value.parse().context("price must be a number")?);
        }
        "description" => patch.description = Some(value),
        "category" => patch.category = Some(value),
        other => anyhow::bail!("Unknown field '{other}'; use title, price, description, or category"),
    }
    if let Err(reason) = patch.validate() {
        anyhow::bail!("Invalid edit: {reason}");
    }

    let confirmed = app.mutations.update_product(id, patch).await?;
    println!("✓ Updated product {id}");
    output::print_product(&confirmed, OutputFormat::Text)
}

async fn delete(app: &App, args: &[&str]) -> Result<()> {
    let id = parse_id(args.first())?;
    let ack = app.mutations.delete_product(id).await?;
    println!("✓ Deleted product {}", ack.id);
    Ok(())
}

async fn categories(app: &App) -> Result<()> {
    let snapshot = app.queries.categories(app.config.query_options()).await;
    match snapshot.categories() {
        Some(categories) => output::print_categories(categories, OutputFormat::Text),
        None => anyhow::bail!(
            "Could not load categories: {}",
            snapshot.error.as_deref().unwrap_or("no data")
        ),
    }
}

async fn refresh(app: &App) -> Result<()> {
    crate::refresh_all(app).await?;
    println!("✓ Reloaded");
    Ok(())
}

fn parse_id(arg: Option<&&str>) -> Result<u64> {
    arg.context("Missing product id")?
        .parse()
        .context("Product id must be a number")
}
