//! Output formatting for catalog data

use catalog_client_core::Product;
use clap::ValueEnum;
use colored::Colorize;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Print a product list
pub fn print_products(products: &[Product], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(products)?);
        }
        OutputFormat::Text => {
            if products.is_empty() {
                println!("No products.");
                return Ok(());
            }
            println!(
                "{:>5}  {:<40}  {:>10}  {:<18}",
                "ID".bold(),
                "Title".bold(),
                "Price".bold(),
                "Category".bold()
            );
            for product in products {
                println!(
                    "{:>5}  {:<40}  {:>10}  {:<18}",
                    product.id,
                    truncate(&product.title, 40),
                    format!("{:.2}", product.price).green(),
                    product.category
                );
            }
        }
    }
    Ok(())
}

/// Print a single product in full
pub fn print_product(product: &Product, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(product)?);
        }
        OutputFormat::Text => {
            println!("{} #{}", product.title.bold(), product.id);
            println!("  {}: {}", "Price".bold(), format!("{:.2}", product.price).green());
            println!("  {}: {}", "Category".bold(), product.category);
            println!(
                "  {}: {:.1} ({} ratings)",
                "Rating".bold(),
                product.rating.rate,
                product.rating.count
            );
            println!("  {}: {}", "Image".bold(), product.image);
            println!("  {}", product.description);
        }
    }
    Ok(())
}

/// Print the category names
pub fn print_categories(categories: &[String], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(categories)?);
        }
        OutputFormat::Text => {
            for category in categories {
                println!("• {category}");
            }
        }
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
