use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Result};
use catalog_core::{
    config::{load_settings, load_settings_from},
    Catalog, ProductDetailView, ProductListView, StreamEvent, Subscription,
};
use clap::Parser;
use shared::{
    domain::ProductId,
    protocol::{Product, Supplier},
};
use tokio::time::timeout;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Browse the product catalog through the reactive catalog pipeline")]
struct Args {
    /// Catalog API base URL; overrides the settings file and environment.
    #[arg(long)]
    base_url: Option<String>,
    /// Settings file; defaults to `catalog.toml` in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Product id to select and show details for.
    #[arg(long)]
    select: Option<i64>,
    /// Number of placeholder products to add to the local product list.
    #[arg(long, default_value_t = 0)]
    add_placeholders: usize,
    #[arg(long, default_value_t = 10)]
    wait_secs: u64,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => load_settings_from(path, |key| std::env::var(key).ok())?,
        None => load_settings()?,
    };
    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    let wait = Duration::from_secs(args.wait_secs);

    let catalog = Catalog::connect(&settings)?;
    let list = ProductListView::new(&catalog);
    let detail = ProductDetailView::new(&catalog);

    let products = wait_for(list.products(), wait, |_| true).await?;
    if let Some(error) = list.last_error() {
        eprintln!("error: {error}");
    }
    print_products(list.page_title(), &products, args.json)?;

    if let Some(id) = args.select {
        let product_id = ProductId(id);
        if products.iter().any(|product| product.id == product_id) {
            let suppliers = detail.suppliers();
            list.on_selected(product_id);

            let product = wait_for(detail.product(), wait, |product| {
                product.as_ref().map(|product| product.id) == Some(product_id)
            })
            .await?;
            let title = wait_for(detail.page_title(), wait, Option::is_some).await?;
            let suppliers = wait_for(suppliers, wait, |_| true).await?;
            print_detail(title.as_deref(), product.as_ref(), &suppliers, args.json)?;
            if let Some(error) = detail.last_error() {
                eprintln!("error: {error}");
            }
        } else {
            println!("No product with id {product_id}");
        }
    }

    if args.add_placeholders > 0 {
        let merged = list.products_with_additions();
        let snapshot = wait_for(merged, wait, |items| items.len() == products.len()).await?;
        info!(count = args.add_placeholders, "adding placeholder products");
        let merged = list.products_with_additions();
        for _ in 0..args.add_placeholders {
            list.add_product(None);
        }
        let expected = snapshot.len() + args.add_placeholders;
        let merged = wait_for(merged, wait, |items| items.len() == expected).await?;
        print_products("Products (with local additions)", &merged, args.json)?;
    }

    Ok(())
}

async fn wait_for<T: Clone>(
    mut subscription: Subscription<T>,
    wait: Duration,
    matches: impl Fn(&T) -> bool,
) -> Result<T> {
    timeout(wait, async move {
        while let Some(event) = subscription.next().await {
            if let StreamEvent::Next(value) = event {
                if matches(&value) {
                    return Ok(value);
                }
            }
        }
        Err(anyhow!("catalog stream ended before the expected data arrived"))
    })
    .await
    .map_err(|_| anyhow!("timed out after {}s waiting for catalog data", wait.as_secs()))?
}

fn print_products(title: &str, products: &[Product], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(products)?);
        return Ok(());
    }

    println!("{title}");
    println!(
        "{:>4}  {:<10}  {:<24}  {:<10}  {:>8}  {:>5}",
        "id", "code", "name", "category", "price", "stock"
    );
    for product in products {
        println!(
            "{:>4}  {:<10}  {:<24}  {:<10}  {:>8.2}  {:>5}",
            product.id,
            product.product_code,
            product.product_name,
            product.category.as_deref().unwrap_or("-"),
            product.price.unwrap_or_default(),
            product.quantity_in_stock
        );
    }
    Ok(())
}

fn print_detail(
    title: Option<&str>,
    product: Option<&Product>,
    suppliers: &[Supplier],
    json: bool,
) -> Result<()> {
    if json {
        let view = serde_json::json!({
            "pageTitle": title,
            "product": product,
            "suppliers": suppliers,
        });
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!();
    println!("{}", title.unwrap_or("No product selected"));
    if let Some(product) = product {
        println!("  code:        {}", product.product_code);
        println!("  description: {}", product.description);
        println!("  category:    {}", product.category.as_deref().unwrap_or("-"));
        println!("  price:       {:.2}", product.price.unwrap_or_default());
        println!("  in stock:    {}", product.quantity_in_stock);
    }
    if suppliers.is_empty() {
        println!("  suppliers:   none");
    } else {
        println!("  suppliers:");
        for supplier in suppliers {
            println!(
                "    {:>3}  {:<24}  cost {:>6}  min qty {:>4}",
                supplier.id,
                supplier.name,
                supplier
                    .cost
                    .map(|cost| format!("{cost:.2}"))
                    .unwrap_or_else(|| "-".into()),
                supplier
                    .min_quantity
                    .map(|quantity| quantity.to_string())
                    .unwrap_or_else(|| "-".into())
            );
        }
    }
    Ok(())
}
