//! Scan Inventory - command line front end
//!
//! Opens the product database, then runs one command: scanning barcodes from
//! stdin, manual entry, listing/searching, editing, or exporting.

use clap::{Args as ClapArgs, Parser, Subcommand};
use scan_inventory::{
    CsvExporter, Inventory, InventoryConfig, LineBarcodeSource, Notice, Product, ProductEntry,
    ProductQuery, ProductStore, SearchProjection,
};
use std::path::PathBuf;
use tokio::io::AsyncBufReadExt;

/// Barcode inventory - reconcile scans into SQLite and export to spreadsheets
#[derive(Parser, Debug)]
#[command(name = "scan_inventory")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Directory export files are written to
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Quiet period in milliseconds before a live search query is issued
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Print products as JSON instead of a table
    #[arg(long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile every barcode read from stdin (one per line)
    Scan {
        /// Name given to barcodes not yet in the inventory
        #[arg(long, default_value = "Unnamed product")]
        name: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Add a product (or add its quantity to the line with the same barcode)
    Add {
        barcode: String,
        name: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Edit fields of an existing product
    Update {
        id: i64,
        #[arg(long)]
        barcode: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        quantity: Option<i64>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List products, newest first
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// Case-sensitive search over name and barcode
    Search { text: String },
    /// Live search: every stdin line replaces the query text
    Watch,
    /// List categories in use
    Categories,
    /// Show a product by id or barcode
    Show { key: String },
    /// Number of products
    Count,
    /// Delete a product by id
    Delete { id: i64 },
    /// Delete every product
    Clear {
        /// Confirm the irreversible delete
        #[arg(long)]
        yes: bool,
    },
    /// Export all products to a CSV file
    Export {
        /// File name (defaults to products_export_<timestamp>.csv)
        #[arg(long)]
        name: Option<String>,
    },
}

/// Optional product fields shared by `scan` and `add`
#[derive(ClapArgs, Debug, Clone)]
struct FieldArgs {
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    price: String,
    #[arg(long, default_value = "")]
    quantity: String,
    #[arg(long, default_value = "")]
    category: String,
    #[arg(long, default_value = "")]
    notes: String,
}

impl FieldArgs {
    fn entry(&self, barcode: &str, name: &str) -> ProductEntry {
        ProductEntry {
            barcode: barcode.to_string(),
            name: name.to_string(),
            description: self.description.clone(),
            price: self.price.clone(),
            quantity: self.quantity.clone(),
            category: self.category.clone(),
            notes: self.notes.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = InventoryConfig::with_overrides(
        args.database.clone(),
        args.export_dir.clone(),
        args.debounce_ms,
    );
    log::debug!("Configuration: {:?}", config);

    let store = match ProductStore::open(&config.database_path) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };
    let inventory = Inventory::new(store, CsvExporter::new(&config.export_dir));

    if let Err(e) = run(&args, &config, &inventory).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: &Args, config: &InventoryConfig, inventory: &Inventory) -> scan_inventory::Result<()> {
    let store = inventory.store();
    match &args.command {
        Command::Scan { name, fields } => {
            let template = fields.entry("", name);
            let mut source = LineBarcodeSource::stdin();
            log::info!("Reading barcodes from stdin, one per line (Ctrl-D to finish)");
            let processed = inventory
                .scan(&mut source, &template, |barcode, outcome| {
                    match &outcome.result {
                        Ok(r) if r.is_new() => println!("{} -> new product #{}", barcode, r.id()),
                        Ok(r) => println!("{} -> product #{} (+quantity)", barcode, r.id()),
                        Err(_) => eprintln!("{} -> {}", barcode, outcome.notice),
                    }
                })
                .await;
            println!("Processed {} barcodes", processed);
        }
        Command::Add {
            barcode,
            name,
            fields,
        } => {
            let outcome = inventory.add(&fields.entry(barcode, name)).await;
            report(&outcome.notice);
            let reconciliation = outcome.result?;
            if let Some(product) = store.get_by_id(reconciliation.id()).await? {
                print_products(args.json, &[product])?;
            }
        }
        Command::Update {
            id,
            barcode,
            name,
            description,
            price,
            quantity,
            category,
            notes,
        } => {
            let Some(mut product) = store.get_by_id(*id).await? else {
                println!("No product with id {}", id);
                return Ok(());
            };
            if let Some(v) = barcode {
                product.barcode = v.clone();
            }
            if let Some(v) = name {
                product.name = v.clone();
            }
            if let Some(v) = description {
                product.description = v.clone();
            }
            if let Some(v) = price {
                product.price = *v;
            }
            if let Some(v) = quantity {
                product.quantity = *v;
            }
            if let Some(v) = category {
                product.category = v.clone();
            }
            if let Some(v) = notes {
                product.notes = v.clone();
            }
            let outcome = inventory.update(product).await;
            report(&outcome.notice);
            outcome.result?;
        }
        Command::List { category } => {
            let query = match category {
                Some(category) => ProductQuery::Category(category.clone()),
                None => ProductQuery::All,
            };
            print_products(args.json, &store.fetch(query).await?)?;
        }
        Command::Search { text } => {
            let query = scan_inventory::query::query_for_text(text);
            print_products(args.json, &store.fetch(query).await?)?;
        }
        Command::Watch => watch(args.json, config, inventory).await?,
        Command::Categories => {
            let mut live = store.distinct_categories();
            if let Some(categories) = live.next().await {
                for category in categories? {
                    println!("{}", category);
                }
            }
            live.cancel();
        }
        Command::Show { key } => {
            let product = match key.parse::<i64>() {
                Ok(id) => match store.get_by_id(id).await? {
                    Some(p) => Some(p),
                    None => store.get_by_barcode(key).await?,
                },
                Err(_) => store.get_by_barcode(key).await?,
            };
            match product {
                Some(p) => print_products(args.json, &[p])?,
                None => println!("No product matches {}", key),
            }
        }
        Command::Count => println!("{}", store.count().await?),
        Command::Delete { id } => {
            let Some(product) = store.get_by_id(*id).await? else {
                println!("No product with id {}", id);
                return Ok(());
            };
            let outcome = inventory.delete(&product).await;
            report(&outcome.notice);
            outcome.result?;
        }
        Command::Clear { yes } => {
            if !yes {
                println!("Refusing to delete every product without --yes");
                return Ok(());
            }
            let outcome = inventory.clear().await;
            report(&outcome.notice);
            outcome.result?;
        }
        Command::Export { name } => {
            let outcome = inventory.export(name.clone()).await;
            report(&outcome.notice);
            outcome.result?;
        }
    }
    Ok(())
}

/// Live search until stdin closes or Ctrl-C
async fn watch(json: bool, config: &InventoryConfig, inventory: &Inventory) -> scan_inventory::Result<()> {
    let projection = SearchProjection::spawn(inventory.store().clone(), config.search_debounce);
    let mut results = projection.results();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    log::info!("Type to search; an empty line lists everything");

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(text) => projection.set_query(&text),
                None => break,
            },
            changed = results.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = results.borrow_and_update().clone();
                if let Some(error) = &current.error {
                    eprintln!("Search failed: {}", error);
                }
                println!("-- {:?}: {} products", current.query, current.products.len());
                print_products(json, &current.products)?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn report(notice: &Notice) {
    if notice.is_error() {
        eprintln!("{}", notice);
    } else {
        println!("{}", notice);
    }
}

fn print_products(json: bool, products: &[Product]) -> scan_inventory::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(products)?);
        return Ok(());
    }
    for p in products {
        println!(
            "#{:<5} {:<15} {:<30} qty {:<5} {:>9.2}  {:<12} {}",
            p.id,
            p.barcode,
            p.name,
            p.quantity,
            p.price,
            p.category,
            scan_inventory::export::format_timestamp(&p.timestamp)
        );
    }
    Ok(())
}
