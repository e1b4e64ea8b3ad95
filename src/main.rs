//! Collection DB - MTG collection correlation and sorting
//!
//! Builds a card database from collection exports and Scryfall bulk data, and
//! extracts, searches or sorts existing card databases.

use clap::{Args, Parser, Subcommand};
use collection_db::categorize::format_summary;
use collection_db::filter::parse_colors;
use collection_db::{
    correlate, save, CardDb, CardDbMeta, CardFilter, Categorizer, CorrelateOptions, DbKind, Group,
    ImportCollection, ImportIndex, ReadOptions, ReferenceFile, Result, SortOptions, TextFields,
};
use std::ops::ControlFlow;
use std::path::PathBuf;

/// MTG collection database - correlate, extract, search and sort owned cards
#[derive(Parser, Debug)]
#[command(name = "collection_db")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Correlate collection exports with the reference data into an inventory database
    Build(BuildArgs),
    /// Write the cards of a database that pass a filter to a new database
    Extract(ExtractArgs),
    /// Print the cards of a database that pass a filter
    Search(SearchArgs),
    /// Sort a database into format, rarity and colour buckets
    Sort(SortArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Scryfall bulk data file (JSON array of cards)
    #[arg(short, long)]
    reference: PathBuf,

    /// Owned collection exports
    #[arg(short, long, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Exports of cards currently sleeved in decks
    #[arg(long, num_args = 1..)]
    decks: Vec<PathBuf>,

    /// Exports of cards owned by other people
    #[arg(long, num_args = 1..)]
    external: Vec<PathBuf>,

    /// Exports of proxies
    #[arg(long, num_args = 1..)]
    proxy: Vec<PathBuf>,

    /// Read the whole reference file even after every owned card and reprint is seen
    #[arg(long, default_value_t = false)]
    full_pass: bool,

    /// Output card database
    #[arg(short, long, default_value_t = default_db_path("inventory.json"))]
    output: String,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Regular expression matched case-insensitively against card text fields
    pattern: Option<String>,

    /// Match the pattern against rules text
    #[arg(long, default_value_t = false)]
    text: bool,

    /// Match the pattern against type lines
    #[arg(long, default_value_t = false)]
    type_line: bool,

    /// Do not match the pattern against names
    #[arg(long, default_value_t = false)]
    no_name: bool,

    /// Allowed border colours
    #[arg(long, value_delimiter = ',')]
    border: Vec<String>,

    /// Colours the colour identity must contain, e.g. "UR"
    #[arg(long)]
    colors: Option<String>,

    /// Converted mana cost
    #[arg(long)]
    cmc: Option<f64>,

    /// Formats the card must be legal or restricted in
    #[arg(long, value_delimiter = ',')]
    legal: Vec<String>,

    /// Keyword patterns, each must match one of the card's keywords
    #[arg(long, value_delimiter = ',')]
    keyword: Vec<String>,

    /// Exact mana cost, e.g. "{1}{U}{U}"
    #[arg(long)]
    cost: Option<String>,

    /// Price constraint: "none", or an operator followed by a number, e.g. "<=2.5"
    #[arg(long)]
    price: Option<String>,

    /// Groups to leave out (decks, external, proxy)
    #[arg(long, value_delimiter = ',', value_parser = parse_group)]
    exclude: Vec<Group>,

    /// Only cards that are actually owned: leaves out every group
    #[arg(long, default_value_t = false)]
    exportable: bool,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Source card database
    #[arg(short, long, default_value_t = default_db_path("inventory.json"))]
    database: String,

    /// Extract the cards legal in this format into a format database
    #[arg(short, long)]
    format: Option<String>,

    #[command(flatten)]
    filter: FilterArgs,

    /// Output card database
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Card database to search
    #[arg(short, long, default_value_t = default_db_path("inventory.json"))]
    database: String,

    #[command(flatten)]
    filter: FilterArgs,
}

#[derive(Args, Debug)]
struct SortArgs {
    /// Card database to sort
    #[arg(short, long, default_value_t = default_db_path("inventory.json"))]
    database: String,

    /// Formats in priority order; a card goes to the first it is legal in
    #[arg(short, long, value_delimiter = ',')]
    formats: Vec<String>,

    /// Origin file names to check for merge conflicts against the rest
    #[arg(short, long, value_delimiter = ',')]
    marked: Vec<String>,

    /// Order cards by type before name
    #[arg(long, default_value_t = false)]
    by_type: bool,

    /// Output card database
    #[arg(short, long, default_value_t = default_db_path("category.json"))]
    output: String,
}

/// Returns the default database path: ~/.local/share/collection_db/<file_name>
fn default_db_path(file_name: &str) -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("collection_db")
        .join(file_name)
        .to_string_lossy()
        .to_string()
}

fn parse_group(s: &str) -> std::result::Result<Group, String> {
    Group::parse(s).ok_or_else(|| format!("unknown group '{s}' (expected decks, external or proxy)"))
}

impl FilterArgs {
    fn to_filter(&self) -> Result<CardFilter> {
        let mut filter = CardFilter::new()
            .with_formats(self.legal.iter().cloned())
            .with_keywords(self.keyword.as_slice())?;
        if let Some(pattern) = &self.pattern {
            let fields = TextFields {
                name: !self.no_name,
                text: self.text,
                type_line: self.type_line,
            };
            filter = filter.with_pattern(pattern, fields)?;
        }
        if !self.border.is_empty() {
            filter.border_colors = Some(self.border.iter().map(|b| b.to_lowercase()).collect());
        }
        if let Some(colors) = &self.colors {
            filter.color_identity = Some(parse_colors(colors)?);
        }
        filter.cmc = self.cmc;
        filter.mana_cost = self.cost.clone();
        filter.price = self.price.as_deref().map(str::parse).transpose()?;
        Ok(filter)
    }

    fn to_options(&self) -> Result<ReadOptions> {
        let mut options = ReadOptions::new().exportable(self.exportable);
        for group in &self.exclude {
            options = options.exclude_group(*group);
        }
        let filter = self.to_filter()?;
        if !filter.is_empty() {
            options = options.with_filter(filter);
        }
        Ok(options)
    }
}

fn run_build(args: BuildArgs) -> Result<()> {
    let mut collection = ImportCollection::new();
    for path in &args.input {
        collection.push(ImportIndex::from_path(path)?);
    }
    for (paths, group) in [
        (&args.decks, Group::Decks),
        (&args.external, Group::External),
        (&args.proxy, Group::Proxy),
    ] {
        for path in paths {
            collection.import_group(path, group)?;
        }
    }
    log::info!(
        "Imported {} copies from {} files",
        collection.total_quantity(),
        collection.origins().len()
    );

    let options = CorrelateOptions {
        stop_when_consumed: !args.full_pass,
    };
    let report = correlate(&ReferenceFile::new(&args.reference), &mut collection, &options)?;
    if !report.unmatched.is_empty() {
        log::warn!(
            "{} records could not be matched to the reference data",
            report.unmatched.len()
        );
    }

    let meta = CardDbMeta::new(DbKind::Inventory, None, collection.groups().clone());
    save(&args.output, &report.cards, &meta)
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    let db = CardDb::load(&args.database)?;
    let mut options = args.filter.to_options()?;
    if let Some(format) = &args.format {
        let filter = options.filter.take().unwrap_or_default();
        let mut formats = filter.formats.clone();
        formats.push(format.clone());
        options = options.with_filter(filter.with_formats(formats));
    }

    let cards = db.collect(&options)?;
    let kind = if args.format.is_some() {
        DbKind::Format
    } else {
        db.meta().kind
    };
    let format = args.format.clone().or_else(|| db.meta().format.clone());
    let meta = CardDbMeta::new(kind, format, db.meta().groups.clone());
    save(&args.output, &cards, &meta)
}

fn run_search(args: SearchArgs) -> Result<()> {
    let db = CardDb::load(&args.database)?;
    let options = args.filter.to_options()?;
    let mut count = 0usize;
    db.for_each(&options, |card| {
        count += 1;
        let price = card
            .price()
            .map(|p| format!("{p:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>3}x {} [{} #{}] {} {} ({})",
            card.quantity,
            card.name(),
            card.card.set.to_uppercase(),
            card.card.collector_number,
            card.variant.finish,
            price,
            card.origin
        );
        Ok(ControlFlow::Continue(()))
    })?;
    println!("{count} matching cards");
    Ok(())
}

fn run_sort(args: SortArgs) -> Result<()> {
    let db = CardDb::load(&args.database)?;
    let groups = db.meta().groups.clone();
    let cards = db.get_all()?;

    let buckets = Categorizer::new(args.formats.iter().cloned())
        .with_groups(groups.clone())
        .with_marked(args.marked.iter().cloned())
        .with_sort(SortOptions {
            by_type: args.by_type,
        })
        .categorize(cards);
    print!("{}", format_summary(&buckets));

    let cards = collection_db::categorize::into_cards(buckets);
    let meta = CardDbMeta::new(DbKind::Category, None, groups);
    save(&args.output, &cards, &meta)
}

fn main() {
    // Initialize logger. Set RUST_LOG environment variable to control log level.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Build(args) => run_build(args),
        Command::Extract(args) => run_extract(args),
        Command::Search(args) => run_search(args),
        Command::Sort(args) => run_sort(args),
    };

    if let Err(e) = result {
        log::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
