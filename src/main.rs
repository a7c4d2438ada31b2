use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use stylist::prelude::*;
use stylist::CATALOG_ARTIFACT;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Fashion recommendation and body shape advice
#[derive(Parser, Debug)]
#[command(name = "stylist")]
#[command(about = "Retrieval-augmented fashion recommendations", long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Product catalog CSV
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Customer events CSV
    #[arg(long, global = true)]
    events: Option<PathBuf>,

    /// Customer demographics CSV
    #[arg(long, global = true)]
    customers: Option<PathBuf>,

    /// Advice table CSV, replacing the built-in advice
    #[arg(long, global = true)]
    advice: Option<PathBuf>,

    /// Directory holding embedding artifacts
    #[arg(long, global = true)]
    artifacts_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct Measurements {
    #[arg(long)]
    gender: Gender,
    #[arg(long)]
    shoulder: f64,
    /// Bust for women, chest for men
    #[arg(long, alias = "chest")]
    bust: f64,
    #[arg(long)]
    waist: f64,
    #[arg(long)]
    hips: f64,
}

impl Measurements {
    fn to_body(&self) -> BodyMeasurements {
        BodyMeasurements::new(self.gender, self.shoulder, self.bust, self.waist, self.hips)
    }
}

#[derive(ClapArgs, Debug)]
struct Filters {
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    #[arg(long)]
    category: Option<String>,
}

impl Filters {
    fn to_filter(&self) -> ProductFilter {
        let filter = ProductFilter::new().price_range(self.min_price, self.max_price);
        match &self.category {
            Some(category) => filter.category(category.clone()),
            None => filter,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank products for a text query and/or a customer
    Recommend {
        #[arg(short, long)]
        query: Option<String>,
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        gender: Option<Gender>,
        #[command(flatten)]
        filters: Filters,
        #[arg(short, default_value_t = 10)]
        k: usize,
    },
    /// Classify body shape from measurements
    Classify {
        #[command(flatten)]
        measurements: Measurements,
    },
    /// Print the advice record for a shape
    Advice {
        #[arg(long)]
        gender: Gender,
        #[arg(long)]
        shape: ShapeLabel,
    },
    /// Classify, look up advice and recommend matching products
    ShopTheLook {
        #[command(flatten)]
        measurements: Measurements,
        #[arg(long)]
        customer: Option<String>,
        #[command(flatten)]
        filters: Filters,
        #[arg(short, default_value_t = 10)]
        k: usize,
    },
    /// Top products by trend score
    Trending {
        #[arg(long)]
        gender: Option<Gender>,
        #[arg(short, default_value_t = 10)]
        k: usize,
    },
    /// Top products by discount
    Discounted {
        #[arg(long)]
        gender: Option<Gender>,
        #[arg(short, default_value_t = 10)]
        k: usize,
    },
    /// Aggregate a customer's profile from the event tables
    Profile {
        #[arg(long)]
        customer: String,
    },
    /// Embed the catalog and write the artifacts
    BuildIndex,
    /// List the artifacts in --artifacts-dir
    Artifacts,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries the JSON output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting stylist v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => StylistConfig::from_json_path(path)?,
        None => StylistConfig::default(),
    };
    let data = &mut config.data;
    data.catalog = args.catalog.or(data.catalog.take());
    data.events = args.events.or(data.events.take());
    data.customers = args.customers.or(data.customers.take());
    data.advice = args.advice.or(data.advice.take());
    data.artifacts_dir = args.artifacts_dir.or(data.artifacts_dir.take());

    let stylist = Stylist::open(&config).context("failed to initialise stylist")?;

    match args.command {
        Command::Recommend {
            query,
            customer,
            gender,
            filters,
            k,
        } => {
            let request = Query {
                text: query,
                customer_id: customer,
                filters: filters.to_filter(),
                gender,
            };
            print_json(&stylist.recommend(&request, k)?)
        }
        Command::Classify { measurements } => print_json(&stylist.classify(&measurements.to_body())?),
        Command::Advice { gender, shape } => print_json(stylist.advice(shape, gender)?),
        Command::ShopTheLook {
            measurements,
            customer,
            filters,
            k,
        } => {
            let look = stylist.shop_the_look(&measurements.to_body(), filters.to_filter(), customer.as_deref(), k)?;
            print_json(&look)
        }
        Command::Trending { gender, k } => print_json(&stylist.trending(k, gender)),
        Command::Discounted { gender, k } => print_json(&stylist.discounted(k, gender)),
        Command::Profile { customer } => print_json(&stylist.profile(&customer)),
        Command::BuildIndex => {
            let dir = config
                .data
                .artifacts_dir
                .as_ref()
                .context("build-index needs --artifacts-dir")?;
            anyhow::ensure!(!stylist.catalog().is_empty(), "build-index needs a non-empty --catalog");
            let store = ArtifactStore::new(dir)?;
            let description = stylist.save_artifacts(&store)?;
            info!(name = CATALOG_ARTIFACT, dir = %dir.display(), "Index artifacts written");
            print_json(&description)
        }
        Command::Artifacts => {
            let dir = config
                .data
                .artifacts_dir
                .as_ref()
                .context("artifacts needs --artifacts-dir")?;
            let store = ArtifactStore::new(dir)?;
            print_json(&stylist.list_artifacts(&store)?)
        }
    }
}
