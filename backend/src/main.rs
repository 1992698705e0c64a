//! nftmint CLI - prepare HIP-412 metadata and mint it in batches
//!
//! ```bash
//! nftmint create collection.csv -o out/ --layout layout.json   # CSV -> 1.json, 2.json, ...
//! nftmint create collection.csv -a color -a power              # Attribute columns inline
//! nftmint validate out/                                        # Check metadata files
//! nftmint mint --token-id 0.0.1234 --uris uris.csv             # Mint one token per URI
//! nftmint mint --token-id 0.0.1234 --metadata ipfs://m --amount 50 --dry-run
//! nftmint serve --port 3000                                    # Start HTTP server
//! ```
//!
//! Defaults come from the environment (`NFTMINT_*`, `.env`); flags override.
//! Progress is logged to stderr, controlled with `RUST_LOG`.

use clap::{Args, Parser, Subcommand};
use nftmint::{
    api::AppState, create_metadata_from_rows, mint_batched, read_metadata_files, validate_many,
    CreateMetadataOptions, DryRunMinter, HeaderLayout, HttpMinter, MetadataSource, MintConfig,
    MintItem, MintReport, MintRequest, MintSource, MintSummary, Settings,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nftmint")]
#[command(about = "Prepare HIP-412 NFT metadata from CSV and mint it in batches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a metadata CSV into one HIP-412 JSON file per row
    Create {
        /// Input CSV file
        input: PathBuf,

        /// Output directory (default: NFTMINT_OUTPUT_DIR)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum number of rows to read
        #[arg(short, long)]
        limit: Option<usize>,

        /// Header layout JSON (attribute and property columns)
        #[arg(long)]
        layout: Option<PathBuf>,

        /// Attribute column (repeatable), added to --layout. Without either,
        /// rows produce no attributes
        #[arg(short, long = "attribute")]
        attributes: Vec<String>,

        /// Write the JSON report to a file (default: stdout)
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Validate metadata JSON files, or every *.json in a directory
    Validate {
        /// Files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Attribute trait type every object must carry (repeatable)
        #[arg(short, long = "attribute")]
        attributes: Vec<String>,
    },

    /// Mint tokens in batches
    Mint(MintArgs),

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: NFTMINT_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Default header layout for uploads
        #[arg(long)]
        layout: Option<PathBuf>,
    },
}

#[derive(Args)]
struct MintArgs {
    /// Token (collection) id, e.g. 0.0.1234
    #[arg(long)]
    token_id: String,

    /// Supply key (default: NFTMINT_SUPPLY_KEY)
    #[arg(long)]
    supply_key: Option<String>,

    /// Items per batch (default: NFTMINT_BATCH_SIZE)
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Mint service URL (default: NFTMINT_ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,

    /// Shared metadata for every token
    #[arg(long, requires = "amount", conflicts_with_all = ["uris", "items"])]
    metadata: Option<String>,

    /// Number of tokens to mint with the shared metadata
    #[arg(long, requires = "metadata")]
    amount: Option<usize>,

    /// File of metadata URIs, one token per URI
    #[arg(long, conflicts_with = "items")]
    uris: Option<PathBuf>,

    /// Maximum number of URIs to read from --uris
    #[arg(long, requires = "uris")]
    limit: Option<usize>,

    /// Metadata for one token (repeatable)
    #[arg(long = "item")]
    items: Vec<String>,

    /// Assign serials locally instead of calling the mint service
    #[arg(long)]
    dry_run: bool,

    /// Write minted serials to a file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match Settings::from_env() {
        Ok(settings) => match cli.command {
            Commands::Create {
                input,
                output,
                limit,
                layout,
                attributes,
                report,
            } => cmd_create(
                &input,
                output.unwrap_or_else(|| settings.output_dir.clone()),
                limit,
                layout.as_deref(),
                attributes,
                report.as_deref(),
            ),

            Commands::Validate { inputs, attributes } => cmd_validate(&inputs, &attributes),

            Commands::Mint(args) => cmd_mint(args, &settings).await,

            Commands::Serve { port, layout } => {
                cmd_serve(port.unwrap_or(settings.port), layout.as_deref(), &settings).await
            }
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_layout(path: Option<&Path>) -> Result<HeaderLayout, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(p) => HeaderLayout::load(p)?,
        None => HeaderLayout::default(),
    })
}

fn cmd_create(
    input: &Path,
    output: PathBuf,
    limit: Option<usize>,
    layout: Option<&Path>,
    attributes: Vec<String>,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let options = CreateMetadataOptions::new(MetadataSource::File(input.to_path_buf()), output)
        .with_limit(limit)
        .with_layout(load_layout(layout)?.with_attributes(attributes));
    let report = create_metadata_from_rows(options)?;

    eprintln!("\n📊 Results:");
    eprintln!("   Written: {} files to {}", report.written, report.destination.display());
    eprintln!("   Invalid objects: {}", report.errors.validation_errors.len());
    eprintln!("   Missing attributes: {}", report.errors.missing_attribute_errors.len());
    for error in report.errors.validation_errors.iter().take(5) {
        eprintln!("\n   Object {}:", error.index);
        for kind in &error.errors.general {
            eprintln!("     - {}", kind);
        }
    }
    for failure in &report.conversion_failures {
        eprintln!("   ⚠️  line {}: {}", failure.line, failure.message);
    }
    for failure in &report.persistence_failures {
        eprintln!("   ⚠️  {}: {}", failure.path.display(), failure.message);
    }

    write_output(&serde_json::to_string_pretty(&report)?, report_path)?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_validate(inputs: &[PathBuf], attributes: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let files = read_metadata_files(inputs)?;
    eprintln!("✔️  Validating {} files", files.len());

    let objects: Vec<_> = files.iter().map(|(_, object)| object.clone()).collect();
    let report = validate_many(&objects, attributes);

    for error in report.metadata_objects_validation_errors.iter().take(5) {
        eprintln!("\n❌ {} invalid:", files[error.index].0.display());
        for kind in &error.errors.general {
            eprintln!("   - {}", kind);
        }
        for detail in error.errors.details.iter().take(3) {
            eprintln!("     {}", detail);
        }
    }
    for missing in report.missing_attributes_errors.iter().take(5) {
        eprintln!("⚠️  {}", missing);
    }

    let invalid = report.metadata_objects_validation_errors.len();
    eprintln!(
        "\n📊 Results: {} valid, {} invalid, {} missing attributes",
        files.len() - invalid,
        invalid,
        report.missing_attributes_errors.len()
    );

    if !report.is_clean() {
        return Err(format!("{} of {} files have problems", invalid, files.len()).into());
    }
    Ok(())
}

async fn cmd_mint(args: MintArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let supply_key = args
        .supply_key
        .or_else(|| settings.supply_key.clone())
        .unwrap_or_default();
    let config = MintConfig::new(
        args.token_id,
        supply_key,
        args.batch_size.unwrap_or(settings.batch_size),
    )?;

    let source = match (args.metadata, args.amount, args.uris) {
        (Some(metadata), Some(amount), _) => MintSource::Shared { metadata, amount },
        (_, _, Some(path)) => MintSource::UriFile {
            path,
            limit: args.limit,
        },
        _ if !args.items.is_empty() => {
            MintSource::Unique(args.items.into_iter().map(MintItem::from).collect())
        }
        _ => return Err("Nothing to mint: use --metadata/--amount, --uris or --item".into()),
    };
    let request = MintRequest { config, source };

    let report = if args.dry_run {
        eprintln!("🧪 Dry run: no mint service is called");
        mint_batched(request, &DryRunMinter::new()).await?
    } else {
        let endpoint = args
            .endpoint
            .or_else(|| settings.endpoint.clone())
            .ok_or("Missing mint service endpoint (--endpoint or NFTMINT_ENDPOINT)")?;
        mint_batched(request, &HttpMinter::new(&endpoint)?).await?
    };

    write_output(
        &serde_json::to_string_pretty(&MintSummary::from(&report))?,
        args.output.as_deref(),
    )?;

    match report {
        MintReport::Completed(outcomes) => {
            eprintln!("✅ Minted {} tokens", outcomes.len());
            Ok(())
        }
        MintReport::Aborted(failure) => Err(failure.into()),
    }
}

async fn cmd_serve(
    port: u16,
    layout: Option<&Path>,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState {
        output_root: settings.output_dir.clone(),
        layout: load_layout(layout)?,
    };
    eprintln!("🚀 POST /api/metadata - Upload metadata CSV");
    eprintln!("   POST /api/validate - Validate metadata objects");
    eprintln!("   GET  /api/logs     - SSE log stream");
    nftmint::api::start_server(port, state).await?;
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
