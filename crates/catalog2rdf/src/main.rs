use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use catalog2rdf::config::{DEFAULT_BASE_URI, DEFAULT_DATA_URL, DEFAULT_UPDATE_URL};
use catalog2rdf::migration::snapshot::{load_json, load_record};
use catalog2rdf::model::iri::IriMinter;
use catalog2rdf::store::{GraphStore, HttpGraphStore, MemoryGraphStore};
use catalog2rdf::sync::{SyncOutcome, SyncReport};
use catalog2rdf::{CatalogService, StoreConfig, SyncConfig, ThemeMode};

/// Project dataset catalog records to DCAT RDF and keep a triple store in sync.
#[derive(Parser)]
#[command(name = "catalog2rdf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Base URI for dataset and catalog IRIs.
    #[arg(long, global = true, env = "BASE_URI", default_value = DEFAULT_BASE_URI)]
    base_uri: String,

    /// How dcat:theme values are emitted.
    #[arg(long, global = true, value_enum, default_value_t = ThemeMode::Literal)]
    theme_mode: ThemeMode,

    /// Don't emit vcard:Kind contact nodes.
    #[arg(long, global = true)]
    no_contact_nodes: bool,

    /// Shape graph to validate against [default: bundled shapes].
    #[arg(long, global = true, value_name = "FILE")]
    shapes: Option<PathBuf>,

    /// Append failed synchronization steps to this JSON Lines file.
    #[arg(long, global = true, value_name = "FILE")]
    journal: Option<PathBuf>,

    /// Use an in-memory store instead of the remote triple store.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(flatten)]
    store: StoreArgs,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Args)]
struct StoreArgs {
    /// Graph store protocol endpoint.
    #[arg(long, global = true, env = "TRIPLESTORE_DATA_URL", default_value = DEFAULT_DATA_URL)]
    data_url: String,

    /// SPARQL update endpoint.
    #[arg(long, global = true, env = "TRIPLESTORE_UPDATE_URL", default_value = DEFAULT_UPDATE_URL)]
    update_url: String,

    /// Basic auth user.
    #[arg(long, global = true, env = "TRIPLESTORE_USER")]
    user: Option<String>,

    /// Basic auth password.
    #[arg(long, global = true, env = "TRIPLESTORE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Per-request timeout.
    #[arg(long, global = true, value_name = "SECONDS", default_value_t = 30)]
    timeout: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Print the Turtle document for a dataset record.
    Project {
        /// Dataset record (JSON).
        record: PathBuf,

        /// Output file path [default: stdout].
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Project a dataset record and validate it against the shape graph.
    Validate {
        /// Dataset record (JSON).
        record: PathBuf,
    },
    /// Validate a dataset record and publish it.
    Publish {
        /// Dataset record (JSON).
        record: PathBuf,

        /// Identifier the dataset had before this update. Omit for a create.
        #[arg(long, value_name = "ID")]
        previous_identifier: Option<String>,
    },
    /// Remove a dataset graph and its catalog membership.
    Delete {
        identifier: String,
    },
    /// Rebuild the whole triple store from a relational snapshot (JSON).
    Migrate {
        snapshot: PathBuf,

        /// Dataset graphs uploaded concurrently.
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
}

fn init_tracing(cli: &Cli) {
    //   --quiet   -> off
    //   --verbose -> RUST_LOG, else info
    //   default   -> RUST_LOG, else warn (failed sync steps stay visible)
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

fn sync_config(cli: &Cli) -> SyncConfig {
    SyncConfig {
        base_uri: cli.base_uri.clone(),
        theme_mode: cli.theme_mode,
        contact_nodes: !cli.no_contact_nodes,
        store: StoreConfig {
            data_url: cli.store.data_url.clone(),
            update_url: cli.store.update_url.clone(),
            username: cli.store.user.clone(),
            password: cli.store.password.clone(),
            timeout: Duration::from_secs(cli.store.timeout),
        },
        shapes_path: cli.shapes.clone(),
        journal_path: cli.journal.clone(),
        upload_concurrency: match cli.command {
            Command::Migrate { concurrency, .. } => concurrency,
            _ => 1,
        },
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = sync_config(&cli);
    let catalog_iri = IriMinter::new(&config.base_uri).catalog_iri();

    if cli.dry_run {
        let service = CatalogService::new(config, MemoryGraphStore::new(catalog_iri))?;
        let result = execute(&cli, &service).await;
        if !cli.quiet {
            let graphs = service.store().graph_names().await;
            eprintln!("Dry run: {} graph(s) in the in-memory store", graphs.len());
        }
        result
    } else {
        let store = HttpGraphStore::new(&config.store, catalog_iri)?;
        let service = CatalogService::new(config, store)?;
        execute(&cli, &service).await
    }
}

async fn execute<S: GraphStore>(
    cli: &Cli,
    service: &CatalogService<S>,
) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Command::Project { record, output } => {
            let doc = service.project(&load_record(record)?)?;
            let mut writer: Box<dyn Write> = match output {
                Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                None => Box::new(BufWriter::new(io::stdout().lock())),
            };
            writer.write_all(doc.turtle.as_bytes())?;
            writer.flush()?;
            if !cli.quiet {
                eprintln!("Projected {} triples for {}", doc.triple_count, doc.dataset_iri);
            }
        }
        Command::Validate { record } => {
            let doc = service.project(&load_record(record)?)?;
            let report = service.validate(&doc.turtle)?;
            print!("{}", report.text());
            if !report.conforms {
                return Err(format!(
                    "{} does not conform ({} result(s))",
                    doc.dataset_iri,
                    report.results.len()
                )
                .into());
            }
        }
        Command::Publish {
            record,
            previous_identifier,
        } => {
            let doc = service.project_and_validate(&load_record(record)?)?;
            let report = match previous_identifier {
                Some(previous) => service.on_updated(previous, &doc).await,
                None => service.on_created(&doc).await,
            };
            finish_sync(cli, &report)?;
        }
        Command::Delete { identifier } => {
            let report = service.on_deleted(identifier).await;
            finish_sync(cli, &report)?;
        }
        Command::Migrate { snapshot, .. } => {
            let snapshot = load_json(snapshot)?;
            let report = service.run_bulk_migration(&snapshot).await?;
            if !cli.quiet {
                eprintln!(
                    "Migrated {} catalog(s), published {} dataset graph(s) ({} without catalog), skipped {}",
                    report.catalogs,
                    report.datasets_published,
                    report.orphans,
                    report.skipped.len()
                );
                for skipped in &report.skipped {
                    eprintln!("  skipped {}: {}", skipped.identifier, skipped.reason);
                }
                for failure in &report.embedded_failures {
                    eprintln!("  embedded RDF of {} ignored: {}", failure.identifier, failure.error);
                }
            }
            if !report.is_clean() {
                return Err(format!(
                    "{} dataset(s) skipped, {} graph upload(s) failed; \
                     fix the rows and rerun the migration",
                    report.skipped.len(),
                    report.upload_failures.len()
                )
                .into());
            }
        }
    }
    Ok(())
}

fn finish_sync(cli: &Cli, report: &SyncReport) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.quiet {
        for step in &report.steps {
            match &step.outcome {
                SyncOutcome::Applied => eprintln!("{} {}: applied", step.kind, step.target),
                SyncOutcome::Failed(reason) => {
                    eprintln!("{} {}: FAILED ({reason})", step.kind, step.target)
                }
            }
        }
    }
    let failed = report.failures().count();
    if failed > 0 {
        return Err(format!(
            "{failed} triple store step(s) failed; run `catalog2rdf migrate` to repair"
        )
        .into());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
