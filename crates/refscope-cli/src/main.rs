use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use refscope_core::{IdKind, MendeleyDatabase, RefscopeConfig, backup, locate_database};
use refscope_science::{IdentifierResolver, ReconcileOptions, RecordReconciler, Resolver};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "refscope",
    about = "Fill in missing PMCIDs, PMIDs and DOIs in a Mendeley Desktop library",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output batch reports in JSON format.
    #[arg(long, global = true)]
    json: bool,

    /// Log every registry call and failure.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file (default: ~/.config/refscope/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up every journal article and fill in missing identifiers.
    Ids {
        #[command(flatten)]
        target: Target,
        /// Replace identifiers that are already set.
        #[arg(long)]
        overwrite: bool,
        /// Contact email sent to NCBI with every request.
        #[arg(long)]
        email: Option<String>,
    },

    /// Uppercase lone lowercase "a" initials in author first names.
    Authors {
        #[command(flatten)]
        target: Target,
    },

    /// Print the path of the discovered Mendeley database.
    Locate,

    /// Resolve a single identifier and print the triad as JSON.
    Resolve {
        id: String,
        #[arg(long, value_enum, default_value = "pmid")]
        kind: KindArg,
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(clap::Args)]
struct Target {
    /// Database file (default: discovered from the Mendeley install).
    #[arg(long)]
    db: Option<PathBuf>,
    /// Resolve and report, but write nothing.
    #[arg(long)]
    dry_run: bool,
    /// Skip the backup copy taken before writing.
    #[arg(long)]
    no_backup: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Doi,
    Pmid,
}

impl From<KindArg> for IdKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Doi => IdKind::Doi,
            KindArg::Pmid => IdKind::Pmid,
        }
    }
}

// ─── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => RefscopeConfig::load_from(path),
        None => RefscopeConfig::load(),
    }
    .context("failed to load config")?;

    match cli.command {
        Commands::Ids {
            target,
            overwrite,
            email,
        } => {
            config.reconcile.overwrite |= overwrite;
            if email.is_some() {
                config.registries.email = email;
            }
            let reconciler = open_reconciler(&config, &target)?;
            let report = reconciler.reconcile_all(target.dry_run).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Matched {} of {} documents ({} failed).",
                    report.matched, report.total, report.failed
                );
            }
        }
        Commands::Authors { target } => {
            let reconciler = open_reconciler(&config, &target)?;
            let report = reconciler.fix_author_names(target.dry_run)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Corrected {} of {} contributors.",
                    report.corrected, report.examined
                );
            }
        }
        Commands::Locate => {
            println!("{}", locate_database()?.display());
        }
        Commands::Resolve { id, kind, email } => {
            if email.is_some() {
                config.registries.email = email;
            }
            let resolver = IdentifierResolver::from_config(&config.registries)?;
            let resolved = resolver.resolve(&id, kind.into()).await;
            if resolved.is_none() {
                info!("Could not match {id}");
            }
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn database_path(config: &RefscopeConfig, target: &Target) -> Result<PathBuf> {
    if let Some(path) = target.db.as_ref().or(config.database.path.as_ref()) {
        return Ok(path.clone());
    }
    Ok(locate_database()?)
}

fn open_reconciler(
    config: &RefscopeConfig,
    target: &Target,
) -> Result<RecordReconciler<MendeleyDatabase, IdentifierResolver>> {
    let path = database_path(config, target)?;
    if !target.dry_run && !target.no_backup {
        backup(&path, &config.database.backup_dir).context("failed to back up database")?;
    }

    debug!(path = %path.display(), dry_run = target.dry_run, "opening database");
    let db = MendeleyDatabase::open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let resolver = IdentifierResolver::from_config(&config.registries)?;
    Ok(RecordReconciler::new(db, resolver, ReconcileOptions::from(config)))
}
