//! dbgear CLI - declarative MySQL database lifecycle management.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dbgear::importer::ImporterRegistry;
use dbgear::{apply, ApplyMode, ApplyOptions, DbGearError, Project};
use indexmap::IndexMap;
use tracing::info;

#[derive(Parser)]
#[command(name = "dbgear")]
#[command(about = "Declarative MySQL database lifecycle management")]
#[command(version)]
struct Cli {
    /// Project folder holding project.yaml
    #[arg(long, default_value = "database")]
    project: PathBuf,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring a deployment's databases to the state the project describes
    Apply {
        /// Target deployment name
        deploy: String,

        /// Target environment name
        environ: String,

        /// Limit the run to one database (mapping instance)
        #[arg(long)]
        database: Option<String>,

        /// Limit DDL/DML work to one table, view, trigger, or procedure
        #[arg(long)]
        target: Option<String>,

        /// Apply everything: "drop" recreates databases, "delta" applies
        /// changes in place
        #[arg(long, value_name = "MODE")]
        all: Option<String>,

        /// Skip initial-data inserts and backup-restore steps
        #[arg(long)]
        no_restore: bool,

        /// Skip table/view/trigger/procedure (re)creation
        #[arg(long)]
        restore_only: bool,

        /// Only drop and recreate secondary indexes on the target table
        #[arg(long)]
        index_only: bool,

        /// Patch file for a selective restore of the target
        #[arg(long)]
        patch: Option<PathBuf>,

        /// Restore the target from its backup table
        #[arg(long)]
        restore_backup: bool,

        /// Override the run stamp used for backup tables
        #[arg(long)]
        backup_key: Option<String>,

        /// Print rendered SQL without executing it
        #[arg(long)]
        dryrun: bool,
    },

    /// Import a third-party schema description into schema.yaml
    Import {
        /// Source format (importer name)
        format: String,

        /// Source file
        source: PathBuf,

        /// Output schema file [default: <project>/schema.yaml]
        #[arg(long)]
        output: Option<PathBuf>,

        /// Instance-to-schema renames as KEY:VAL,KEY:VAL
        #[arg(long)]
        mapping: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), DbGearError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity).map_err(DbGearError::Config)?;

    match cli.command {
        Commands::Apply {
            deploy,
            environ,
            database,
            target,
            all,
            no_restore,
            restore_only,
            index_only,
            patch,
            restore_backup,
            backup_key,
            dryrun,
        } => {
            let mode = all.as_deref().map(str::parse::<ApplyMode>).transpose()?;
            let options = ApplyOptions {
                mode,
                target,
                no_restore,
                restore_only,
                index_only,
                restore_backup,
                patch,
                backup_key,
                dryrun,
            };

            let project = Project::load(&cli.project)?;
            info!("loaded project from {:?}", cli.project);
            apply(&project, &environ, database.as_deref(), &deploy, &options).await
        }

        Commands::Import {
            format,
            source,
            output,
            mapping,
        } => {
            let mapping = parse_mapping(mapping.as_deref())?;
            let registry = ImporterRegistry::new();
            let schemas = registry.import(&format, &source, &mapping)?;
            let output = output.unwrap_or_else(|| cli.project.join("schema.yaml"));
            schemas.save(&output)?;
            info!("imported {:?} to {:?}", source, output);
            Ok(())
        }
    }
}

/// Parse `KEY:VAL,KEY:VAL` into an ordered map.
fn parse_mapping(raw: Option<&str>) -> Result<IndexMap<String, String>, DbGearError> {
    let mut mapping = IndexMap::new();
    let Some(raw) = raw else {
        return Ok(mapping);
    };
    for pair in raw.split(',').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once(':').ok_or_else(|| {
            DbGearError::Config(format!("mapping entries must be KEY:VAL, got '{}'", pair))
        })?;
        mapping.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(mapping)
}

fn setup_logging(verbosity: &str) -> Result<(), String> {
    let level = match verbosity {
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        other => return Err(format!("unknown verbosity '{}'", other)),
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}
