//! flow-persist admin CLI
//!
//! Bootstraps the schema and inspects status and recovery state.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use flow_persist::{load_config, EntityKind, Logger, Persistence};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flow-persist")]
#[command(about = "Status and suspend/recover persistence for workflow engines", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "FLOW_PERSIST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing tables and indexes
    Bootstrap,

    /// Check database connectivity
    Health,

    /// Show the status row of a flow, process or step
    Status {
        #[arg(value_enum)]
        kind: KindArg,
        /// Entity id
        id: String,
    },

    /// Show the idle recover record of a root and its checkpoints
    Record {
        /// Root unit id
        root_uid: String,
    },

    /// Consume the idle recover record of a root
    Claim {
        /// Root unit id
        root_uid: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Flow,
    Process,
    Step,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Flow => EntityKind::Flow,
            KindArg::Process => EntityKind::Process,
            KindArg::Step => EntityKind::Step,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    let logger = Logger::from_config(&config.logging)?;
    tracing::dispatcher::set_global_default(logger.dispatch().clone())
        .context("Failed to install logger")?;

    let persistence = Persistence::open(&config, logger.clone())
        .await
        .context("Failed to open database")?;

    match cli.command {
        Commands::Bootstrap => {
            persistence.status().bootstrap().run().await?;
            println!("Schema ready");
        }
        Commands::Health => {
            persistence.database().health_check().await?;
            println!("ok");
        }
        Commands::Status { kind, id } => {
            let kind = EntityKind::from(kind);
            match persistence.status().tracker().get(kind, &id).await? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => anyhow::bail!("No {} with id {}", kind, id),
            }
        }
        Commands::Record { root_uid } => {
            let recovery = persistence.suspend().store().recovery();
            match recovery.get_latest_record(&root_uid).await {
                Ok(record) => {
                    let checkpoints = recovery.list_checkpoints(&record.recover_id).await?;
                    let summary: Vec<_> = checkpoints
                        .iter()
                        .map(|cp| {
                            json!({
                                "id": cp.id,
                                "uid": cp.uid,
                                "name": cp.name,
                                "scope": cp.scope,
                                "parent_uid": cp.parent_uid,
                                "snapshot_bytes": cp.snapshot.len(),
                            })
                        })
                        .collect();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "record": record,
                            "checkpoints": summary,
                        }))?
                    );
                }
                Err(e) if e.is_not_found() => println!("Nothing to recover for {}", root_uid),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Claim { root_uid } => {
            let recovery = persistence.suspend().store().recovery();
            match recovery.claim_latest_record(&root_uid).await {
                Ok(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                Err(e) if e.is_not_found() => println!("Nothing to recover for {}", root_uid),
                Err(e) => return Err(e.into()),
            }
        }
    }

    persistence.database().close().await;
    Ok(())
}
