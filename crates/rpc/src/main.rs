//! BioGate CLI - Main entry point

use biogate_core::{ActionStatus, AuditCategory, Modality, Role};
use biogate_rpc::{commands, AppConfig, AppContext};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "biogate")]
#[command(about = "BioGate - biometric approval gate for sensitive operations", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a principal
    Register {
        username: String,
        /// admin, operator or security_officer
        #[arg(long, default_value = "operator")]
        role: Role,
        #[arg(long)]
        full_name: Option<String>,
        /// Record biometric consent at registration
        #[arg(long)]
        consent: bool,
    },

    /// Grant or revoke biometric consent
    Consent {
        #[command(subcommand)]
        change: ConsentChange,
    },

    /// Reactivate a principal
    Activate { username: String },

    /// Deactivate a principal
    Deactivate { username: String },

    /// Enroll a biometric sample
    Enroll {
        username: String,
        /// face or voice
        modality: Modality,
        /// Pre-extracted sample file (JSON)
        sample: PathBuf,
        /// Confirm the principal consented to biometric processing
        #[arg(long)]
        confirm_consent: bool,
    },

    /// Verify a biometric sample against the enrolled one
    Authenticate {
        username: String,
        modality: Modality,
        sample: PathBuf,
    },

    /// Request a gated action
    Request {
        /// Requesting principal
        username: String,
        /// Action kind (deploy, rollback, pipeline_modify, ...)
        kind: String,
        description: String,
        /// Metadata as key=value (repeatable)
        #[arg(long = "meta")]
        metadata: Vec<String>,
    },

    /// Approve a pending action with a biometric sample
    Approve {
        action_id: String,
        /// Approving principal
        username: String,
        modality: Modality,
        sample: PathBuf,
    },

    /// Show the status of an action
    Status { action_id: String },

    /// List recent actions
    List {
        /// pending, approved or denied
        #[arg(long)]
        status: Option<ActionStatus>,
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Deny overdue pending actions
    Sweep {
        /// Keep sweeping on the configured interval
        #[arg(long)]
        watch: bool,
    },

    /// Action counts per status
    Stats,

    /// Query or export the audit trail
    Audit {
        #[arg(long)]
        user: Option<String>,
        /// enrollment, authentication or approval
        #[arg(long)]
        category: Option<AuditCategory>,
        #[arg(long)]
        action: Option<String>,
        #[arg(long, default_value = "0")]
        skip: u32,
        #[arg(long, default_value = "100")]
        limit: u32,
        /// Write all matching events to this file as JSON lines
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Erase a principal and their biometric data
    Erase { username: String },
}

#[derive(Subcommand)]
enum ConsentChange {
    Grant { username: String },
    Revoke { username: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .init();

    // Create application context
    let ctx = AppContext::new(&cli.data, config)?;

    match cli.command {
        Commands::Register {
            username,
            role,
            full_name,
            consent,
        } => {
            commands::register(&ctx, &username, full_name.as_deref(), role, consent).await?;
        }

        Commands::Consent { change } => match change {
            ConsentChange::Grant { username } => commands::consent(&ctx, &username, true).await?,
            ConsentChange::Revoke { username } => commands::consent(&ctx, &username, false).await?,
        },

        Commands::Activate { username } => {
            commands::set_active(&ctx, &username, true).await?;
        }

        Commands::Deactivate { username } => {
            commands::set_active(&ctx, &username, false).await?;
        }

        Commands::Enroll {
            username,
            modality,
            sample,
            confirm_consent,
        } => {
            commands::enroll(&ctx, &username, modality, &sample, confirm_consent).await?;
        }

        Commands::Authenticate {
            username,
            modality,
            sample,
        } => {
            commands::authenticate(&ctx, &username, modality, &sample).await?;
        }

        Commands::Request {
            username,
            kind,
            description,
            metadata,
        } => {
            commands::request(&ctx, &username, &kind, &description, &metadata).await?;
        }

        Commands::Approve {
            action_id,
            username,
            modality,
            sample,
        } => {
            commands::approve(&ctx, &action_id, &username, modality, &sample).await?;
        }

        Commands::Status { action_id } => {
            commands::status(&ctx, &action_id).await?;
        }

        Commands::List { status, limit } => {
            commands::list(&ctx, status, limit).await?;
        }

        Commands::Sweep { watch } => {
            if watch {
                commands::watch(&ctx).await?;
            } else {
                commands::sweep(&ctx).await?;
            }
        }

        Commands::Stats => {
            commands::stats(&ctx).await?;
        }

        Commands::Audit {
            user,
            category,
            action,
            skip,
            limit,
            export,
        } => {
            commands::audit(&ctx, user.as_deref(), category, action, skip, limit, export.as_deref()).await?;
        }

        Commands::Erase { username } => {
            commands::erase(&ctx, &username).await?;
        }
    }

    Ok(())
}
