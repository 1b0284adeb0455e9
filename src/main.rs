use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use dpod_audit_tools::audit::export::PollSettings;
use dpod_audit_tools::audit::pipeline::{LogsRequest, PipelineSettings};
use dpod_audit_tools::commands;
use dpod_audit_tools::commands::export_jobs::CreateOptions;
use dpod_audit_tools::config::ConsoleConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "dpod-audit")]
#[command(about = "DPoD audit log retrieval and analysis tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level for diagnostics on stderr (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Console connection options shared by API commands
#[derive(Args)]
struct ConnectionArgs {
    /// Console API base URL (default: $DPOD_BASE_URL or the NA console)
    #[arg(long)]
    base_url: Option<String>,

    /// OAuth token endpoint (default: $DPOD_AUTH_URL)
    #[arg(long)]
    auth_url: Option<String>,

    /// OAuth client id (default: $DPOD_CLIENT_ID)
    #[arg(long)]
    client_id: Option<String>,

    /// OAuth client secret (default: $DPOD_CLIENT_SECRET)
    #[arg(long)]
    client_secret: Option<String>,

    /// Pre-issued bearer token (default: $DPOD_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Skip TLS certificate verification (also: DPOD_SKIP_VERIFY=1)
    #[arg(long)]
    insecure: bool,
}

impl ConnectionArgs {
    fn config(&self) -> Result<ConsoleConfig> {
        ConsoleConfig::from_options(
            self.base_url.as_deref(),
            self.auth_url.as_deref(),
            self.client_id.as_deref(),
            self.client_secret.as_deref(),
            self.token.as_deref(),
            self.insecure,
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve, download and summarize audit logs
    AuditLogs {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Start date (YYYY-MM-DD or RFC3339); defaults to 7 days ago
        #[arg(long)]
        start_date: Option<String>,

        /// End date (YYYY-MM-DD or RFC3339); defaults to now
        #[arg(long)]
        end_date: Option<String>,

        /// Tenant UUID
        #[arg(long)]
        tenant_id: Option<String>,

        /// Service name or UUID
        #[arg(long, conflicts_with_all = ["resource_id", "source"])]
        service: Option<String>,

        /// Service UUID or name (alias of --service)
        #[arg(long, conflicts_with = "source")]
        resource_id: Option<String>,

        /// Raw source ("cdsp", "thales/cloudhsm/<serial>") or a service name
        #[arg(long)]
        source: Option<String>,

        /// Actor: client name or UUID for HSM services, username for the data platform
        #[arg(long)]
        actor: Option<String>,

        /// Only this action, e.g. "LUNA_SIGN" or "Create Key"
        #[arg(long)]
        action: Option<String>,

        /// Only this status, e.g. "success" or "LUNA_RET_OK"
        #[arg(long)]
        status: Option<String>,

        /// Seconds between export status polls
        #[arg(long, default_value = "10")]
        poll_interval: u64,

        /// Seconds to wait for the export before giving up
        #[arg(long, default_value = "300")]
        max_wait: u64,

        /// Directory for the temporary export file
        #[arg(long)]
        temp_dir: Option<PathBuf>,

        /// Also write the full result to this file
        #[arg(short, long)]
        output: Option<String>,

        /// Output file format (default: from the file extension)
        #[arg(long, value_parser = ["json", "csv"])]
        format: Option<String>,

        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Create or inspect audit log export jobs
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },

    /// Generate shell completion scripts
    GenerateCompletion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum ExportCommands {
    /// Submit an export job and print it without waiting
    Create {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Start date (YYYY-MM-DD or RFC3339)
        #[arg(long)]
        start_date: String,

        /// End date (YYYY-MM-DD or RFC3339)
        #[arg(long)]
        end_date: String,

        /// Tenant UUID
        #[arg(long)]
        tenant_id: Option<String>,

        /// Source, e.g. "cdsp" or "thales/cloudhsm/<serial>"
        #[arg(long, conflicts_with = "resource_id")]
        source: Option<String>,

        /// Service UUID
        #[arg(long)]
        resource_id: Option<String>,

        /// Actor id
        #[arg(long)]
        actor_id: Option<String>,

        /// Action filter
        #[arg(long)]
        action: Option<String>,

        /// Status filter
        #[arg(long)]
        status: Option<String>,
    },

    /// Show the state of one export job
    Status {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Export job UUID
        job_id: String,
    },
}

fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::AuditLogs {
            connection,
            start_date,
            end_date,
            tenant_id,
            service,
            resource_id,
            source,
            actor,
            action,
            status,
            poll_interval,
            max_wait,
            temp_dir,
            output,
            format,
            quiet,
        } => {
            let request = LogsRequest {
                start_date,
                end_date,
                tenant_id,
                service_name: service,
                resource_id,
                source_filter: source,
                actor_id: actor,
                action_filter: action,
                status_filter: status,
            };
            let settings = PipelineSettings {
                poll: PollSettings {
                    interval: Duration::from_secs(poll_interval),
                    max_wait: Duration::from_secs(max_wait),
                },
                temp_dir,
            };
            commands::audit_logs::run(
                &connection.config()?,
                request,
                settings,
                output.as_deref(),
                format.as_deref(),
                quiet,
            )
            .await
        }
        Commands::Export { command } => match command {
            ExportCommands::Create {
                connection,
                start_date,
                end_date,
                tenant_id,
                source,
                resource_id,
                actor_id,
                action,
                status,
            } => {
                let options = CreateOptions {
                    start_date,
                    end_date,
                    tenant_id,
                    source,
                    resource_id,
                    actor_id,
                    action,
                    status,
                };
                commands::export_jobs::run_create(&connection.config()?, &options).await
            }
            ExportCommands::Status { connection, job_id } => {
                commands::export_jobs::run_status(&connection.config()?, &job_id).await
            }
        },
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "dpod-audit", &mut std::io::stdout());
            Ok(())
        }
    }
}
