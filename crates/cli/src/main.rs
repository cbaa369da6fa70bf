mod config_commands;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    slackntell_mail::SmtpMailer,
    slackntell_relay::RelaySettings,
    slackntell_slack::SlackPlatform,
    tracing::{error, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "slackntell",
    version,
    about = "slackntell: relay chat messages to email digests"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (overrides the standard search locations).
    #[arg(long, global = true, env = "SLACKNTELL_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay (default when no subcommand is provided).
    Run,
    /// Validate the configuration and report errors/warnings.
    Check,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

async fn run_relay(cli: &Cli) -> anyhow::Result<()> {
    let config = config_commands::load_checked(cli.config.as_deref())?;
    let settings = RelaySettings::from_config(&config)?;

    let platform = SlackPlatform::new(&config.slack, config.digest.history_limit)
        .context("failed to set up slack client")?;
    let mailer = SmtpMailer::new(&config.smtp).context("failed to set up smtp transport")?;

    slackntell_relay::run(Arc::new(platform), Arc::new(mailer), settings, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
    .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let result = match cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "slackntell starting");
            run_relay(&cli).await
        },
        Some(Commands::Check) => match config_commands::check(cli.config.as_deref()) {
            Ok(true) => Ok(()),
            Ok(false) => return ExitCode::FAILURE,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("slackntell stopped: {e:#}");
            ExitCode::FAILURE
        },
    }
}
