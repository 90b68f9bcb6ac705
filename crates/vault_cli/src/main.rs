mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::Result;
use tracing::info;
use vault_core::{
    AuthMode, PollOutcome, VaultPoller,
    config::{self, ConfigOverrides},
};
use vault_mcp::McpClient;

use crate::output::Output;

#[derive(Parser)]
#[command(name = "vault-poll")]
#[command(
    about = "Poll The Code Registry MCP server until vault report completion criteria are met"
)]
#[command(version)]
struct Cli {
    /// Code vault ID to poll
    #[arg(long)]
    vault_id: String,

    /// The Code Registry API key
    #[arg(long, env = "CODE_REGISTRY_API_KEY", hide_env_values = true)]
    api_key: String,

    /// MCP JSON-RPC endpoint URL [default: production router]
    #[arg(long)]
    mcp_url: Option<String>,

    /// Send api_key in tool arguments instead of X-API-Key header
    #[arg(long)]
    api_key_in_body: bool,

    /// Initial backoff delay in seconds [default: 5]
    #[arg(long, value_name = "SECONDS")]
    initial_delay: Option<u64>,

    /// Maximum backoff delay in seconds [default: 60]
    #[arg(long, value_name = "SECONDS")]
    max_delay: Option<u64>,

    /// Overall timeout in seconds [default: 3600]
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Per-request timeout in seconds [default: 60]
    #[arg(long, value_name = "SECONDS")]
    request_timeout: Option<u64>,

    /// Print final status as JSON in addition to human-readable output
    #[arg(long)]
    json: bool,

    /// Configuration file path
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            endpoint: self.mcp_url.clone(),
            auth_mode: self.api_key_in_body.then_some(AuthMode::Body),
            request_timeout_secs: self.request_timeout,
            initial_delay_secs: self.initial_delay,
            max_delay_secs: self.max_delay,
            timeout_secs: self.timeout,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .context_lines(3)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();
    let cli = Cli::parse();

    // Initialize tracing
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.debug {
            EnvFilter::new("vault_core=debug,vault_mcp=debug,vault_cli=debug,warn")
        } else {
            EnvFilter::new("vault_core=warn,vault_mcp=warn,vault_cli=info,warn")
        }
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(cli.debug)
        .with_line_number(cli.debug)
        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339())
        .compact()
        .init();

    // Load configuration
    let base = if let Some(config_path) = &cli.config {
        info!("Loading config from: {:?}", config_path);
        config::load_config(config_path).await?
    } else {
        config::load_config_from_standard_locations().await?
    };
    let config = config::merge_configs(base, cli.overrides());

    tracing::debug!(
        "Using endpoint {} with {:?} auth",
        config.client.endpoint,
        config.client.auth_mode
    );

    let client = McpClient::from_config(&config.client, cli.api_key.as_str())?;
    let mut poller = VaultPoller::new(client, config.poll.clone());
    let mut output = Output::new(cli.json);

    let outcome = poller.run(&cli.vault_id, &mut output).await;
    match &outcome {
        PollOutcome::Completed(status) => output.completed(status)?,
        PollOutcome::AnalysisFailed(_) => output.analysis_failed(),
        // Reported through the observer as the loop gives up
        PollOutcome::TimedOut { .. } => {}
    }

    Ok(ExitCode::from(outcome.exit_code()))
}
