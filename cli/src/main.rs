use clap::{Parser, Subcommand};
use replydesk_runtime::RuntimeConfig;

mod commands;
mod util;

use commands::presets::PresetCommands;
use commands::resolve::ResolveArgs;
use commands::session::SessionCommands;
use commands::watch::WatchArgs;
use util::exit_error;

#[derive(Parser)]
#[command(
    name = "replydesk",
    version,
    about = "replydesk — ticket requester lookup and reply drafting from the terminal"
)]
struct Cli {
    /// Profile API base URL
    #[arg(long, env = "REPLYDESK_API_BASE")]
    api_url: Option<String>,

    /// Per-request lookup timeout in milliseconds
    #[arg(long, env = "REPLYDESK_LOOKUP_TIMEOUT_MS")]
    timeout_ms: Option<String>,

    /// JSON file of host ticket fields (acts as the host capability)
    #[arg(long, env = "REPLYDESK_HOST_FIELDS")]
    host_fields: Option<String>,

    /// Directory for the remembered manual email
    #[arg(long, env = "REPLYDESK_STATE_DIR")]
    state_dir: Option<String>,

    /// Do not read or write the remembered manual email
    #[arg(long)]
    no_remember: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the current ticket once and print the widget state
    Resolve(ResolveArgs),
    /// Interactive widget loop on stdin
    Watch(WatchArgs),
    /// Quick-pick preset emails
    Presets {
        #[command(subcommand)]
        command: PresetCommands,
    },
    /// Remembered manual email
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    util::init_tracing(cli.log_json);

    let mut config = match RuntimeConfig::from_raw(
        cli.api_url,
        cli.timeout_ms,
        cli.host_fields,
        cli.state_dir,
    ) {
        Ok(config) => config,
        Err(e) => exit_error(
            &e.to_string(),
            Some("Pass an absolute URL, e.g. --api-url https://jsonplaceholder.typicode.com"),
        ),
    };
    if cli.no_remember {
        config.state_dir = None;
    }

    let code = match cli.command {
        Commands::Resolve(args) => commands::resolve::run(&config, args).await,
        Commands::Watch(args) => commands::watch::run(&config, args).await,
        Commands::Presets { command } => commands::presets::run(&config, command).await,
        Commands::Session { command } => commands::session::run(&config, command).await,
    };
    std::process::exit(code);
}
