use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use cmr_core::session::SessionStore;
use cmr_core::store::FileStore;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod clipboard;
mod commands;
mod service;
mod util;

use commands::convert::SelectionArgs;
use commands::parse::ParseArgs;
use service::HttpRecipeService;
use util::exit_error;

#[derive(Parser)]
#[command(
    name = "cmr",
    version,
    about = "Convert My Recipe: detect the measurements in a recipe and convert them"
)]
struct Cli {
    /// Recipe service base URL
    #[arg(long, env = "CMR_API_URL", default_value = "http://localhost:3333")]
    api_url: String,

    /// State file (defaults to <config dir>/convert-my-recipe/state.json)
    #[arg(long, env = "CMR_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Recipe service request timeout in seconds
    #[arg(long, env = "CMR_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Emit logs as JSON on stderr
    #[arg(long, env = "CMR_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a recipe and detect its measurements
    Parse(ParseArgs),
    /// Show the detected units and preview a selection
    Show {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Mark selected units with brackets instead of terminal styling
        #[arg(long)]
        no_color: bool,
    },
    /// Convert the selected units
    Convert(SelectionArgs),
    /// Print the converted recipe
    Result {
        /// Also copy it to the clipboard
        #[arg(long)]
        copy: bool,
        /// With --copy on Linux: seconds to keep serving the clipboard
        /// contents before exiting (the command blocks until then or until
        /// another program takes the clipboard over)
        #[arg(long, env = "CMR_COPY_WAIT_SECS", default_value_t = 10)]
        copy_wait_secs: u64,
    },
    /// Forget the stored recipe and result
    Restart,
    /// Show stored state and which views are reachable
    Status,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cmr_cli=warn,cmr_core=warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn http_service(api_url: &str, timeout_secs: u64) -> HttpRecipeService {
    HttpRecipeService::new(api_url, Duration::from_secs(timeout_secs))
        .unwrap_or_else(|e| exit_error(&e, Some("Set --api-url or CMR_API_URL to the recipe service")))
}

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let state_file = cli.state_file.unwrap_or_else(util::state_path);
    let mut sessions = SessionStore::new(FileStore::open(state_file));

    let code = match cli.command {
        Commands::Parse(args) => {
            let service = http_service(&cli.api_url, cli.timeout_secs);
            commands::parse::run(&mut sessions, &service, args).await
        }
        Commands::Show {
            selection,
            no_color,
        } => commands::show::run(&mut sessions, selection, no_color),
        Commands::Convert(selection) => {
            let service = http_service(&cli.api_url, cli.timeout_secs);
            commands::convert::run(&mut sessions, &service, selection).await
        }
        Commands::Result {
            copy,
            copy_wait_secs,
        } => commands::result::run(&mut sessions, copy, Duration::from_secs(copy_wait_secs)),
        Commands::Restart => commands::restart::run(&mut sessions),
        Commands::Status => commands::status::run(&mut sessions),
    };

    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_copy_wait_flag() {
        let cli = Cli::try_parse_from(["cmr", "result", "--copy", "--copy-wait-secs", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Result {
                copy: true,
                copy_wait_secs: 3
            }
        ));
    }

    #[test]
    fn test_parse_paste_flag() {
        let cli = Cli::try_parse_from(["cmr", "parse", "--paste"]).unwrap();
        assert!(matches!(cli.command, Commands::Parse(ParseArgs { paste: true, .. })));
    }
}
