mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bookdex",
    version,
    about = "Extract and browse back-of-book indexes from digitized documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate the index section and report the printed-page offset
    Locate {
        /// Path to the document (PDF)
        input_file: PathBuf,
    },
    /// Locate and parse the index into term/occurrence entries
    Analyze {
        /// Path to the document (PDF)
        input_file: PathBuf,

        /// Delegate parsing to the completion service instead of the
        /// deterministic parser (requires GEMINI_API_KEY)
        #[arg(long)]
        assisted: bool,

        /// Completion model name (assisted mode only)
        #[arg(long, value_name = "NAME")]
        model: Option<String>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Print the text of a printed page, resolved through the page offset
    Page {
        /// Path to the document (PDF)
        input_file: PathBuf,

        /// Printed page number as it appears in the index
        printed_page: u32,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Locate { input_file } => commands::locate::run(input_file),
        Commands::Analyze {
            input_file,
            assisted,
            model,
            output,
        } => commands::analyze::run(input_file, assisted, model, &output).await,
        Commands::Page {
            input_file,
            printed_page,
        } => commands::page::run(input_file, printed_page),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
