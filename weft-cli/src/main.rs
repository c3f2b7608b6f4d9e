//! Weft CLI - load, run, and inspect component-graph configurations.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use weft_runtime::loader::{FlowDocument, LogFormat, LogLevel};

/// Weft - declarative component-graph runtime.
#[derive(Parser)]
#[command(name = "weft")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a configuration and run its components until interrupted
    Run {
        /// Path to the configuration file
        file: String,

        /// Serve the DAG visualization endpoints on this address
        #[arg(short, long, value_name = "HOST:PORT")]
        listen: Option<String>,
    },

    /// Load a configuration and report diagnostics without running
    Validate {
        /// Path to the configuration file
        file: String,
    },

    /// Print the dependency graph as DOT text
    Graph {
        /// Path to the configuration file
        file: String,

        /// Print the nametable structure instead of the dependency graph
        #[arg(long)]
        nametable: bool,
    },

    /// Convert a supported config file to the Weft dialect
    ///
    /// If the file argument is not supplied or is "-", convert reads from
    /// stdin. Without -o the result is written to stdout. Without -r no
    /// report is generated.
    Convert {
        /// Input file path, or "-" for stdin
        file: Option<String>,

        /// The filepath and filename where the output is written
        #[arg(short, long)]
        output: Option<String>,

        /// The filepath and filename where the report is written
        #[arg(short, long)]
        report: Option<String>,

        /// The format of the source file
        #[arg(short = 'f', long = "source-format")]
        source_format: String,

        /// Enable bypassing errors when converting
        #[arg(short, long)]
        bypass_errors: bool,

        /// Extra arguments forwarded to the converter, space-delimited
        #[arg(short, long, default_value = "")]
        extra_args: String,
    },

    /// Show version information
    Version,
}

fn setup_logging(
    verbosity: u8,
    doc_level: Option<LogLevel>,
    doc_format: Option<LogFormat>,
) -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let fallback = match verbosity {
        0 => doc_level.map(|l| l.as_filter()).unwrap_or("info"),
        1 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over both the flag and the document.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let format = std::env::var("WEFT_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse::<LogFormat>().ok())
        .or(doc_format)
        .unwrap_or_else(|| {
            if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
                LogFormat::Pretty
            } else {
                LogFormat::Compact
            }
        });

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The document's log_level / log_format apply unless overridden by
    // flags or environment; a broken file surfaces properly in the command.
    let doc_options = match &cli.command {
        Commands::Run { file, .. } | Commands::Validate { file } => {
            FlowDocument::from_file(std::path::Path::new(file))
                .map(|doc| (doc.log_level, doc.log_format))
                .unwrap_or((None, None))
        }
        _ => (None, None),
    };
    setup_logging(cli.verbose, doc_options.0, doc_options.1)?;

    match cli.command {
        Commands::Run { file, listen } => commands::run::run(&file, listen.as_deref()).await,
        Commands::Validate { file } => commands::validate::run(&file).await,
        Commands::Graph { file, nametable } => commands::graph::run(&file, nametable).await,
        Commands::Convert {
            file,
            output,
            report,
            source_format,
            bypass_errors,
            extra_args,
        } => commands::convert::run(
            file.as_deref(),
            output.as_deref(),
            report.as_deref(),
            &source_format,
            bypass_errors,
            &extra_args,
        ),
        Commands::Version => commands::version::run(),
    }
}
