use clap::{Parser, Subcommand};
use commandcenter_logging::config::{load_config, load_default, LoggingConfig, Registry};
use commandcenter_logging::{LogLevel, Logging};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "logcheck")]
#[command(about = "Validate, inspect and exercise commandcenter logging configuration", long_about = None)]
struct Cli {
    /// Configuration document (default: COMMANDCENTER_LOGGING_CONFIG_PATH,
    /// then ./logging.toml, then the bundled default)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the document and build every component
    Validate,
    /// Print the resolved document after substitution and overrides
    Dump {
        #[arg(long)]
        json: bool,
    },
    /// Send one record through the configured graph
    Emit {
        logger: String,
        level: LogLevel,
        message: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("logcheck: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (config, source) = match &cli.config {
        Some(path) => (load_config(path)?, path.display().to_string()),
        None => {
            let (config, source) = load_default()?;
            (config, source.to_string())
        }
    };

    match cli.command {
        Commands::Validate => {
            let logging = Logging::from_config(&config, &Registry::with_defaults())?;
            println!("{}: ok", source);
            println!("  handlers: {}", logging.handler_names().join(", "));
            println!("  loggers:  {}", logging.logger_names().join(", "));
            logging.shutdown(Duration::from_secs(2));
        }
        Commands::Dump { json } => print!("{}", render(&config, json)?),
        Commands::Emit {
            logger,
            level,
            message,
        } => {
            let logging = Logging::from_config(&config, &Registry::with_defaults())?;
            logging.get_logger(&logger).log(level, message);
            logging.flush()?;
            if !logging.shutdown(Duration::from_secs(10)) {
                return Err("handlers did not finish within 10s".into());
            }
        }
    }
    Ok(())
}

fn render(config: &LoggingConfig, json: bool) -> commandcenter_logging::Result<String> {
    if json {
        config.to_json_string().map(|s| s + "\n")
    } else {
        config.to_toml_string()
    }
}
