use clap::Parser;
use std::path::PathBuf;
use tracing::error;

use plexgrab::config::{Config, ConfigError};
use plexgrab::logging;
use plexgrab::pipeline::{self, RunOptions};

#[derive(Parser)]
#[clap(version, about = "Download the media files behind a Plex web client page", long_about = None)]
struct Args {
    #[clap(
        long,
        short = 't',
        help = "Account token (overrides PLEXGRAB_TOKEN and the config file)"
    )]
    token: Option<String>,

    #[clap(long = "output", short = 'o', help = "Directory the files are written to")]
    output: Option<PathBuf>,

    #[clap(
        long = "print-url",
        help = "Print the authenticated download URLs instead of fetching them"
    )]
    print_urls: bool,

    #[clap(long, help = "Use this config file instead of the default location")]
    config: Option<PathBuf>,

    #[clap(help = "Address of the web client page showing the item", index = 1)]
    url: String,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

#[tokio::main]
async fn main() {
    logging::init();

    let args = Args::parse();

    let config = match load_config(args.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            if let ConfigError::NotFound(path) = &e {
                eprintln!("\nCreate a config file at: {}", path.display());
                eprintln!("\nExample config.toml:");
                eprintln!(
                    r#"
token = "your-account-token"

[download]
output_dir = "/home/you/Descargas"
"#
                );
            }
            std::process::exit(1);
        }
    };

    let output_dir = args
        .output
        .unwrap_or_else(|| config.download.output_dir());

    let options = RunOptions {
        page_url: args.url,
        token: args.token,
        print_urls: args.print_urls,
        output_dir,
        account_url: None,
    };

    match pipeline::run(&config, &options).await {
        Ok(summary) => {
            if !options.print_urls {
                if summary.completed == summary.requested {
                    println!(
                        "Descarga completada: {} de {} partes.",
                        summary.completed, summary.requested
                    );
                } else {
                    println!(
                        "Descarga terminada con errores: {} de {} partes.",
                        summary.completed, summary.requested
                    );
                }
            }
        }
        Err(e) => {
            error!(error = %e, "pipeline aborted");
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}
