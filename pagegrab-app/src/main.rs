use anyhow::{Context, Result};
use clap::Parser;
use pagegrab_common::observability::init_logging;
use pagegrab_config::{PagegrabConfig, PagegrabConfigLoader};
use pagegrab_web::{FetchMethod, ScrapeResult, Scraper};
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_CONFIG_FILE: &str = "pagegrab.yaml";

#[derive(Parser, Debug)]
#[command(name = "pagegrab", version)]
#[command(about = "Save a web page's text, tables and images to a local folder")]
struct Cli {
    /// Page to scrape; `https://` is assumed when no scheme is given
    url: String,

    /// Fetch strategy: plain HTTP or a rendering browser
    #[arg(long, short = 's', default_value = "http")]
    strategy: FetchMethod,

    /// Destination root (overrides `output_dir` from the config)
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// YAML config file (default: ./pagegrab.yaml if present)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Do not retry with the browser after a connection failure
    #[arg(long)]
    no_fallback: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn load_config(cli: &Cli) -> Result<PagegrabConfig> {
    let loader = match &cli.config {
        Some(path) => PagegrabConfigLoader::new().with_file(path),
        None => PagegrabConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let mut cfg = loader.load().context("failed to load configuration")?;
    if let Some(dir) = &cli.output_dir {
        cfg.output_dir = dir.clone();
    }
    Ok(cfg)
}

fn print_result(result: &ScrapeResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    match result {
        ScrapeResult::Success {
            folder_path,
            image_count,
            method,
            skipped_images,
            ..
        } => {
            println!("Saved to {}", folder_path.display());
            println!("Images: {image_count} ({} skipped)", skipped_images.len());
            println!("Method: {method}");
        }
        ScrapeResult::Failure { message, .. } => {
            eprintln!("Scrape failed: {message}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Config first: it decides where logs go.
    let cfg = load_config(&cli)?;
    let log_path = init_logging(cfg.logging.to_log_config())?;
    tracing::debug!(log = %log_path.display(), "logging initialised");

    let scraper = Scraper::from_config(&cfg)?.with_fallback(!cli.no_fallback);
    tracing::info!(
        url = %cli.url,
        strategy = %cli.strategy,
        output_dir = %scraper.output_dir().display(),
        "pagegrab.start"
    );

    let result = scraper.scrape(&cli.url, cli.strategy).await;
    print_result(&result, cli.json)?;

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_all_flags() {
        let cli = Cli::try_parse_from([
            "pagegrab",
            "example.com",
            "--strategy",
            "browser",
            "--output-dir",
            "/tmp/out",
            "--no-fallback",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.url, "example.com");
        assert_eq!(cli.strategy, FetchMethod::Browser);
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/out")));
        assert!(cli.no_fallback);
        assert!(cli.json);
    }

    #[test]
    fn strategy_defaults_to_http() {
        let cli = Cli::try_parse_from(["pagegrab", "example.com"]).unwrap();
        assert_eq!(cli.strategy, FetchMethod::Http);
        assert!(!cli.no_fallback);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert!(Cli::try_parse_from(["pagegrab", "x", "--strategy", "ftp"]).is_err());
    }
}
