use clap::Parser as ClapParser;
use page_parser::{HtmlEnvironment, ParseConfig, Parser, ParserConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Extract structured data from a page with a JSON rule file.
#[derive(ClapParser, Debug)]
#[command(name = "page-parser", version, about)]
struct Cli {
    /// Parse config: `{"rules": .., "actions": [..], "pagination": {..}}`
    #[arg(short, long)]
    rules: PathBuf,

    /// Saved HTML document to parse
    #[arg(long, conflicts_with = "url")]
    html: Option<PathBuf>,

    /// Live page to open in Chrome
    #[arg(long)]
    url: Option<String>,

    /// Parser settings (waits, pagination, snapshots)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let parse_config = ParseConfig::from_json(&std::fs::read_to_string(&cli.rules)?)?;
    let parser_config = match &cli.config {
        Some(path) => ParserConfig::from_file(path)?,
        None => ParserConfig::default(),
    };

    let parser = match (&cli.html, &cli.url) {
        (Some(path), _) => {
            info!(path = %path.display(), "parsing saved document");
            Parser::new(Arc::new(HtmlEnvironment::from_file(path)?))
        }
        (None, Some(url)) => chrome_parser(url, cli.headed)?,
        (None, None) => return Err("either --html or --url is required".into()),
    }
    .with_config(parser_config);

    match parser.parse(&parse_config).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "parse failed");
            Err(e.into())
        }
    }
}

#[cfg(feature = "chrome")]
fn chrome_parser(url: &str, headed: bool) -> Result<Parser, Box<dyn std::error::Error>> {
    use page_parser::{ChromeConfig, ChromeEnvironment};

    info!(url, "parsing live page");
    let config = ChromeConfig {
        headless: !headed,
        ..Default::default()
    };
    Ok(Parser::new(Arc::new(
        ChromeEnvironment::new(config).with_start_url(url),
    )))
}

#[cfg(not(feature = "chrome"))]
fn chrome_parser(_url: &str, _headed: bool) -> Result<Parser, Box<dyn std::error::Error>> {
    Err("built without the `chrome` feature".into())
}
