use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rangefetch::download;

#[derive(Parser)]
#[command(name = "rangefetch")]
#[command(about = "Download a file over HTTP with parallel range requests")]
#[command(version = "0.1")]
struct Cli {
    #[arg(help = "URL of the resource")]
    url: String,
    #[arg(short, long, help = "destination path, a temp file when omitted")]
    output: Option<PathBuf>,
    #[arg(short, long, help = "concurrency", default_value_t = 10)]
    concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let path = download(&cli.url, cli.concurrency, cli.output).await?;
    println!("{}", path.display());

    Ok(())
}
