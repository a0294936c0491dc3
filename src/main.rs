use anyhow::Result;
use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let app = cli::App::parse();
    cli::runtime::init_tracing(app.verbose)?;
    cli::dispatch(app).await
}
