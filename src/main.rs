use anyhow::Result;
use fritz_sweep::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    fritz_sweep::init_tracing();
    let cli = Cli::parse();
    fritz_sweep::sweep::run(cli).await
}
