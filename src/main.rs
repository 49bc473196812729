use telemint_rs::cli::Cli;
use telemint_rs::utils::init_logger;


#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger()?;
    let cli = Cli::parse_args();
    cli.execute().await?;
    Ok(())
}
