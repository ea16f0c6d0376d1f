use clap::Parser;
use llm_chat::cli::{run, Args};
use log::LevelFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    run(args).await?;
    Ok(())
}
