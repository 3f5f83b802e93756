use anyhow::{Context, Result};
use context_migrator::{
    api::client::LaunchDarklyClient, config::Config, error::ConfigError, migration::Migrator,
};
use envconfig::Envconfig;
use tracing::info;

fn main() {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    match run() {
        Ok(_) => info!("All done!"),
        Err(e) => {
            eprintln!("Oops! {e}");

            let mut causes = e.chain().skip(1).peekable();
            if causes.peek().is_some() {
                eprintln!("\nCaused by:");
                for (index, err) in causes.enumerate() {
                    eprintln!("    {index}: {err}");
                }
            }
            std::process::exit(1);
        }
    }
}

fn run() -> Result<()> {
    let config = Config::init_from_env().map_err(ConfigError::from)?;
    let settings = config.into_settings()?;
    settings.log_schema();

    let client = LaunchDarklyClient::from_settings(&settings)?;
    let summary = Migrator::new(&settings, &client)
        .run()
        .context("Failed to fetch feature flags")?;

    println!();
    print!("{summary}");
    Ok(())
}
