use clarityco::app;
use clarityco::settings::Settings;

/// Entry point for the web site: load configuration, then hand off to
/// the application runner.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::new()?;
    log::info!("{} v{}", settings.app_name, settings.version);

    app::run(settings).await
}
