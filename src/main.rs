use clap::Parser;
use cubalink_admin::{jobs, settings, storage, web};
use miette::Result;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "cubalink-admin",
    version,
    about = "Cubalink23 administration backend"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = settings::Settings::load(&cli.config)?;
    tracing::info!(
        port = settings.server.port,
        supabase = settings.supabase.is_configured(),
        duffel = !settings.duffel.api_key.is_empty(),
        square_environment = %settings.square.environment,
        "Loaded configuration"
    );

    // local fallback store
    let db = storage::init(&settings.database).await?;

    // background cleanup of expired admin sessions
    let _scheduler = jobs::init_scheduler(db.clone()).await?;

    let state = web::AppState::new(settings, db)?;
    web::serve(state).await?;
    Ok(())
}
