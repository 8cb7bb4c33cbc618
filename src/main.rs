use std::sync::Arc;

use clap::Parser;
use moodiary::api::{DiaryBackend, HttpBackend};
use moodiary::auth::UserStore;
use moodiary::cli::{self, Cli, Command};
use moodiary::config::Config;
use moodiary::{build_app, db};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let pool = db::init_pool(&config.database_url).await?;
    let backend: Arc<dyn DiaryBackend> = Arc::new(HttpBackend::new(&config.api_url)?);

    match args.subcommand() {
        Command::Serve => {
            let app = build_app(pool, backend, config.cache_ttl);
            let addr = config.listen_addr();
            let listener = TcpListener::bind(&addr).await?;

            tracing::info!(backend = %config.api_url, "listening on {}", addr);
            axum::serve(listener, app).await?;
        }
        Command::Backup { dir } => {
            let dir = dir.unwrap_or(config.backup_dir);
            let path = cli::create_backup(backend.as_ref(), &UserStore::new(pool), &dir).await?;
            println!("Backup created at {}", path.display());
        }
        Command::Restore { file } => {
            let restored = cli::restore_backup(
                backend.as_ref(),
                &UserStore::new(pool),
                file.as_deref(),
                &config.backup_dir,
            )
            .await?;
            println!("Restored {restored} entries");
        }
    }

    Ok(())
}
