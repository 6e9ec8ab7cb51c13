//! Registers a user and prints their API token.
//!
//! Usage: `create_user <email> [name]`. The token is shown once; only its
//! hash is stored.

use anyhow::{Context, bail};
use db::{DBService, models::user::User};
use server::middleware::auth::{generate_token, hash_token};
use services::services::config::Config;
use utils::assets::config_path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(email) = args.next() else {
        bail!("usage: create_user <email> [name]");
    };
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        bail!("{email} is not an email address");
    }
    let name = args.next();

    let config = Config::load(&config_path()).await?;
    let db = DBService::new(&config.database_path(), config.sqlite_max_connections)
        .await
        .context("opening database")?;

    if User::find_by_email(&db.pool, &email).await?.is_some() {
        bail!("a user with email {email} already exists");
    }

    let token = generate_token();
    let user = User::create(&db.pool, name.as_deref(), &email, &hash_token(&token)).await?;
    db.shutdown().await;

    println!("user id: {}", user.id);
    println!("token:   {token}");
    Ok(())
}
