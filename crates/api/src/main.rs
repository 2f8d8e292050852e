//! Coaching API server.
//!
//! `coach-api` serves the API. Two subcommands manage bearer tokens and exit:
//!
//! - `coach-api issue-token <user_id>` prints a new token for a user
//! - `coach-api revoke-token <token>` revokes a token

use std::sync::Arc;

use api::auth::{issue_token, revoke_issued_token};
use api::{AppState, Config};
use coach_core::ChatClient;
use coaching::{seed_template, CoachConfig, TemplateFile, DEFAULT_TEMPLATE_JSON};
use database::Database;
use gateway_client::GatewayClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wechat::WechatConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("issue-token") => {
            let user_id = args.get(2).ok_or("usage: coach-api issue-token <user_id>")?;
            let token = issue_token(&db, user_id).await?;
            println!("{token}");
            return Ok(());
        }
        Some("revoke-token") => {
            let token = args.get(2).ok_or("usage: coach-api revoke-token <token>")?;
            if revoke_issued_token(&db, token).await? {
                info!("Token revoked");
            } else {
                warn!("Token was not on record");
            }
            return Ok(());
        }
        _ => {}
    }

    // Bundled coach template
    let template = TemplateFile::parse(DEFAULT_TEMPLATE_JSON)?;
    if seed_template(&db, &template).await? {
        info!(coach = %template.coach_key, "Seeded default coach template");
    }

    let chat: Option<Arc<dyn ChatClient>> = match GatewayClient::from_env() {
        Ok(client) => {
            info!(model = %client.config().model, "Model gateway configured");
            Some(Arc::new(client) as Arc<dyn ChatClient>)
        }
        Err(e) => {
            warn!("Model gateway not configured, coach routes disabled: {}", e);
            None
        }
    };

    let wechat = match WechatConfig::from_env().and_then(|c| c.msg_crypt()) {
        Ok(crypt) => {
            info!(app_id = %crypt.app_id(), "WeChat callback configured");
            Some(crypt)
        }
        Err(e) => {
            warn!("WeChat callback disabled: {}", e);
            None
        }
    };

    let state = AppState::new(
        db,
        chat,
        CoachConfig::from_env(),
        wechat,
        config.login_ttl_secs,
    );
    let app = api::app(state);

    // Start server
    info!(addr = %config.addr, "Coaching API listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
