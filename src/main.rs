use anyhow::Context;
use clap::{Parser, Subcommand};

mod app;
mod auth;
mod companies;
mod config;
mod error;
mod jobs;
mod state;

use crate::auth::services::validate_new_account;
use crate::state::AppState;

/// Company and job explorer backend.
#[derive(Parser, Debug)]
#[command(name = "tci-portal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Create a superuser account
    CreateAdmin {
        #[arg(long, env = "ADMIN_EMAIL", default_value = "admin@example.com")]
        email: String,
        #[arg(long, env = "ADMIN_PASSWORD")]
        password: String,
        #[arg(long, env = "ADMIN_FULL_NAME", default_value = "Admin User")]
        full_name: String,
    },
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tci_portal=debug,axum=info,tower_http=info,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let app_state = AppState::init().await?;
    tracing::info!(env = %app_state.config.env, "configuration loaded");

    sqlx::migrate!("./migrations")
        .run(&app_state.db)
        .await
        .context("run migrations")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => app::serve(app::build_app(app_state)).await,
        Command::CreateAdmin {
            email,
            password,
            full_name,
        } => {
            let email = email.trim();
            validate_new_account(
                email,
                &password,
                Some(full_name.as_str()),
                app_state.config.auth.password_min_length,
            )?;
            let user = app_state
                .gate
                .credentials()
                .register_superuser(email, &password, Some(full_name.as_str()))
                .await?;
            tracing::info!(user_id = %user.id, email = %user.email, "admin user created");
            Ok(())
        }
    }
}
