//! Command-line walkthrough of the magic-link flow.
//!
//! ```text
//! magic-link login ada@example.com
//! magic-link link 'https://app.example.com/signin?token=...&email=ada%40example.com'
//! magic-link whoami
//! magic-link sessions
//! magic-link logout
//! ```
//!
//! The session is kept in `--store-dir` between invocations.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use mikroauth::prelude::*;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(version, about = "Sign in to a MikroAuth service with a magic link")]
struct Cli {
    /// Base URL of the auth service
    #[arg(long, env = "MIKROAUTH_URL", default_value = "http://localhost:3000")]
    url: String,

    /// Directory the session is persisted in
    #[arg(long, env = "MIKROAUTH_STORE_DIR", default_value = ".mikroauth")]
    store_dir: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, env = "MIKROAUTH_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Email a magic link
    Login { email: String },
    /// Verify a magic-link token by hand
    Verify {
        #[arg(long)]
        token: String,
        #[arg(long)]
        email: String,
    },
    /// Sign in with the full link URL from the email
    Link { url: String },
    /// Exchange the refresh token for a new pair
    Refresh,
    /// Show the session state, refreshing if it has expired
    Status,
    /// Show the identity claims of the access token (unverified)
    Whoami,
    /// List active sessions
    Sessions,
    /// Sign out
    Logout,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), MikroAuthError> {
    let auth = MikroAuth::builder()
        .base_url(cli.url)
        .timeout(Duration::from_secs(cli.timeout_secs))
        .build(FileStorage::new(cli.store_dir))?;

    match cli.command {
        Command::Login { email } => {
            let ack = auth.request_link(&email).await?;
            println!("magic link requested for {email}: {ack}");
        }
        Command::Verify { token, email } => {
            let tokens = auth.verify_link(&token, &email).await?;
            println!("signed in, token valid for {}s", tokens.expires_in);
        }
        Command::Link { url } => {
            let location = UrlLocation::parse(&url).map_err(|e| {
                tracing::debug!(error = %e, "not a URL");
                SessionError::VerificationFailed(format!("invalid link: {e}"))
            })?;
            if !auth.handle_incoming_link(&location).await {
                return Err(SessionError::VerificationFailed(
                    "link was missing parameters or was rejected".into(),
                )
                .into());
            }
            println!("signed in");
        }
        Command::Refresh => {
            let tokens = auth.refresh().await?;
            println!("refreshed, token valid for {}s", tokens.expires_in);
        }
        Command::Status => {
            let authenticated = auth.is_authenticated().await;
            let state = auth.session_state().await?;
            println!("state: {state}, authenticated: {authenticated}");
        }
        Command::Whoami => match auth.get_identity().await {
            Some(claims) => {
                let pretty = serde_json::to_string_pretty(&claims)
                    .unwrap_or_else(|_| format!("{claims:?}"));
                println!("{pretty}");
            }
            None => println!("not signed in"),
        },
        Command::Sessions => {
            let sessions = auth.get_sessions().await?;
            let pretty = serde_json::to_string_pretty(&sessions)
                .unwrap_or_else(|_| sessions.to_string());
            println!("{pretty}");
        }
        Command::Logout => match auth.logout().await? {
            LogoutOutcome::Remote(_) => println!("signed out"),
            LogoutOutcome::LocalOnly => println!("no session, cleared local state"),
        },
    }

    Ok(())
}
