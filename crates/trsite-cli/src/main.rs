//! trsite - command-line login for the tr-site API.
//!
//! Logs in, registers and logs out against the Django backend, keeping the
//! session on disk so later runs (and other tools sharing the store) start
//! out authenticated.

use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trsite_core::auth::CredentialStore;
use trsite_core::{
    ApiError, AuthError, Config, Credentials, DjangoClient, FileStore, Registration, Session,
    SessionAuthenticator,
};

type Authenticator = SessionAuthenticator<DjangoClient, FileStore>;

const USAGE: &str = "\
Usage:
  trsite login [username] [--remember]
  trsite register <username> [email] [first_name] [last_name]
  trsite logout [--forget]
  trsite whoami";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };
    let rest = &args[1..];
    let flag = |name: &str| rest.iter().any(|a| a == name);
    let positional: Vec<&str> = rest
        .iter()
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .collect();

    let mut config = Config::load()?;
    let auth = build_authenticator(&config)?;

    // Report every session change, the way a menu would react to it
    auth.subscribe(|session| match session {
        Some(s) => info!(user = ?s.display_name(), "Session active"),
        None => info!("No active session"),
    })
    .detach();

    match command.as_str() {
        "login" => {
            let username = match positional.first() {
                Some(u) => u.to_string(),
                None => config
                    .last_username
                    .clone()
                    .context("No username given and none remembered")?,
            };
            login(&auth, &username, flag("--remember")).await?;
            config.last_username = Some(username);
            config.save()?;
        }
        "register" => {
            let Some(username) = positional.first() else {
                bail!("register needs a username\n{}", USAGE);
            };
            let password = prompt_password(username)?;
            let mut profile = Registration::new(*username, password);
            profile.email = positional.get(1).map(|s| s.to_string());
            profile.first_name = positional.get(2).map(|s| s.to_string());
            profile.last_name = positional.get(3).map(|s| s.to_string());
            let session = auth.register(&profile).await?;
            println!("Registered {}", session.display_name().unwrap_or_else(|| username.to_string()));
            config.last_username = Some(username.to_string());
            config.save()?;
        }
        "logout" => {
            if let Some(task) = auth.logout() {
                // Wait for the server so the process doesn't exit mid-request
                wait_for_remote_logout(task).await;
            }
            if flag("--forget") {
                if let Some(ref username) = config.last_username {
                    CredentialStore::delete(username)?;
                }
            }
            println!("Logged out");
        }
        "whoami" => match auth.current() {
            Some(session) => println!(
                "Logged in as {}",
                session
                    .display_name()
                    .or_else(|| config.last_username.clone())
                    .unwrap_or_else(|| "unknown user".to_string())
            ),
            None => println!("Not logged in"),
        },
        other => bail!("Unknown command '{}'\n{}", other, USAGE),
    }

    Ok(())
}

fn build_authenticator(config: &Config) -> Result<Authenticator> {
    let client = DjangoClient::with_scheme(&config.api_base_url, &config.auth_scheme)
        .context("Failed to create API client")?;
    let store = FileStore::new(config.store_dir()?).context("Failed to open session store")?;
    info!(api = %config.api_base_url, "Using API");
    Ok(SessionAuthenticator::new(Arc::new(client), store))
}

async fn login(auth: &Authenticator, username: &str, remember: bool) -> Result<()> {
    let session = match CredentialStore::get_password(username) {
        Ok(saved) => match auth.login(&Credentials::new(username, saved)).await {
            Err(e) if is_rejected_password(&e) => {
                // Saved password is stale, ask for the current one
                warn!("Saved password was rejected");
                login_with_prompt(auth, username, true).await?
            }
            other => other.context("Login failed")?,
        },
        Err(_) => login_with_prompt(auth, username, remember).await?,
    };

    println!(
        "Logged in as {}",
        session.display_name().unwrap_or_else(|| username.to_string())
    );
    Ok(())
}

/// Prompt for the password and log in, saving the password on success
/// when `remember` is set
async fn login_with_prompt(auth: &Authenticator, username: &str, remember: bool) -> Result<Session> {
    let password = prompt_password(username)?;
    let session = auth
        .login(&Credentials::new(username, password.clone()))
        .await
        .context("Login failed")?;
    if remember {
        CredentialStore::store(username, &password)?;
    }
    Ok(session)
}

fn prompt_password(username: &str) -> Result<String> {
    rpassword::prompt_password(format!("Password for {}: ", username))
        .context("Failed to read password")
}

fn is_rejected_password(err: &AuthError) -> bool {
    matches!(err, AuthError::Api(ApiError::Unauthorized(_)))
}

/// Wait for the background logout call. Returns false if the task died.
async fn wait_for_remote_logout(task: JoinHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Remote logout task failed");
            false
        }
    }
}
