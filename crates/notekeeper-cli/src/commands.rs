use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use tracing::{debug, warn};

use notekeeper_core::auth::SessionData;
use notekeeper_core::models::{AuthResponse, Note, NoteInput};
use notekeeper_core::{
    ApiError, AuthClient, Config, HttpTransport, NotesApi, NotesStore, Session, SessionStore,
};

use crate::{Cli, Command};

/// Environment variable supplying the password non-interactively
const PASSWORD_ENV: &str = "NOTEKEEPER_PASSWORD";

/// Characters of content shown per note in `list`
const PREVIEW_CHARS: usize = 60;

type Api = NotesApi<HttpTransport, Session>;

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        Config::default()
    });

    let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
    debug!(?cache_dir, "Cache directory configured");

    let session = Arc::new(Session::new(cache_dir));
    if let Err(e) = session.load() {
        warn!(error = %e, "Failed to load session");
    }

    let api_base = config.api_base();
    debug!(%api_base, "Using notes server");
    let transport = HttpTransport::new(api_base)?;
    let api = NotesApi::new(AuthClient::new(transport, Arc::clone(&session)));

    match cli.command {
        Command::Register { email } => {
            let email = resolve_email(email, &config)?;
            let password = read_password()?;
            let auth = api.register(&email, &password).await.map_err(describe)?;
            remember_email(&mut config, &email);
            println!("{}", welcome(&auth, "Registered"));
        }
        Command::Login { email } => {
            let email = resolve_email(email, &config)?;
            let password = read_password()?;
            let auth = api.login(&email, &password).await.map_err(describe)?;
            remember_email(&mut config, &email);
            println!("{}", welcome(&auth, "Logged in"));
        }
        Command::Logout => {
            api.logout();
            println!("Logged out");
        }
        Command::Whoami => {
            require_session(&session)?;
            let user = session.user().context("Session disappeared")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                println!("{}", user.display_name());
                if let Some(data) = session.data() {
                    println!("{}", expiry_line(&data, session.is_valid()));
                }
            }
        }
        Command::List => {
            require_session(&session)?;
            list(&api, cli.json).await?;
        }
        Command::Show { id } => {
            require_session(&session)?;
            let note = api.get_note(&id).await.map_err(describe)?;
            print_note(&note, cli.json)?;
        }
        Command::Add { title, content } => {
            require_session(&session)?;
            let mut notes = NotesStore::new();
            let note = notes
                .create(&api, &NoteInput::new(&title, &content))
                .await
                .map_err(describe)?;
            print_note(&note, cli.json)?;
        }
        Command::Edit { id, title, content } => {
            require_session(&session)?;
            let mut notes = NotesStore::new();
            let note = notes
                .update(&api, &id, &NoteInput::new(&title, &content))
                .await
                .map_err(describe)?;
            print_note(&note, cli.json)?;
        }
        Command::Rm { id } => {
            require_session(&session)?;
            let mut notes = NotesStore::new();
            notes.delete(&api, &id).await.map_err(describe)?;
            println!("Deleted {}", id);
        }
    }

    Ok(())
}

async fn list(api: &Api, json: bool) -> Result<()> {
    let mut notes = NotesStore::new();
    notes.fetch(api).await;
    if let Some(error) = notes.error() {
        bail!("{}", error);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(notes.notes())?);
        return Ok(());
    }

    if notes.notes().is_empty() {
        println!("No notes yet");
        return Ok(());
    }
    for note in notes.notes() {
        println!(
            "{}  {}  {}  {}",
            note.id,
            format_time(note.updated_at),
            note.title,
            note.preview(PREVIEW_CHARS)
        );
    }
    Ok(())
}

/// Commands that talk to the notes routes need a session first.
fn require_session(session: &Session) -> Result<()> {
    if !session.is_authenticated() {
        bail!("Not logged in. Run `notekeeper login` first.");
    }
    if session.is_token_expired() {
        debug!("Saved token is past its expiry");
    }
    Ok(())
}

fn resolve_email(email: Option<String>, config: &Config) -> Result<String> {
    email
        .or_else(|| config.last_email.clone())
        .context("No email given. Pass --email <address>.")
}

fn remember_email(config: &mut Config, email: &str) {
    config.last_email = Some(email.to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
}

fn read_password() -> Result<String> {
    match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => Ok(password),
        _ => rpassword::prompt_password("Password: ").context("Failed to read password"),
    }
}

fn print_note(note: &Note, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(note)?);
    } else {
        println!("{}  ({})", note.title, note.id);
        println!("Updated {}", format_time(note.updated_at));
        println!();
        println!("{}", note.content);
    }
    Ok(())
}

/// Server's message when it sent one, e.g. "Login successful"
fn welcome(auth: &AuthResponse, fallback: &str) -> String {
    let message = auth.message.as_deref().filter(|m| !m.is_empty()).unwrap_or(fallback);
    format!("{} as {}", message, auth.user.display_name())
}

fn expiry_line(data: &SessionData, valid: bool) -> String {
    let when = format_time(Some(data.expires_at()));
    if !valid {
        return format!("Token expired {}", when);
    }
    let left = data.time_until_expiry();
    if left.num_days() >= 1 {
        format!("Token expires {} ({} days left)", when, left.num_days())
    } else {
        format!("Token expires {} ({} hours left)", when, left.num_hours())
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Prefer the server's own message for display
fn describe(error: ApiError) -> anyhow::Error {
    match error {
        ApiError::Network(_) | ApiError::NotAuthenticated | ApiError::Validation(_) => error.into(),
        _ => anyhow::anyhow!(error.server_message()),
    }
}
