//! `maildrop` - send one message through an SMTP server.
//!
//! ```text
//! maildrop <settings.json> <message-file>
//! ```
//!
//! The message file holds the full RFC 5322 message (headers, blank line,
//! body). The AUTH LOGIN password is read from `MAILDROP_PASSWORD`.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod settings;

use std::path::Path;

use anyhow::{Context, bail};
use maildrop_smtp::{Client, Envelope};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use settings::Settings;

/// Environment variable holding the AUTH LOGIN password.
const PASSWORD_VAR: &str = "MAILDROP_PASSWORD";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maildrop=info,maildrop_smtp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [settings_path, message_path] = args.as_slice() else {
        bail!("usage: maildrop <settings.json> <message-file>");
    };

    let settings = load_settings(Path::new(settings_path))?;
    let data = std::fs::read_to_string(message_path)
        .with_context(|| format!("failed to read message from {message_path}"))?;

    let password = std::env::var(PASSWORD_VAR).ok();
    if settings.username.is_some() && password.is_none() {
        bail!("{PASSWORD_VAR} must be set when a username is configured");
    }

    let envelope = Envelope::new(&settings.from, &settings.to, data)
        .context("invalid message")?;
    let client = Client::new(settings.to_config(password));

    info!(
        host = %client.config().hostname,
        recipients = envelope.recipients().len(),
        "Sending message"
    );
    client
        .send(&envelope)
        .await
        .with_context(|| format!("failed to send via {}", client.config().hostname))?;

    info!("Done");
    Ok(())
}

fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid settings in {}", path.display()))
}
