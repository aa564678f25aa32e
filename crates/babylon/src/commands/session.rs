//! Session commands against a running hub.

use anyhow::{Context, Result};
use serde::Serialize;

use babylon::client::HubClient;

/// Session operation selected on the command line.
pub enum SessionAction {
    New,
    Show { id: String },
    Log { id: String, message: String },
    End { id: String },
}

pub async fn run(server: &str, action: SessionAction) -> Result<()> {
    let client = HubClient::new(server);

    client
        .health()
        .await
        .with_context(|| format!("No hub reachable at {}", client.base_url()))?;

    match action {
        SessionAction::New => {
            let view = client
                .create_session()
                .await
                .context("Failed to create session")?;
            print_json(&view)
        }
        SessionAction::Show { id } => {
            let view = client
                .get_session(&id)
                .await
                .with_context(|| format!("Failed to fetch session {id}"))?;
            print_json(&view)
        }
        SessionAction::Log { id, message } => {
            let entry = client
                .log_message(&id, &message)
                .await
                .with_context(|| format!("Failed to log to session {id}"))?;
            print_json(&entry)
        }
        SessionAction::End { id } => {
            let view = client
                .end_session(&id)
                .await
                .with_context(|| format!("Failed to end session {id}"))?;
            print_json(&view)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
