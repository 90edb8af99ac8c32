use clap::Subcommand;
use replydesk_core::error::{ErrorReport, codes};
use replydesk_runtime::{RuntimeConfig, SessionStore};
use serde_json::json;

use crate::util::{EXIT_OK, EXIT_USAGE, print_error, print_json};

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Show the remembered manual email
    Show,
    /// Forget the remembered manual email
    Clear,
}

pub async fn run(config: &RuntimeConfig, command: SessionCommands) -> i32 {
    let store = SessionStore::from_state_dir(config.state_dir.as_deref());
    match command {
        SessionCommands::Show => {
            let path = store.path().map(|p| p.display().to_string());
            match store.load().await {
                Some(session) => print_json(&json!({
                    "path": path,
                    "manual_email": session.manual_email,
                    "saved_at": session.saved_at,
                })),
                None => print_json(&json!({ "path": path, "manual_email": null })),
            }
            EXIT_OK
        }
        SessionCommands::Clear => match store.clear().await {
            Ok(()) => {
                print_json(&json!({ "cleared": true }));
                EXIT_OK
            }
            Err(e) => {
                print_error(
                    &ErrorReport::new(codes::CLI_ERROR, e.to_string())
                        .with_hint("Check permissions on --state-dir"),
                );
                EXIT_USAGE
            }
        },
    }
}
