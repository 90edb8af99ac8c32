use std::time::Duration;

use clap::Subcommand;
use replydesk_core::error::{ErrorReport, codes};
use replydesk_core::{QuickPick, ResolutionState};
use replydesk_runtime::{AttemptStatus, QueryParams, ResolutionController, RuntimeConfig};
use serde_json::json;

use crate::commands::resolve::report;
use crate::util::{EXIT_LOOKUP_FAILED, EXIT_OK, EXIT_USAGE, print_error, print_json};

#[derive(Subcommand)]
pub enum PresetCommands {
    /// List the preset emails
    List,
    /// Apply the preset after the current one (wraps around)
    Next {
        /// Start from this email instead of the remembered one
        #[arg(long)]
        from: Option<String>,
    },
    /// Apply the preset before the current one (wraps around)
    Prev {
        /// Start from this email instead of the remembered one
        #[arg(long)]
        from: Option<String>,
    },
    /// Apply every preset in order and report each terminal state
    RunAll {
        /// Pause between presets
        #[arg(long, default_value_t = 500)]
        delay_ms: u64,
    },
}

pub async fn run(config: &RuntimeConfig, command: PresetCommands) -> i32 {
    let controller = ResolutionController::from_config(config, QueryParams::default()).await;
    let pick = QuickPick::default();

    match command {
        PresetCommands::List => {
            let current = controller.snapshot().manual_email;
            let items: Vec<_> = pick
                .emails()
                .iter()
                .map(|email| json!({"email": email, "current": current.as_deref() == Some(email.as_str())}))
                .collect();
            print_json(&items);
            EXIT_OK
        }
        PresetCommands::Next { from } => {
            let current = from.or(controller.snapshot().manual_email);
            apply(&controller, pick.next(current.as_deref())).await
        }
        PresetCommands::Prev { from } => {
            let current = from.or(controller.snapshot().manual_email);
            apply(&controller, pick.previous(current.as_deref())).await
        }
        PresetCommands::RunAll { delay_ms } => run_all(&controller, pick, delay_ms).await,
    }
}

async fn apply(controller: &ResolutionController, email: Option<&str>) -> i32 {
    let Some(email) = email else {
        print_error(&ErrorReport::new(codes::CLI_ERROR, "No preset emails configured"));
        return EXIT_USAGE;
    };
    match controller.submit_manual_email(email).await {
        Ok(status) => report(controller, status, false),
        Err(err) => {
            print_error(&ErrorReport::new(err.code(), err.to_string()));
            EXIT_USAGE
        }
    }
}

async fn run_all(controller: &ResolutionController, pick: QuickPick<'_>, delay_ms: u64) -> i32 {
    let mut results = Vec::with_capacity(pick.emails().len());
    let mut failed = false;
    for email in pick.emails() {
        let status = controller.submit_manual_email(email).await;
        let state = match &status {
            Ok(AttemptStatus::Applied(state)) => state.as_str(),
            Ok(AttemptStatus::Discarded) => "interrupted",
            Err(_) => "invalid",
        };
        failed |= matches!(status, Ok(AttemptStatus::Applied(ResolutionState::Error)));
        let snapshot = controller.snapshot();
        tracing::info!(email = %email, state, "preset applied");
        results.push(json!({
            "email": email,
            "state": state,
            "name": snapshot.profile.as_ref().and_then(|p| p.name()),
            "posts": snapshot.activity.len(),
            "error": snapshot.error,
        }));
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
    print_json(&results);
    if failed { EXIT_LOOKUP_FAILED } else { EXIT_OK }
}
