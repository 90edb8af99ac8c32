use std::fmt::Write as _;

use replydesk_core::error::{ErrorReport, codes};
use replydesk_core::{Profile, ResolutionState};
use replydesk_runtime::{AttemptStatus, WidgetSnapshot};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Exit codes: 0=ready, 1=usage/validation error, 2=lookup error,
/// 3=customer not found or email missing, 4=attempt interrupted
pub const EXIT_OK: i32 = 0;
pub const EXIT_USAGE: i32 = 1;
pub const EXIT_LOOKUP_FAILED: i32 = 2;
pub const EXIT_NEEDS_EMAIL: i32 = 3;
pub const EXIT_INTERRUPTED: i32 = 4;

pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "replydesk=info,replydesk_runtime=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

pub fn print_error(report: &ErrorReport) {
    match serde_json::to_string_pretty(report) {
        Ok(text) => eprintln!("{text}"),
        Err(_) => eprintln!("{}: {}", report.error, report.message),
    }
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut report = ErrorReport::new(codes::CLI_ERROR, message);
    if let Some(hint) = docs_hint {
        report = report.with_hint(hint);
    }
    print_error(&report);
    std::process::exit(EXIT_USAGE);
}

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => exit_error(&format!("Failed to encode output: {e}"), None),
    }
}

pub fn exit_code(status: AttemptStatus) -> i32 {
    match status {
        AttemptStatus::Applied(ResolutionState::Ready) => EXIT_OK,
        AttemptStatus::Applied(ResolutionState::Error) => EXIT_LOOKUP_FAILED,
        AttemptStatus::Applied(ResolutionState::NotFound | ResolutionState::Missing) => {
            EXIT_NEEDS_EMAIL
        }
        AttemptStatus::Applied(ResolutionState::Idle | ResolutionState::Loading) => EXIT_OK,
        AttemptStatus::Discarded => EXIT_INTERRUPTED,
    }
}

/// Structured stderr report for attempts that did not end in `ready`.
pub fn status_report(status: AttemptStatus, snapshot: &WidgetSnapshot) -> Option<ErrorReport> {
    let state = match status {
        AttemptStatus::Discarded => {
            return Some(
                ErrorReport::new(
                    codes::LOOKUP_INTERRUPTED,
                    "Lookup was cancelled or timed out before finishing",
                )
                .with_hint("Run again, or raise --timeout-ms"),
            );
        }
        AttemptStatus::Applied(state) => state,
    };
    let guidance = state.guidance(snapshot.error.as_deref())?;
    let (code, hint) = match state {
        ResolutionState::Error => (codes::LOOKUP_FAILED, "Run the same command again to retry"),
        ResolutionState::NotFound => (codes::CUSTOMER_NOT_FOUND, "Try another email with --email"),
        _ => (codes::EMAIL_MISSING, "Pass --email or --query email=<addr>"),
    };
    Some(ErrorReport::new(code, guidance.message).with_hint(hint))
}

/// Plain-text rendering of the widget: status bar, ticket card, customer
/// card, guidance and the reply draft.
pub fn render_snapshot(snap: &WidgetSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} · tone {} · state {}",
        snap.host_mode.label(),
        snap.tone,
        snap.state
    );

    out.push_str("\nTicket\n");
    for (label, value) in snap.ticket.summary() {
        let _ = writeln!(out, "  {label:<12} {value}");
    }

    if matches!(snap.state, ResolutionState::Ready | ResolutionState::NotFound) {
        out.push_str("\nCustomer\n");
        for (label, value) in Profile::card(snap.profile.as_ref()) {
            let _ = writeln!(out, "  {label:<12} {value}");
        }
        if snap.activity.is_empty() {
            out.push_str("  No posts to show.\n");
        } else {
            out.push_str("  Last 3 posts\n");
            for (i, title) in snap.activity.titles().iter().enumerate() {
                let _ = writeln!(out, "    {}. {title}", i + 1);
            }
        }
    }

    if let Some(guidance) = snap.state.guidance(snap.error.as_deref()) {
        let _ = writeln!(out, "\n[{}] {}", guidance.title, guidance.message);
        if guidance.retry {
            out.push_str("  (retry with `refresh`)\n");
        }
    }

    if !snap.reply.is_empty() {
        out.push_str("\nReply draft\n");
        out.push_str(&snap.reply);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use replydesk_core::{ResolutionState, Ticket};
    use replydesk_runtime::{AttemptStatus, WidgetSnapshot};

    use super::{EXIT_INTERRUPTED, EXIT_NEEDS_EMAIL, exit_code, render_snapshot, status_report};

    #[test]
    fn exit_codes_follow_terminal_state() {
        assert_eq!(exit_code(AttemptStatus::Applied(ResolutionState::Ready)), 0);
        assert_eq!(exit_code(AttemptStatus::Applied(ResolutionState::Error)), 2);
        assert_eq!(
            exit_code(AttemptStatus::Applied(ResolutionState::Missing)),
            EXIT_NEEDS_EMAIL
        );
        assert_eq!(exit_code(AttemptStatus::Discarded), EXIT_INTERRUPTED);
    }

    #[test]
    fn error_report_carries_underlying_message() {
        let snap = WidgetSnapshot {
            state: ResolutionState::Error,
            error: Some("HTTP 500 Internal Server Error".to_string()),
            ..WidgetSnapshot::default()
        };
        let report =
            status_report(AttemptStatus::Applied(ResolutionState::Error), &snap).unwrap();
        assert_eq!(report.error, "lookup_failed");
        assert!(report.message.contains("500"));
        assert!(status_report(AttemptStatus::Applied(ResolutionState::Ready), &snap).is_none());
    }

    #[test]
    fn render_shows_guidance_and_hides_customer_card_when_missing() {
        let snap = WidgetSnapshot {
            state: ResolutionState::Missing,
            ticket: Ticket {
                subject: "Help with my account".to_string(),
                ..Ticket::default()
            },
            reply: "Hi there,".to_string(),
            ..WidgetSnapshot::default()
        };
        let text = render_snapshot(&snap);
        assert!(text.starts_with("Local mode · tone friendly · state missing"));
        assert!(text.contains("[Requester email missing]"));
        assert!(!text.contains("Customer\n"));
        assert!(text.ends_with("Hi there,\n"));
    }
}
