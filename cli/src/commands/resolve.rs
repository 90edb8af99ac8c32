use clap::Args;
use replydesk_core::Tone;
use replydesk_core::error::ErrorReport;
use replydesk_runtime::{AttemptStatus, QueryParams, ResolutionController, RuntimeConfig};

use crate::util::{
    EXIT_USAGE, exit_code, print_error, print_json, render_snapshot, status_report,
};

#[derive(Args)]
pub struct ResolveArgs {
    /// Requester email override, validated like manual entry and remembered
    #[arg(long)]
    pub email: Option<String>,

    /// Page query string used when no host is available (e.g. "email=a@b.co&subject=Hi")
    #[arg(long, default_value = "")]
    pub query: String,

    /// Reply tone: friendly or concise
    #[arg(long, default_value = "friendly")]
    pub tone: String,

    /// Print the full widget snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(config: &RuntimeConfig, args: ResolveArgs) -> i32 {
    let query = QueryParams::parse(&args.query);
    let controller = ResolutionController::from_config(config, query).await;
    controller.set_tone(Tone::parse_lenient(&args.tone));

    let status = match args.email.as_deref() {
        Some(raw) => match controller.submit_manual_email(raw).await {
            Ok(status) => status,
            Err(err) => {
                print_error(
                    &ErrorReport::new(err.code(), err.to_string())
                        .with_hint("Use the form local@domain.tld, e.g. Sincere@april.biz"),
                );
                return EXIT_USAGE;
            }
        },
        None => controller.refresh().await,
    };

    report(&controller, status, args.json)
}

/// Print the widget and any non-ready report; returns the exit code.
pub fn report(controller: &ResolutionController, status: AttemptStatus, json: bool) -> i32 {
    let snapshot = controller.snapshot();
    if json {
        print_json(&snapshot);
    } else {
        print!("{}", render_snapshot(&snapshot));
    }
    if let Some(report) = status_report(status, &snapshot) {
        print_error(&report);
    }
    exit_code(status)
}
