use std::sync::Arc;

use clap::Args;
use replydesk_core::error::ErrorReport;
use replydesk_core::{QuickPick, ResolutionState, Tone};
use replydesk_runtime::{AttemptStatus, QueryParams, ResolutionController, RuntimeConfig};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::util::{exit_code, print_error, render_snapshot};

#[derive(Args)]
pub struct WatchArgs {
    /// Page query string used when no host is available
    #[arg(long, default_value = "")]
    pub query: String,

    /// Initial reply tone: friendly or concise
    #[arg(long, default_value = "friendly")]
    pub tone: String,
}

const HELP: &str = "commands: refresh | email <addr> | tone <friendly|concise> | regenerate | \
edit | copy | show | next | prev | help | quit";

#[derive(Debug, PartialEq, Eq)]
enum WatchCommand {
    Refresh,
    Email(String),
    Tone(Tone),
    Regenerate,
    Edit,
    Copy,
    Show,
    Next,
    Prev,
    Help,
    Quit,
    Unknown(String),
}

impl WatchCommand {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let cmd = match word.to_ascii_lowercase().as_str() {
            "refresh" | "r" | "retry" => Self::Refresh,
            "email" | "e" => Self::Email(rest.to_string()),
            "tone" | "t" => Self::Tone(Tone::parse_lenient(rest)),
            "regenerate" | "g" => Self::Regenerate,
            "edit" => Self::Edit,
            "copy" | "c" => Self::Copy,
            "show" | "s" => Self::Show,
            "next" | "n" => Self::Next,
            "prev" | "p" => Self::Prev,
            "help" | "h" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            _ => Self::Unknown(word.to_string()),
        };
        Some(cmd)
    }
}

pub async fn run(config: &RuntimeConfig, args: WatchArgs) -> i32 {
    let controller = Arc::new(
        ResolutionController::from_config(config, QueryParams::parse(&args.query)).await,
    );
    controller.set_tone(Tone::parse_lenient(&args.tone));

    let mut updates = controller.subscribe();
    let printer = tokio::spawn(async move {
        let mut last = None;
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            let key = (snapshot.state, snapshot.generation);
            if last == Some(key) {
                continue;
            }
            last = Some(key);
            if snapshot.state == ResolutionState::Loading {
                println!("{} · loading…", snapshot.host_mode.label());
            } else {
                println!("{}", render_snapshot(&snapshot));
            }
        }
    });

    eprintln!("{HELP}");
    spawn_refresh(&controller);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "stdin closed");
                break;
            }
        };
        let Some(cmd) = WatchCommand::parse(&line) else {
            continue;
        };
        match cmd {
            WatchCommand::Refresh => spawn_refresh(&controller),
            WatchCommand::Email(raw) => spawn_submit(&controller, raw),
            WatchCommand::Tone(tone) => {
                controller.set_tone(tone);
                println!("tone {tone}");
                print_reply(&controller);
            }
            WatchCommand::Regenerate => {
                if controller.regenerate_reply() {
                    print_reply(&controller);
                } else {
                    eprintln!("nothing to regenerate in state {}", controller.state());
                }
            }
            WatchCommand::Edit => {
                eprintln!("enter the reply, finish with a lone '.'");
                let mut text = Vec::new();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line == "." {
                        break;
                    }
                    text.push(line);
                }
                controller.edit_reply(text.join("\n"));
            }
            WatchCommand::Copy => print_reply(&controller),
            WatchCommand::Show => println!("{}", render_snapshot(&controller.snapshot())),
            WatchCommand::Next => spawn_pick(&controller, true),
            WatchCommand::Prev => spawn_pick(&controller, false),
            WatchCommand::Help => eprintln!("{HELP}"),
            WatchCommand::Quit => break,
            WatchCommand::Unknown(word) => eprintln!("unknown command `{word}`; {HELP}"),
        }
    }

    controller.cancel();
    printer.abort();
    match controller.state() {
        ResolutionState::Idle | ResolutionState::Loading => 0,
        state => exit_code(AttemptStatus::Applied(state)),
    }
}

fn spawn_refresh(controller: &Arc<ResolutionController>) {
    let controller = Arc::clone(controller);
    tokio::spawn(async move {
        let status = controller.refresh().await;
        tracing::debug!(?status, "refresh finished");
    });
}

fn spawn_submit(controller: &Arc<ResolutionController>, raw: String) {
    let controller = Arc::clone(controller);
    tokio::spawn(async move {
        if let Err(err) = controller.submit_manual_email(&raw).await {
            print_error(&ErrorReport::new(err.code(), err.to_string()));
        }
    });
}

/// Move through the presets relative to the last applied manual email.
fn spawn_pick(controller: &Arc<ResolutionController>, forward: bool) {
    let current = controller.snapshot().manual_email;
    let pick = QuickPick::default();
    let email = if forward {
        pick.next(current.as_deref())
    } else {
        pick.previous(current.as_deref())
    };
    if let Some(email) = email {
        println!("preset {email}");
        spawn_submit(controller, email.to_string());
    }
}

fn print_reply(controller: &ResolutionController) {
    let reply = controller.reply();
    if reply.is_empty() {
        eprintln!("no reply drafted yet");
    } else {
        println!("{reply}");
    }
}
