use serde::{Deserialize, Serialize};

use crate::profile::{ActivityDigest, Profile};
use crate::ticket::Ticket;

/// Hard cap on the description excerpt quoted inside a reply.
pub const REPLY_EXCERPT_CHARS: usize = 160;

const FALLBACK_NAME: &str = "there";
const FALLBACK_COMPANY: &str = "your company";
const FALLBACK_SUBJECT: &str = "your request";
const ACTIVITY_DELIMITER: &str = "; ";

/// Stylistic variant of the generated reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Friendly,
    Concise,
}

impl Tone {
    /// Lenient parse: anything that is not `concise` selects the friendly template.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("concise") {
            Self::Concise
        } else {
            Self::Friendly
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Friendly => "friendly",
            Self::Concise => "concise",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Character-based truncation: over `max` chars keeps `max - 1`, trims the
/// trailing whitespace and appends `…`.
pub fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

/// Deterministic reply text for the given inputs. Pure and total.
pub fn draft_reply(
    tone: Tone,
    ticket: &Ticket,
    profile: Option<&Profile>,
    activity: &ActivityDigest,
) -> String {
    let name = profile.and_then(Profile::name).unwrap_or(FALLBACK_NAME);
    let company = profile
        .and_then(Profile::company_name)
        .unwrap_or(FALLBACK_COMPANY);
    let city = profile
        .and_then(Profile::city)
        .map(|c| format!(" in {c}"))
        .unwrap_or_default();
    let subject = if ticket.subject.is_empty() {
        FALLBACK_SUBJECT
    } else {
        ticket.subject.as_str()
    };
    let desc = excerpt(&ticket.description, REPLY_EXCERPT_CHARS);
    let recent = if activity.is_empty() {
        String::new()
    } else {
        format!(
            " I also glanced at your recent posts ({}).",
            activity.titles().join(ACTIVITY_DELIMITER)
        )
    };

    let lines: Vec<Option<String>> = match tone {
        Tone::Concise => vec![
            Some(format!("Hi {name},")),
            Some(format!("Thanks for contacting us about \"{subject}\".")),
            (!desc.is_empty()).then(|| format!("Context noted: {desc}")),
            Some(format!("I’ve reviewed your account for {company}{city}.{recent}")),
            Some("Next steps:".to_string()),
            Some("• I can clarify the issue and propose a fix.".to_string()),
            Some("• Please confirm any extra details or screenshots.".to_string()),
            Some(String::new()),
            Some("Best,".to_string()),
            Some("Support".to_string()),
        ],
        Tone::Friendly => vec![
            Some(format!("Hi {name},")),
            Some(format!("Thanks so much for reaching out about “{subject}”.")),
            (!desc.is_empty()).then(|| format!("I read your note: {desc}")),
            Some(format!(
                "I took a quick look at your {company} account{city}.{recent}"
            )),
            Some("Here’s what I can do next:".to_string()),
            Some("• Review the details and suggest the quickest fix".to_string()),
            Some("• Share clear steps or make changes on your behalf if needed".to_string()),
            Some(String::new()),
            Some(
                "If you can, please confirm any extra context or screenshots so I can move faster."
                    .to_string(),
            ),
            Some(String::new()),
            Some("Warm regards,".to_string()),
            Some("Support".to_string()),
        ],
    };

    lines.into_iter().flatten().collect::<Vec<_>>().join("\n")
}
