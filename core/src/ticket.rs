use serde::{Deserialize, Serialize};

use crate::reply::excerpt;

/// Host field carrying the requester email.
pub const FIELD_REQUESTER_EMAIL: &str = "ticket.requester.email";
pub const FIELD_SUBJECT: &str = "ticket.subject";
pub const FIELD_DESCRIPTION: &str = "ticket.description";

/// The fixed field set requested from the host capability.
pub const TICKET_FIELDS: [&str; 3] = [FIELD_REQUESTER_EMAIL, FIELD_SUBJECT, FIELD_DESCRIPTION];

pub const SUMMARY_SUBJECT_CHARS: usize = 120;
pub const SUMMARY_DESCRIPTION_CHARS: usize = 220;

/// Placeholder shown for absent values at the presentation boundary.
pub const EMPTY_VALUE: &str = "—";

/// A support ticket as seen by the widget. `email` is always sanitized before use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub email: String,
    pub subject: String,
    pub description: String,
}

impl Ticket {
    pub fn has_email(&self) -> bool {
        !self.email.is_empty()
    }

    /// Display rows for the ticket card: (label, value).
    pub fn summary(&self) -> [(&'static str, String); 3] {
        [
            ("Email", or_placeholder(&self.email)),
            (
                "Subject",
                excerpt(&or_placeholder(&self.subject), SUMMARY_SUBJECT_CHARS),
            ),
            (
                "Description",
                excerpt(&or_placeholder(&self.description), SUMMARY_DESCRIPTION_CHARS),
            ),
        ]
    }
}

pub(crate) fn or_placeholder(value: &str) -> String {
    if value.is_empty() {
        EMPTY_VALUE.to_string()
    } else {
        value.to_string()
    }
}

/// Where the controller is in the resolution state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    #[default]
    Idle,
    Loading,
    Ready,
    #[serde(rename = "notfound")]
    NotFound,
    Missing,
    Error,
}

impl ResolutionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::NotFound => "notfound",
            Self::Missing => "missing",
            Self::Error => "error",
        }
    }

    /// States whose data is complete enough to redraft a reply from.
    pub fn allows_redraft(self) -> bool {
        matches!(self, Self::Ready | Self::NotFound | Self::Missing)
    }

    /// Message block the widget shows for non-happy terminal states.
    /// `error_message` is only used for [`ResolutionState::Error`].
    pub fn guidance(self, error_message: Option<&str>) -> Option<Guidance> {
        match self {
            Self::Missing => Some(Guidance {
                title: "Requester email missing",
                message: "Enter an email below to look up the customer profile and posts."
                    .to_string(),
                retry: false,
            }),
            Self::NotFound => Some(Guidance {
                title: "Customer not found",
                message: "No user matched this email on the public API. Try a different test email."
                    .to_string(),
                retry: false,
            }),
            Self::Error => Some(Guidance {
                title: "API error",
                message: error_message
                    .filter(|m| !m.is_empty())
                    .unwrap_or("Something went wrong while fetching data.")
                    .to_string(),
                retry: true,
            }),
            Self::Idle | Self::Loading | Self::Ready => None,
        }
    }
}

impl std::fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Guidance {
    pub title: &'static str,
    pub message: String,
    /// Whether a retry action should be offered.
    pub retry: bool,
}

/// Externally visible host status bit. Starts `Unknown` and only becomes
/// definite once an attempt has actually gone through one of the paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostMode {
    #[default]
    Unknown,
    Connected,
    Local,
}

impl HostMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Connected => "Host connected",
            Self::Unknown | Self::Local => "Local mode",
        }
    }
}
