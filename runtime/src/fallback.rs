use replydesk_core::Ticket;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SUBJECT: &str = "Help with my account";
pub const DEFAULT_DESCRIPTION: &str =
    "I have trouble accessing my dashboard and keep seeing a blank page.";

/// Page query parameters consulted when the host capability is not usable.
/// Empty values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pub email: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
}

impl QueryParams {
    /// Parse a query string (leading `?` optional). Later duplicates lose.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "email" => &mut params.email,
                "subject" => &mut params.subject,
                "description" => &mut params.description,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

/// Ticket built from ambient sources: query parameters first, then the
/// remembered manual email, then built-in example text. The email has no
/// canned default so an empty result lands in `missing`.
pub fn fallback_ticket(query: &QueryParams, remembered_email: Option<&str>) -> Ticket {
    Ticket {
        email: present(&query.email)
            .or(remembered_email.filter(|v| !v.is_empty()))
            .unwrap_or_default()
            .to_string(),
        subject: present(&query.subject).unwrap_or(DEFAULT_SUBJECT).to_string(),
        description: present(&query.description)
            .unwrap_or(DEFAULT_DESCRIPTION)
            .to_string(),
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
