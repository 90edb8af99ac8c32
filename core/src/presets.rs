use std::sync::LazyLock;

use crate::email::sanitize_email;

/// Raw preset list as it was handed over; some entries carry stray spaces.
pub const RAW_PRESET_EMAILS: [&str; 10] = [
    "Sincere@april.biz",
    "Shanna@melissa.tv",
    "Nathan@yesenia.net",
    "Julianne.OConner@kory.org",
    "Lucio_Hettinger@annie.ca",
    "Karley_Dach@jasper.info",
    "Telly. Hoeger@billy.biz",
    "Sherwood@rosamond.me",
    "Chaim_McDermott@dana.io",
    "Rey. Padberg@karina.biz",
];

static PRESET_EMAILS: LazyLock<Vec<String>> = LazyLock::new(|| {
    let mut seen = Vec::with_capacity(RAW_PRESET_EMAILS.len());
    for raw in RAW_PRESET_EMAILS {
        let email = sanitize_email(raw);
        if !seen.contains(&email) {
            seen.push(email);
        }
    }
    seen
});

/// Sanitized, de-duplicated preset emails in their original order.
pub fn preset_emails() -> &'static [String] {
    &PRESET_EMAILS
}

/// Cycles through a fixed list of emails, wrapping at both ends.
#[derive(Debug, Clone, Copy)]
pub struct QuickPick<'a> {
    emails: &'a [String],
}

impl Default for QuickPick<'static> {
    fn default() -> Self {
        Self::new(preset_emails())
    }
}

impl<'a> QuickPick<'a> {
    pub fn new(emails: &'a [String]) -> Self {
        Self { emails }
    }

    pub fn emails(&self) -> &'a [String] {
        self.emails
    }

    /// Index of `current`, or 0 when it is not in the list.
    fn index_of(&self, current: Option<&str>) -> usize {
        current
            .and_then(|c| self.emails.iter().position(|e| e == c))
            .unwrap_or(0)
    }

    pub fn next(&self, current: Option<&str>) -> Option<&'a str> {
        if self.emails.is_empty() {
            return None;
        }
        let idx = (self.index_of(current) + 1) % self.emails.len();
        Some(self.emails[idx].as_str())
    }

    pub fn previous(&self, current: Option<&str>) -> Option<&'a str> {
        if self.emails.is_empty() {
            return None;
        }
        let idx = match self.index_of(current) {
            0 => self.emails.len() - 1,
            i => i - 1,
        };
        Some(self.emails[idx].as_str())
    }
}
