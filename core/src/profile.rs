use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::ticket::or_placeholder;

/// Maximum number of activity titles kept in a digest.
pub const DIGEST_MAX_ENTRIES: usize = 3;

/// A customer profile from the public profile API.
/// Only the fields the widget reads are typed; everything else is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub company: Option<Company>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Record id as the API sent it. Numbers and strings are both accepted and
/// kept in their textual form for use in follow-up queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(value_text(&Value::deserialize(deserializer)?)))
    }
}

/// Text form of a loose JSON scalar: strings as-is, null as empty.
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Sort key for an activity id; anything non-numeric counts as 0.
fn numeric_id(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(text) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(numeric_id(&Value::deserialize(deserializer)?))
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_text(&Value::deserialize(deserializer)?))
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

impl Profile {
    pub fn name(&self) -> Option<&str> {
        non_empty(self.name.as_ref())
    }

    pub fn email(&self) -> Option<&str> {
        non_empty(self.email.as_ref())
    }

    pub fn website(&self) -> Option<&str> {
        non_empty(self.website.as_ref())
    }

    pub fn company_name(&self) -> Option<&str> {
        self.company.as_ref().and_then(|c| non_empty(c.name.as_ref()))
    }

    pub fn city(&self) -> Option<&str> {
        self.address.as_ref().and_then(|a| non_empty(a.city.as_ref()))
    }

    /// Display rows for the customer card: (label, value).
    pub fn card(profile: Option<&Profile>) -> [(&'static str, String); 4] {
        let field = |f: fn(&Profile) -> Option<&str>| {
            or_placeholder(profile.and_then(f).unwrap_or_default())
        };
        [
            ("Name", field(Profile::name)),
            ("Company", field(Profile::company_name)),
            ("City", field(Profile::city)),
            ("Website", field(Profile::website)),
        ]
    }
}

/// One activity entry (a post) for a profile. Never rejected: a missing or
/// odd id sorts as 0 and a missing title reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
}

/// Up to three most-recent activity titles, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityDigest(Vec<String>);

impl ActivityDigest {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Newest-first by numeric id, capped at [`DIGEST_MAX_ENTRIES`].
    pub fn from_posts(mut posts: Vec<Post>) -> Self {
        posts.sort_by(|a, b| b.id.cmp(&a.id));
        Self(
            posts
                .into_iter()
                .take(DIGEST_MAX_ENTRIES)
                .map(|p| p.title)
                .collect(),
        )
    }

    pub fn titles(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
