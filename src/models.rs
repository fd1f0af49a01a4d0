use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

pub const BIRTHDATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// A user profile document (`users` collection). The document id is the
/// identity provider's uid and is never regenerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    /// ISO `YYYY-MM-DD`.
    pub birthdate: String,
    pub gender: String,
    #[serde(default)]
    pub show_gender_profile: bool,
    /// `None` means the profile carries no interest list at all; an empty
    /// list is a real (if unhelpful) answer and still ranks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passions: Option<Vec<Interest>>,
    /// Ordered photo URLs, first is primary.
    #[serde(default)]
    pub photos: Vec<String>,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Profile {
    pub fn primary_photo(&self) -> &str {
        self.photos.first().map(String::as_str).unwrap_or("")
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.last_name).trim().to_owned()
    }

    pub fn birth_date(&self) -> Option<Date> {
        Date::parse(&self.birthdate, BIRTHDATE_FORMAT).ok()
    }

    pub fn age_on(&self, on: Date) -> Option<i32> {
        self.birth_date().map(|born| age_on(born, on))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    pub category: String,
}

impl Interest {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
        }
    }
}

/// Completed years between `born` and `on`.
pub fn age_on(born: Date, on: Date) -> i32 {
    let mut age = on.year() - born.year();
    if (on.month() as u8, on.day()) < (born.month() as u8, born.day()) {
        age -= 1;
    }
    age
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeAction {
    Like,
    Pass,
}

/// A directional like/pass fact (`likes` collection). The document id is the
/// composite `{actor}_{target}` key, so a directed pair holds at most one
/// active action and the latest write wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user_id: String,
    pub matched_user_id: String,
    pub action: LikeAction,
    pub timestamp: i64,
}

pub fn like_key(actor: &str, target: &str) -> String {
    format!("{actor}_{target}")
}

/// Canonical record of a mutual like (`matches` collection), keyed by the
/// sorted id pair so both sides read the same document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub users: [String; 2],
    pub created_at: i64,
}

impl MatchPair {
    pub fn new(a: &str, b: &str, created_at: i64) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self {
            users: [lo.to_owned(), hi.to_owned()],
            created_at,
        }
    }

    /// Document id: the sorted ids joined with `_`, same derivation as a
    /// chat channel id for the pair.
    pub fn key(&self) -> String {
        self.users.join("_")
    }

    pub fn peer_of(&self, uid: &str) -> Option<&str> {
        let [a, b] = &self.users;
        if a == uid {
            Some(b)
        } else if b == uid {
            Some(a)
        } else {
            None
        }
    }
}

/// A chat message document (`messages` collection), append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub chat_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
    pub timestamp: i64,
    pub read: bool,
}

/// What the matches page shows per mutual match. The message preview fields
/// stay at their defaults, nothing aggregates chat history into this view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMatch {
    pub uid: String,
    pub name: String,
    pub photo: String,
    pub last_message: String,
    pub last_message_time: Option<i64>,
    pub unread_count: u32,
}

pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
