use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(ChatId);
id_newtype!(MessageId);
id_newtype!(TitleCode);
id_newtype!(GroupId);
id_newtype!(ChannelId);

/// Largest code an administrator may assign to a title.
pub const MAX_TITLE_CODE: i64 = 999_999;

impl TitleCode {
    /// Parses user input that must consist of ASCII digits only.
    pub fn parse_digits(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        raw.parse::<i64>().ok().map(Self)
    }

    pub fn is_assignable(self) -> bool {
        (1..=MAX_TITLE_CODE).contains(&self.0)
    }
}

impl From<UserId> for ChatId {
    fn from(value: UserId) -> Self {
        Self(value.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    Document,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Document => "document",
        }
    }

    /// Kinds that can be stored as a title part.
    pub fn is_part_media(self) -> bool {
        matches!(self, Self::Video | Self::Document)
    }
}

impl FromStr for MediaKind {
    type Err = UnknownMediaKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo" => Ok(Self::Photo),
            "video" => Ok(Self::Video),
            "document" => Ok(Self::Document),
            other => Err(UnknownMediaKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown media kind '{0}'")]
pub struct UnknownMediaKind(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserProfile {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            username: None,
            first_name: None,
            last_name: None,
        }
    }

    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name, &self.username) {
            (Some(first), Some(last), _) => format!("{first} {last}"),
            (Some(first), None, _) => first.clone(),
            (None, _, Some(username)) => format!("@{username}"),
            _ => self.id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub users: i64,
    pub active_users_7d: i64,
    pub titles: i64,
    pub parts: i64,
    pub groups: i64,
    pub mandatory_channels: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_ascii_digit_codes() {
        assert_eq!(TitleCode::parse_digits(" 42 "), Some(TitleCode(42)));
        assert_eq!(TitleCode::parse_digits("abc"), None);
        assert_eq!(TitleCode::parse_digits("-5"), None);
        assert_eq!(TitleCode::parse_digits("4 2"), None);
        assert_eq!(TitleCode::parse_digits(""), None);
        assert_eq!(TitleCode::parse_digits("99999999999999999999999"), None);
    }

    #[test]
    fn assignable_codes_are_bounded() {
        assert!(!TitleCode(0).is_assignable());
        assert!(TitleCode(1).is_assignable());
        assert!(TitleCode(MAX_TITLE_CODE).is_assignable());
        assert!(!TitleCode(MAX_TITLE_CODE + 1).is_assignable());
    }

    #[test]
    fn display_name_prefers_real_names() {
        let mut profile = UserProfile::new(UserId(7));
        assert_eq!(profile.display_name(), "7");
        profile.username = Some("neo".into());
        assert_eq!(profile.display_name(), "@neo");
        profile.first_name = Some("Thomas".into());
        assert_eq!(profile.display_name(), "Thomas");
        profile.last_name = Some("Anderson".into());
        assert_eq!(profile.display_name(), "Thomas Anderson");
    }
}
