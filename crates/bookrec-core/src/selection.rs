//! Selection state: the three user choices that drive the prompt.
//!
//! Transitions are pure: `Selection::transition` returns the full next
//! selection. Changing the genre always clears the mood, because a mood is
//! only meaningful relative to the genre it was picked for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Genre,
    Mood,
    Level,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Genre, Field::Mood, Field::Level];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Genre => "genre",
            Field::Mood => "mood",
            Field::Level => "level",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field '{0}' (expected genre, mood or level)")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "genre" => Ok(Field::Genre),
            "mood" => Ok(Field::Mood),
            "level" => Ok(Field::Level),
            _ => Err(UnknownField(s.to_string())),
        }
    }
}

/// Current choices. An empty string means "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub genre: String,
    pub mood: String,
    pub level: String,
}

impl Selection {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Genre => &self.genre,
            Field::Mood => &self.mood,
            Field::Level => &self.level,
        }
    }

    pub fn is_set(&self, field: Field) -> bool {
        !self.get(field).is_empty()
    }

    /// Next selection after setting `field` to `value` (`None` clears it).
    ///
    /// A genre transition resets the mood even when the genre is unchanged.
    /// No catalog validation happens here.
    #[must_use]
    pub fn transition(&self, field: Field, value: Option<String>) -> Selection {
        let value = value.unwrap_or_default();
        match field {
            Field::Genre => Selection {
                genre: value,
                mood: String::new(),
                level: self.level.clone(),
            },
            Field::Mood => Selection {
                mood: value,
                ..self.clone()
            },
            Field::Level => Selection {
                level: value,
                ..self.clone()
            },
        }
    }

    /// Fields that still need a value before submission.
    pub fn missing(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| !self.is_set(*f))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        Field::ALL.into_iter().all(|f| self.is_set(f))
    }
}
