use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("`{0}` is not of the form type/id")]
    MissingSlash(String),
    #[error("unknown entity type `{0}`")]
    UnknownKind(String),
    #[error("`{0}` has an empty id")]
    EmptyId(String),
    #[error("`{0}` has whitespace in its id")]
    Whitespace(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Player,
    Room,
    Item,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Player, Kind::Room, Kind::Item];

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Player => "player",
            Kind::Room => "room",
            Kind::Item => "item",
        }
    }

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| KeyError::UnknownKind(s.to_string()))
    }
}

/// `type/id` address of an entity, validated on construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntityKey {
    kind: Kind,
    id: String,
}

impl EntityKey {
    pub fn new(kind: Kind, id: impl Into<String>) -> Result<Self, KeyError> {
        let id = id.into();
        if id.is_empty() {
            return Err(KeyError::EmptyId(format!("{kind}/")));
        }
        if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(KeyError::Whitespace(format!("{kind}/{id}")));
        }
        Ok(Self { kind, id })
    }

    /// `kind/{n}` for a numeric id; cannot fail.
    pub fn numbered(kind: Kind, n: u64) -> Self {
        Self {
            kind,
            id: n.to_string(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Numeric value of the id; 0 when the id is not a number.
    pub fn number(&self) -> u64 {
        self.id.parse().unwrap_or(0)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

impl FromStr for EntityKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once('/')
            .ok_or_else(|| KeyError::MissingSlash(s.to_string()))?;
        EntityKey::new(kind.parse()?, id)
    }
}

// Hash the textual `type/id` form so the index hasher sees the same bytes a
// user typed.
impl Hash for EntityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(self.kind.as_str().as_bytes());
        state.write(b"/");
        state.write(self.id.as_bytes());
    }
}
