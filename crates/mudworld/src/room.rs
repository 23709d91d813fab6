use crate::key::EntityKey;

pub const MAX_EXITS: usize = 16;

/// Compass and vertical directions with their opposites.
pub const DIRECTIONS: [(&str, &str); 10] = [
    ("north", "south"),
    ("south", "north"),
    ("east", "west"),
    ("west", "east"),
    ("northeast", "southwest"),
    ("northwest", "southeast"),
    ("southeast", "northwest"),
    ("southwest", "northeast"),
    ("up", "down"),
    ("down", "up"),
];

const ALIASES: [(&str, &str); 10] = [
    ("n", "north"),
    ("s", "south"),
    ("e", "east"),
    ("w", "west"),
    ("ne", "northeast"),
    ("nw", "northwest"),
    ("se", "southeast"),
    ("sw", "southwest"),
    ("u", "up"),
    ("d", "down"),
];

pub fn reverse_direction(dir: &str) -> Option<&'static str> {
    DIRECTIONS
        .iter()
        .find(|(d, _)| *d == dir)
        .map(|(_, rev)| *rev)
}

/// Full direction name for a one- or two-letter abbreviation.
pub fn expand_alias(word: &str) -> Option<&'static str> {
    ALIASES
        .iter()
        .find(|(a, _)| *a == word)
        .map(|(_, dir)| *dir)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExitError {
    #[error("there is already an exit {0}")]
    Duplicate(String),
    #[error("no room for more than {MAX_EXITS} exits")]
    Full,
    #[error("there is no exit {0}")]
    Missing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exit {
    pub key: String,
    pub target: EntityKey,
    /// Told to whoever walks through.
    pub travel: Option<String>,
    /// Told to whoever looks around the room.
    pub desc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Room {
    exits: Vec<Exit>,
}

impl Room {
    pub fn exits(&self) -> &[Exit] {
        &self.exits
    }

    pub fn exit(&self, key: &str) -> Option<&Exit> {
        self.exits.iter().find(|e| e.key == key)
    }

    fn exit_mut(&mut self, key: &str) -> Result<&mut Exit, ExitError> {
        self.exits
            .iter_mut()
            .find(|e| e.key == key)
            .ok_or_else(|| ExitError::Missing(key.to_string()))
    }

    pub fn exit_keys(&self) -> Vec<&str> {
        self.exits.iter().map(|e| e.key.as_str()).collect()
    }

    pub fn add_exit(&mut self, key: &str, target: EntityKey) -> Result<(), ExitError> {
        if self.exit(key).is_some() {
            return Err(ExitError::Duplicate(key.to_string()));
        }
        if self.exits.len() >= MAX_EXITS {
            return Err(ExitError::Full);
        }
        self.exits.push(Exit {
            key: key.to_string(),
            target,
            travel: None,
            desc: None,
        });
        Ok(())
    }

    pub fn remove_exit(&mut self, key: &str) -> Result<Exit, ExitError> {
        let i = self
            .exits
            .iter()
            .position(|e| e.key == key)
            .ok_or_else(|| ExitError::Missing(key.to_string()))?;
        Ok(self.exits.remove(i))
    }

    pub fn exit_target(&self, key: &str) -> Option<&EntityKey> {
        self.exit(key).map(|e| &e.target)
    }

    pub fn travel_desc(&self, key: &str) -> Option<&str> {
        self.exit(key).and_then(|e| e.travel.as_deref())
    }

    pub fn set_travel_desc(&mut self, key: &str, text: Option<String>) -> Result<(), ExitError> {
        self.exit_mut(key)?.travel = text;
        Ok(())
    }

    pub fn exit_desc(&self, key: &str) -> Option<&str> {
        self.exit(key).and_then(|e| e.desc.as_deref())
    }

    pub fn set_exit_desc(&mut self, key: &str, text: Option<String>) -> Result<(), ExitError> {
        self.exit_mut(key)?.desc = text;
        Ok(())
    }
}
