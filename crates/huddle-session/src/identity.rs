//! Identity validation for the session binder.

use crate::SessionError;

/// A validated display name and character selection.
///
/// The only way to build one is [`Identity::new`], so a room never stores
/// an empty name or character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    name: String,
    character: String,
}

impl Identity {
    /// Validates raw client input.
    ///
    /// The name is stored trimmed; the character is an opaque key chosen
    /// from the client's catalogue and is stored as sent. Input that is
    /// empty (or whitespace only) is rejected.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidIdentity`] if either field is empty.
    pub fn new(name: &str, character: &str) -> Result<Self, SessionError> {
        let name = name.trim();
        if name.is_empty() || character.trim().is_empty() {
            return Err(SessionError::InvalidIdentity(
                "Name and character are required",
            ));
        }
        Ok(Self {
            name: name.to_owned(),
            character: character.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn character(&self) -> &str {
        &self.character
    }
}
