//! Save snapshots and an in-memory store.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;

use crate::SaveStore;
use crate::character::{Character, CharacterError};

pub const SAVE_VERSION: u32 = 1;

/// Everything needed to resume a career at the training screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub character: Character,
}

impl SaveSnapshot {
    #[must_use]
    pub fn new(character: &Character, saved_at: DateTime<Utc>) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at,
            character: character.clone(),
        }
    }

    /// Consume the snapshot, returning a character with every bound enforced
    /// against a schedule ending on `final_turn`.
    ///
    /// # Errors
    ///
    /// Returns `CharacterError` when the stored name is not a valid trainee name.
    pub fn into_character(self, final_turn: u32) -> Result<Character, CharacterError> {
        let mut character = self.character;
        character.restore(final_turn)?;
        Ok(character)
    }
}

/// Volatile store for tests and scripted runs; clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saves: Rc<RefCell<HashMap<String, SaveSnapshot>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.saves.borrow().len()
    }
}

impl SaveStore for MemoryStore {
    type Error = Infallible;

    fn save_game(&self, save_name: &str, snapshot: &SaveSnapshot) -> Result<(), Self::Error> {
        self.saves
            .borrow_mut()
            .insert(save_name.to_string(), snapshot.clone());
        Ok(())
    }

    fn load_game(&self, save_name: &str) -> Result<Option<SaveSnapshot>, Self::Error> {
        Ok(self.saves.borrow().get(save_name).cloned())
    }

    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
        self.saves.borrow_mut().remove(save_name);
        Ok(())
    }
}
