use thiserror::Error;
use tilewm_config::{mask, Action, Binding, ConfigError};
use tracing::warn;

use crate::core::display::KeyGrab;
use crate::input::keymap::keysym_from_name;

#[derive(Error, Debug)]
pub enum BindingError {
    #[error("Unknown key name '{0}'")]
    UnknownKey(String),

    #[error(transparent)]
    Chord(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub modifiers: u16,
    pub keysym: u32,
    pub action: Action,
}

impl KeyBinding {
    pub fn parse(binding: &Binding) -> Result<Self, BindingError> {
        let chord = binding.chord()?;
        let keysym = keysym_from_name(&chord.key).ok_or_else(|| BindingError::UnknownKey(chord.key.clone()))?;
        Ok(Self {
            modifiers: chord.modifiers & mask::RELEVANT,
            keysym,
            action: binding.action.clone(),
        })
    }
}

/// Strips CapsLock, NumLock and pointer button bits from an event state.
pub fn clean_modifiers(state: u16) -> u16 {
    state & !mask::IGNORED & mask::RELEVANT
}

/// Ordered (modifiers, keysym) → action table. The first exact match wins.
#[derive(Debug, Clone, Default)]
pub struct KeyBindingTable {
    entries: Vec<KeyBinding>,
}

impl KeyBindingTable {
    pub fn new(entries: Vec<KeyBinding>) -> Self {
        Self { entries }
    }

    /// Builds the table from configuration, skipping (and logging) entries
    /// whose key cannot be resolved.
    pub fn from_config(bindings: &[Binding]) -> Self {
        let entries = bindings
            .iter()
            .filter_map(|binding| match KeyBinding::parse(binding) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping binding '{}': {}", binding.keys, e);
                    None
                }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, keysym: u32, state: u16) -> Option<&Action> {
        let modifiers = clean_modifiers(state);
        self.entries
            .iter()
            .find(|entry| entry.keysym == keysym && entry.modifiers == modifiers)
            .map(|entry| &entry.action)
    }

    pub fn grabs(&self) -> Vec<KeyGrab> {
        self.entries
            .iter()
            .map(|entry| KeyGrab { modifiers: entry.modifiers, keysym: entry.keysym })
            .collect()
    }
}
