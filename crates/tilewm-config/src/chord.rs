use std::fmt;

use crate::ConfigError;

/// X11 core modifier bits, as carried in key and button event state.
pub mod mask {
    pub const SHIFT: u16 = 1 << 0;
    pub const LOCK: u16 = 1 << 1;
    pub const CONTROL: u16 = 1 << 2;
    pub const MOD1: u16 = 1 << 3;
    pub const MOD2: u16 = 1 << 4;
    pub const MOD3: u16 = 1 << 5;
    pub const MOD4: u16 = 1 << 6;
    pub const MOD5: u16 = 1 << 7;

    /// Bits that never take part in binding matches (CapsLock and NumLock).
    pub const IGNORED: u16 = LOCK | MOD2;

    /// Every bit a binding may use.
    pub const RELEVANT: u16 = SHIFT | CONTROL | MOD1 | MOD3 | MOD4 | MOD5;
}

/// Parses a single modifier name such as `Mod4`, `Super` or `ctrl`.
pub fn parse_modifier(name: &str) -> Option<u16> {
    let bit = match name.to_ascii_lowercase().as_str() {
        "shift" => mask::SHIFT,
        "lock" => mask::LOCK,
        "control" | "ctrl" => mask::CONTROL,
        "mod1" | "alt" => mask::MOD1,
        "mod2" => mask::MOD2,
        "mod3" => mask::MOD3,
        "mod4" | "super" => mask::MOD4,
        "mod5" => mask::MOD5,
        _ => return None,
    };
    Some(bit)
}

/// A modifier set plus a key name, written `Mod4+Shift+Return`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    pub modifiers: u16,
    pub key: String,
}

impl Chord {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidChord {
            chord: text.to_string(),
            reason: reason.to_string(),
        };

        let mut parts: Vec<&str> = text.split('+').map(str::trim).collect();
        let key = parts.pop().unwrap_or_default();
        if key.is_empty() {
            return Err(invalid("missing key name"));
        }

        let mut modifiers = 0;
        for part in parts {
            match parse_modifier(part) {
                Some(bit) => modifiers |= bit,
                None => return Err(invalid(&format!("unknown modifier '{}'", part))),
            }
        }

        Ok(Self { modifiers, key: key.to_string() })
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (mask::MOD4, "Mod4"),
            (mask::MOD1, "Mod1"),
            (mask::CONTROL, "Control"),
            (mask::SHIFT, "Shift"),
            (mask::MOD3, "Mod3"),
            (mask::MOD5, "Mod5"),
            (mask::MOD2, "Mod2"),
            (mask::LOCK, "Lock"),
        ];
        for (bit, name) in names {
            if self.modifiers & bit != 0 {
                write!(f, "{}+", name)?;
            }
        }
        write!(f, "{}", self.key)
    }
}
