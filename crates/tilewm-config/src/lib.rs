mod action;
mod chord;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub use action::{Action, LayoutKind, ReapPolicy};
pub use chord::{mask, parse_modifier, Chord};

/// Number of workspaces; users address them as 1..=WORKSPACE_COUNT.
pub const WORKSPACE_COUNT: u8 = 10;

/// Widest border accepted from configuration.
pub const MAX_BORDER_WIDTH: u16 = 64;

/// Error types for configuration operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    #[error("Invalid key chord '{chord}': {reason}")]
    InvalidChord { chord: String, reason: String },

    #[error("Workspace {0} is out of range 1..=10")]
    WorkspaceOutOfRange(u8),

    #[error("Border width {0} exceeds 64")]
    BorderTooWide(u16),

    #[error("Pointer button {0} is out of range 1..=5")]
    InvalidButton(u8),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One `[[bindings]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub keys: String,
    pub action: Action,
}

impl Binding {
    pub fn new(keys: impl Into<String>, action: Action) -> Self {
        Self { keys: keys.into(), action }
    }

    pub fn chord(&self) -> Result<Chord, ConfigError> {
        Chord::parse(&self.keys)
    }
}

/// Window manager configuration. Missing fields take their compiled-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WmConfig {
    pub border_width: u16,
    pub focused_border: u32,
    pub unfocused_border: u32,
    pub urgent_border: u32,
    /// Modifier held for pointer drags.
    pub modifier: String,
    pub move_button: u8,
    pub resize_button: u8,
    pub default_layout: LayoutKind,
    pub reap_policy: ReapPolicy,
    pub bindings: Vec<Binding>,
}

impl Default for WmConfig {
    fn default() -> Self {
        Self {
            border_width: 2,
            focused_border: 0xFFFFFF,
            unfocused_border: 0x808080,
            urgent_border: 0xFF5555,
            modifier: "Mod4".to_string(),
            move_button: 1,
            resize_button: 3,
            default_layout: LayoutKind::Tile,
            reap_policy: ReapPolicy::IgnoreSigchld,
            bindings: default_bindings(),
        }
    }
}

fn default_bindings() -> Vec<Binding> {
    let mut bindings = vec![
        Binding::new("Mod4+Return", Action::Spawn(vec!["xterm".into()])),
        Binding::new("Mod4+d", Action::Spawn(vec!["dmenu_run".into()])),
        Binding::new("Mod4+q", Action::CloseClient),
        Binding::new("Mod4+j", Action::FocusNext),
        Binding::new("Mod4+k", Action::FocusPrevious),
        Binding::new("Mod4+f", Action::ToggleFullscreen),
        Binding::new("Mod4+space", Action::ToggleFloating),
        Binding::new("Mod4+t", Action::SetLayout(LayoutKind::Tile)),
        Binding::new("Mod4+m", Action::SetLayout(LayoutKind::Monocle)),
        Binding::new("Mod4+Shift+f", Action::SetLayout(LayoutKind::Float)),
        Binding::new("Mod4+Tab", Action::CycleLayout),
        Binding::new("Mod4+Shift+e", Action::Quit),
    ];
    for n in 1..=WORKSPACE_COUNT {
        let key = (n % 10).to_string();
        bindings.push(Binding::new(format!("Mod4+{}", key), Action::ViewWorkspace(n)));
        bindings.push(Binding::new(format!("Mod4+Shift+{}", key), Action::MoveToWorkspace(n)));
    }
    bindings
}

impl WmConfig {
    /// Default location: `$XDG_CONFIG_HOME/tilewm/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tilewm").join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when there is none.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from file. A missing file yields the defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        debug!("Loaded {} bindings from {}", config.bindings.len(), path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if parse_modifier(&self.modifier).is_none() {
            return Err(ConfigError::InvalidFormat {
                reason: format!("unknown drag modifier '{}'", self.modifier),
            });
        }
        if self.border_width > MAX_BORDER_WIDTH {
            return Err(ConfigError::BorderTooWide(self.border_width));
        }
        for button in [self.move_button, self.resize_button] {
            if !(1..=5).contains(&button) {
                return Err(ConfigError::InvalidButton(button));
            }
        }
        if self.move_button == self.resize_button {
            return Err(ConfigError::InvalidFormat {
                reason: "move_button and resize_button must differ".to_string(),
            });
        }
        for binding in &self.bindings {
            binding.chord()?;
            if let Some(n) = binding.action.workspace() {
                if !(1..=WORKSPACE_COUNT).contains(&n) {
                    return Err(ConfigError::WorkspaceOutOfRange(n));
                }
            }
            if let Action::Spawn(argv) = &binding.action {
                if argv.is_empty() {
                    return Err(ConfigError::InvalidFormat {
                        reason: format!("binding '{}' spawns an empty command", binding.keys),
                    });
                }
            }
        }
        Ok(())
    }

    /// Modifier bit for pointer drags.
    pub fn drag_modifier(&self) -> u16 {
        parse_modifier(&self.modifier).unwrap_or(mask::MOD4)
    }
}
