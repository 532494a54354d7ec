use serde::{Deserialize, Serialize};

/// Automatic arrangement applied to a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    /// Master on the left half, the rest stacked on the right.
    #[default]
    Tile,
    /// Every client maximised, only the focused one visible.
    Monocle,
    /// No automatic arrangement.
    Float,
}

impl LayoutKind {
    pub fn next(self) -> Self {
        match self {
            Self::Tile => Self::Monocle,
            Self::Monocle => Self::Float,
            Self::Float => Self::Tile,
        }
    }

    /// Tile and Monocle compute geometry; Float leaves clients alone.
    pub fn is_tiling(self) -> bool {
        !matches!(self, Self::Float)
    }
}

/// How launched children are reaped so they never linger as zombies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReapPolicy {
    /// SIGCHLD is ignored process-wide and the kernel reaps children.
    #[default]
    IgnoreSigchld,
    /// Each child gets a short-lived thread that waits on it.
    WaitThread,
}

/// What a key binding does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Spawn(Vec<String>),
    CloseClient,
    FocusNext,
    FocusPrevious,
    ToggleFullscreen,
    ToggleFloating,
    SetLayout(LayoutKind),
    CycleLayout,
    /// Workspaces are numbered from 1.
    ViewWorkspace(u8),
    MoveToWorkspace(u8),
    Quit,
}

impl Action {
    pub fn workspace(&self) -> Option<u8> {
        match self {
            Self::ViewWorkspace(n) | Self::MoveToWorkspace(n) => Some(*n),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        action: Action,
    }

    fn action(text: &str) -> Action {
        toml::from_str::<Wrapper>(text).unwrap().action
    }

    #[test]
    fn test_action_toml_forms() {
        assert_eq!(action(r#"action = "focus-next""#), Action::FocusNext);
        assert_eq!(
            action(r#"action = { spawn = ["xterm", "-e", "htop"] }"#),
            Action::Spawn(vec!["xterm".into(), "-e".into(), "htop".into()])
        );
        assert_eq!(action(r#"action = { set-layout = "monocle" }"#), Action::SetLayout(LayoutKind::Monocle));
        assert_eq!(action(r#"action = { move-to-workspace = 4 }"#), Action::MoveToWorkspace(4));
    }

    #[test]
    fn test_layout_cycle_visits_every_kind() {
        let start = LayoutKind::Tile;
        assert_eq!(start.next().next().next(), start);
        assert!(!LayoutKind::Float.is_tiling());
        assert!(LayoutKind::Monocle.is_tiling());
    }
}
