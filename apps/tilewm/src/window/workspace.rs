use tilewm_config::{LayoutKind, WORKSPACE_COUNT};
use x11rb::protocol::xproto::Window;

use crate::window::client::Client;
use crate::window::registry::ClientRegistry;

#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub clients: ClientRegistry,
    pub layout: LayoutKind,
}

impl Workspace {
    /// Tiled members in registry order.
    pub fn tiled_windows(&self) -> Vec<Window> {
        self.clients.iter().filter(|c| c.is_tiled()).map(|c| c.window).collect()
    }

    pub fn fullscreen_window(&self) -> Option<Window> {
        self.clients.iter().find(|c| c.is_fullscreen).map(|c| c.window)
    }
}

/// What the display must do to make a workspace switch visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    pub from: usize,
    pub to: usize,
    pub hide: Vec<Window>,
    pub show: Vec<Window>,
    pub focus: Option<Window>,
}

/// Ten workspaces, one of them visible.
#[derive(Debug)]
pub struct WorkspaceManager {
    workspaces: Vec<Workspace>,
    current: usize,
}

impl WorkspaceManager {
    pub fn new(layout: LayoutKind) -> Self {
        let workspaces = (0..WORKSPACE_COUNT)
            .map(|_| Workspace { clients: ClientRegistry::new(), layout })
            .collect();
        Self { workspaces, current: 0 }
    }

    pub fn count(&self) -> usize {
        self.workspaces.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &Workspace {
        &self.workspaces[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Workspace {
        &mut self.workspaces[self.current]
    }

    pub fn get(&self, index: usize) -> Option<&Workspace> {
        self.workspaces.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Workspace> {
        self.workspaces.get_mut(index)
    }

    /// Index of the workspace holding `window`.
    pub fn locate(&self, window: Window) -> Option<usize> {
        self.workspaces.iter().position(|ws| ws.clients.contains(window))
    }

    pub fn find(&self, window: Window) -> Option<&Client> {
        self.workspaces.iter().find_map(|ws| ws.clients.find(window))
    }

    pub fn find_mut(&mut self, window: Window) -> Option<&mut Client> {
        self.workspaces.iter_mut().find_map(|ws| ws.clients.find_mut(window))
    }

    pub fn is_visible(&self, window: Window) -> bool {
        self.current().clients.contains(window)
    }

    /// Every managed window, workspace by workspace.
    pub fn all_windows(&self) -> Vec<Window> {
        self.workspaces.iter().flat_map(|ws| ws.clients.windows()).collect()
    }

    /// Makes `target` current and reports which windows change visibility.
    /// `None` when `target` is already current or out of range.
    pub fn switch_to(&mut self, target: usize) -> Option<Switch> {
        if target == self.current || target >= self.workspaces.len() {
            return None;
        }
        let from = self.current;
        let hide = self.workspaces[from].clients.windows();
        let show = self.workspaces[target].clients.windows();
        let focus = self.workspaces[target].clients.focused_window();
        self.current = target;
        Some(Switch { from, to: target, hide, show, focus })
    }

    /// Moves `window` to the tail of `target`. Returns the source index, or
    /// `None` when the window is unmanaged, already there, or `target` is out
    /// of range.
    pub fn move_client(&mut self, window: Window, target: usize) -> Option<usize> {
        if target >= self.workspaces.len() {
            return None;
        }
        let source = self.locate(window)?;
        if source == target {
            return None;
        }
        let mut client = self.workspaces[source].clients.remove(window)?;
        client.workspace = target;
        self.workspaces[target].clients.insert(client);
        Some(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::client::Geometry;

    fn manager_with(current: &[Window]) -> WorkspaceManager {
        let mut wm = WorkspaceManager::new(LayoutKind::Tile);
        for &w in current {
            wm.current_mut().clients.insert(Client::new(w, Geometry::default(), 0));
        }
        wm
    }

    #[test]
    fn test_ten_workspaces_first_current() {
        let wm = WorkspaceManager::new(LayoutKind::Monocle);
        assert_eq!(wm.count(), 10);
        assert_eq!(wm.current_index(), 0);
        assert_eq!(wm.current().layout, LayoutKind::Monocle);
    }

    #[test]
    fn test_switch_to_current_is_noop() {
        let mut wm = manager_with(&[1, 2]);
        assert_eq!(wm.switch_to(0), None);
        assert_eq!(wm.switch_to(10), None);
        assert_eq!(wm.current_index(), 0);
    }

    #[test]
    fn test_switch_round_trip_keeps_members_and_order() {
        let mut wm = manager_with(&[1, 2, 3]);
        wm.current_mut().clients.set_focus(2);

        let there = wm.switch_to(4).unwrap();
        assert_eq!(there.hide, vec![1, 2, 3]);
        assert!(there.show.is_empty());
        assert_eq!(there.focus, None);

        wm.current_mut().clients.insert(Client::new(9, Geometry::default(), 4));
        let back = wm.switch_to(0).unwrap();
        assert_eq!(back.hide, vec![9]);
        assert_eq!(back.show, vec![1, 2, 3]);
        assert_eq!(back.focus, Some(2));
        assert_eq!(wm.current().clients.windows(), vec![1, 2, 3]);
    }

    #[test]
    fn test_move_client_appends_to_target() {
        let mut wm = manager_with(&[1, 2, 3]);
        wm.get_mut(2).unwrap().clients.insert(Client::new(7, Geometry::default(), 2));

        assert_eq!(wm.move_client(2, 2), Some(0));
        assert_eq!(wm.current().clients.windows(), vec![1, 3]);
        assert_eq!(wm.get(2).unwrap().clients.windows(), vec![7, 2]);
        assert_eq!(wm.find(2).unwrap().workspace, 2);
        assert_eq!(wm.locate(2), Some(2));
        assert!(!wm.is_visible(2));
    }

    #[test]
    fn test_move_client_rejects_noops() {
        let mut wm = manager_with(&[1]);
        assert_eq!(wm.move_client(1, 0), None);
        assert_eq!(wm.move_client(5, 3), None);
        assert_eq!(wm.move_client(1, 42), None);
        assert_eq!(wm.all_windows(), vec![1]);
    }

    #[test]
    fn test_tiled_windows_skip_fullscreen_and_floating() {
        let mut wm = manager_with(&[1, 2, 3]);
        wm.find_mut(1).unwrap().is_fullscreen = true;
        wm.find_mut(3).unwrap().is_floating = true;
        assert_eq!(wm.current().tiled_windows(), vec![2]);
        assert_eq!(wm.current().fullscreen_window(), Some(1));
    }
}
