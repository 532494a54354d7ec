use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tilewm_config::{Action, LayoutKind, WmConfig};
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::Window;

use crate::core::display::{ButtonGrab, ClientRequest, ConfigureRequest, DisplayEvent, DisplayServer, PropertyKind};
use crate::core::spawn::Launcher;
use crate::input::bindings::{clean_modifiers, KeyBindingTable};
use crate::window::client::{Client, Geometry};
use crate::window::drag::{DragKind, InteractionController};
use crate::window::error::ErrorTracker;
use crate::window::layout;
use crate::window::workspace::WorkspaceManager;

pub struct WindowManager<D: DisplayServer> {
    pub display: D,
    pub config: WmConfig,
    pub workspaces: WorkspaceManager,
    pub drag: InteractionController,
    pub errors: Arc<ErrorTracker>,
    bindings: KeyBindingTable,
    launcher: Launcher,
    drag_modifier: u16,
    /// Unmaps the manager issued itself and has not yet seen reported.
    expected_unmaps: HashMap<Window, u32>,
    shutdown: Arc<AtomicBool>,
}

impl<D: DisplayServer> WindowManager<D> {
    pub fn new(
        display: D,
        config: WmConfig,
        launcher: Launcher,
        errors: Arc<ErrorTracker>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let bindings = KeyBindingTable::from_config(&config.bindings);
        info!("Loaded {} key bindings", bindings.len());
        Self {
            display,
            workspaces: WorkspaceManager::new(config.default_layout),
            drag: InteractionController::new(),
            errors,
            bindings,
            launcher,
            drag_modifier: config.drag_modifier(),
            expected_unmaps: HashMap::new(),
            shutdown,
            config,
        }
    }

    /// Registers key grabs for every binding plus the two drag buttons.
    pub fn grab_bindings(&mut self) {
        let keys = self.bindings.grabs();
        let buttons = [
            ButtonGrab { modifiers: self.drag_modifier, button: self.config.move_button },
            ButtonGrab { modifiers: self.drag_modifier, button: self.config.resize_button },
        ];
        self.display.grab_bindings(&keys, &buttons);
    }

    /// Adopts windows that were already mapped before the manager started.
    pub fn scan_windows(&mut self) {
        let windows = self.display.top_level_windows();
        info!("Scanning {} windows...", windows.len());

        for window in windows {
            let Some(attrs) = self.display.window_attributes(window) else { continue };
            if attrs.override_redirect || !attrs.viewable {
                continue;
            }
            self.manage(window, attrs.geometry);
        }
        info!("Managing {} windows after scan", self.workspaces.all_windows().len());
    }

    pub fn run(&mut self) -> Result<()> {
        info!("Entering event loop");
        while !self.shutdown.load(Ordering::SeqCst) {
            self.display.flush();
            let event = self.display.next_event().context("lost connection to the display")?;
            self.handle_event(event);
        }
        self.display.flush();
        info!("Event loop finished");
        Ok(())
    }

    pub fn handle_event(&mut self, event: DisplayEvent) {
        debug!("Handling {:?}", event);
        match event {
            DisplayEvent::MapRequest { window } => self.on_map_request(window),
            DisplayEvent::DestroyNotify { window } => {
                self.expected_unmaps.remove(&window);
                self.unmanage(window);
            }
            DisplayEvent::UnmapNotify { window, via_root } => self.on_unmap(window, via_root),
            DisplayEvent::ConfigureRequest(request) => self.on_configure_request(&request),
            DisplayEvent::EnterNotify { window, grab_induced } => {
                if !grab_induced && !self.drag.is_dragging() && self.workspaces.is_visible(window) {
                    self.focus(window);
                }
            }
            DisplayEvent::KeyPress { keycode, state } => {
                let keysym = self.display.keysym(keycode);
                if let Some(action) = self.bindings.lookup(keysym, state).cloned() {
                    self.perform(action);
                }
            }
            DisplayEvent::ButtonPress { window, button, state, root_x, root_y } => {
                if let Some(window) = window {
                    self.on_button_press(window, button, state, root_x, root_y);
                }
            }
            DisplayEvent::MotionNotify { root_x, root_y } => self.on_motion(root_x, root_y),
            DisplayEvent::ButtonRelease { button } => {
                if let Some(window) = self.drag.end() {
                    debug!("Drag of {} ended by button {}", window, button);
                }
            }
            DisplayEvent::KeyboardMappingChanged => {
                self.display.refresh_keyboard_mapping();
                self.grab_bindings();
            }
            DisplayEvent::PropertyNotify { window, kind } => self.on_property(window, kind),
            DisplayEvent::ClientMessage(request) => self.on_client_message(request),
            DisplayEvent::ProtocolError { description } => self.errors.record_protocol_error(description),
        }
    }

    pub fn perform(&mut self, action: Action) {
        debug!("Performing {:?}", action);
        let focused = self.workspaces.current().clients.focused_window();
        match action {
            Action::Spawn(argv) => self.launcher.launch(&argv),
            Action::CloseClient => {
                if let Some(window) = focused {
                    self.display.close_window(window);
                }
            }
            Action::FocusNext => {
                self.workspaces.current_mut().clients.focus_next();
                self.apply_focus();
            }
            Action::FocusPrevious => {
                self.workspaces.current_mut().clients.focus_previous();
                self.apply_focus();
            }
            Action::ToggleFullscreen => {
                if let Some(window) = focused {
                    let on = !self.workspaces.find(window).is_some_and(|c| c.is_fullscreen);
                    self.set_fullscreen(window, on);
                }
            }
            Action::ToggleFloating => {
                if let Some(window) = focused {
                    self.toggle_floating(window);
                }
            }
            Action::SetLayout(kind) => self.set_layout(kind),
            Action::CycleLayout => {
                let next = self.workspaces.current().layout.next();
                self.set_layout(next);
            }
            Action::ViewWorkspace(n) => {
                if let Some(index) = workspace_index(n) {
                    self.switch_workspace(index);
                }
            }
            Action::MoveToWorkspace(n) => {
                if let (Some(window), Some(index)) = (focused, workspace_index(n)) {
                    self.move_to_workspace(window, index);
                }
            }
            Action::Quit => {
                info!("Quit requested");
                self.shutdown.store(true, Ordering::SeqCst);
            }
        }
    }

    fn on_map_request(&mut self, window: Window) {
        let Some(attrs) = self.display.window_attributes(window) else {
            self.errors.record_window_error("map request", format_args!("window {} vanished", window));
            return;
        };
        if attrs.override_redirect {
            self.display.map(window);
        } else if self.workspaces.locate(window).is_some() {
            if self.workspaces.is_visible(window) {
                self.display.map(window);
            }
        } else {
            self.manage(window, attrs.geometry);
        }
    }

    fn manage(&mut self, window: Window, geometry: Geometry) {
        if self.workspaces.locate(window).is_some() {
            return;
        }
        let mut client = Client::new(window, geometry, self.workspaces.current_index());
        client.name = self.display.window_title(window);
        client.is_urgent = self.display.is_urgent(window);
        if self.display.is_dialog(window) {
            info!("Managing dialog window {} ({})", window, client.name);
        } else {
            info!("Managing window {} ({})", window, client.name);
        }

        self.display.watch_client(window);
        let clients = &mut self.workspaces.current_mut().clients;
        clients.insert(client);
        clients.set_focus(window);

        self.display.map(window);
        self.display.raise(window);
        self.arrange();
        self.apply_focus();
        self.update_client_list();
    }

    fn unmanage(&mut self, window: Window) {
        let Some(index) = self.workspaces.locate(window) else { return };
        let visible = index == self.workspaces.current_index();
        if let Some(client) = self.workspaces.get_mut(index).and_then(|ws| ws.clients.remove(window)) {
            info!("Unmanaging window {} ({})", window, client.name);
        }
        if self.drag.dragged_window() == Some(window) {
            self.drag.end();
        }
        if visible {
            if self.workspaces.current().layout.is_tiling() {
                self.arrange();
            }
            self.apply_focus();
        }
        self.update_client_list();
    }

    fn on_unmap(&mut self, window: Window, via_root: bool) {
        if !via_root {
            return;
        }
        if let Some(pending) = self.expected_unmaps.get_mut(&window) {
            *pending -= 1;
            if *pending == 0 {
                self.expected_unmaps.remove(&window);
            }
            return;
        }
        self.unmanage(window);
    }

    fn on_configure_request(&mut self, request: &ConfigureRequest) {
        match self.workspaces.find(request.window) {
            Some(client) => {
                let border = if client.is_fullscreen { 0 } else { self.config.border_width };
                let geometry = client.geometry;
                self.display.send_configure_notify(request.window, geometry, border);
            }
            None => self.display.forward_configure(request),
        }
    }

    fn on_button_press(&mut self, window: Window, button: u8, state: u16, root_x: i16, root_y: i16) {
        if !self.workspaces.is_visible(window) {
            return;
        }
        self.focus(window);

        if clean_modifiers(state) & self.drag_modifier != self.drag_modifier {
            return;
        }
        let kind = if button == self.config.move_button {
            DragKind::Move
        } else if button == self.config.resize_button {
            DragKind::Resize
        } else {
            return;
        };
        let Some(client) = self.workspaces.find_mut(window) else { return };
        if client.is_fullscreen {
            return;
        }
        client.is_floating = true;
        let origin = client.geometry;
        self.drag.begin(window, kind, origin, root_x, root_y);
        self.display.raise(window);
        debug!("Started {:?} drag of {} at ({}, {})", kind, window, root_x, root_y);
    }

    fn on_motion(&mut self, root_x: i16, root_y: i16) {
        if !self.drag.is_dragging() {
            return;
        }
        let (x, y) = self.display.coalesce_motion(root_x, root_y);
        let Some((window, geometry)) = self.drag.motion(x, y) else { return };
        if let Some(client) = self.workspaces.find_mut(window) {
            client.geometry = geometry;
            self.display.move_resize(window, geometry);
        }
    }

    fn on_property(&mut self, window: Window, kind: PropertyKind) {
        if self.workspaces.locate(window).is_none() {
            return;
        }
        match kind {
            PropertyKind::Title => {
                let title = self.display.window_title(window);
                if let Some(client) = self.workspaces.find_mut(window) {
                    debug!("Window {} renamed to {}", window, title);
                    client.name = title;
                }
            }
            PropertyKind::Hints => {
                let urgent = self.display.is_urgent(window);
                if let Some(client) = self.workspaces.find_mut(window) {
                    client.is_urgent = urgent;
                }
                if self.workspaces.is_visible(window) {
                    self.update_borders();
                }
            }
        }
    }

    fn on_client_message(&mut self, request: ClientRequest) {
        match request {
            ClientRequest::Fullscreen { window, action } => {
                if let Some(client) = self.workspaces.find(window) {
                    let on = action.apply(client.is_fullscreen);
                    self.set_fullscreen(window, on);
                }
            }
            ClientRequest::Activate { window } => {
                if let Some(index) = self.workspaces.locate(window) {
                    self.switch_workspace(index);
                    self.focus(window);
                }
            }
            ClientRequest::CurrentDesktop { index } => match usize::try_from(index) {
                Ok(index) if index < self.workspaces.count() => self.switch_workspace(index),
                _ => warn!("Ignoring request for desktop {}", index),
            },
        }
    }

    /// Focuses `window` within the current workspace.
    pub fn focus(&mut self, window: Window) {
        if self.workspaces.current_mut().clients.set_focus(window) {
            self.apply_focus();
        }
    }

    /// Pushes the current workspace's focus to the display.
    fn apply_focus(&mut self) {
        let ws = self.workspaces.current();
        let focused = ws.clients.focused_window();
        let monocle = ws.layout == LayoutKind::Monocle;
        let fullscreen = ws.fullscreen_window();

        if let Some(window) = focused {
            self.display.set_input_focus(window);
            if monocle {
                self.display.raise(window);
            }
        }
        if let Some(window) = fullscreen {
            self.display.raise(window);
        }
        self.display.set_active_window(focused);
        self.update_borders();
    }

    fn update_borders(&mut self) {
        let ws = self.workspaces.current();
        let focused = ws.clients.focused_window();
        let borders: Vec<(Window, u16, u32)> = ws
            .clients
            .iter()
            .map(|client| {
                if client.is_fullscreen {
                    (client.window, 0, self.config.unfocused_border)
                } else if Some(client.window) == focused {
                    (client.window, self.config.border_width, self.config.focused_border)
                } else if client.is_urgent {
                    (client.window, self.config.border_width, self.config.urgent_border)
                } else {
                    (client.window, self.config.border_width, self.config.unfocused_border)
                }
            })
            .collect();
        for (window, width, color) in borders {
            self.display.set_border(window, width, color);
        }
    }

    /// Recomputes the current workspace's layout and applies it.
    pub fn arrange(&mut self) {
        let (width, height) = self.display.screen_size();
        let ws = self.workspaces.current();
        let kind = ws.layout;
        let placements = layout::layout(kind, &ws.tiled_windows(), width, height, self.config.border_width);
        let fullscreen = ws.fullscreen_window();
        let focused = ws.clients.focused_window();

        for (window, geometry) in placements {
            if let Some(client) = self.workspaces.current_mut().clients.find_mut(window) {
                client.geometry = geometry;
            }
            self.display.move_resize(window, geometry);
        }
        if kind == LayoutKind::Monocle {
            if let Some(window) = focused.filter(|&w| self.workspaces.find(w).is_some_and(Client::is_tiled)) {
                self.display.raise(window);
            }
        }
        if let Some(window) = fullscreen {
            let geometry = layout::fullscreen(width, height);
            self.display.move_resize(window, geometry);
            self.display.raise(window);
        }
        self.update_borders();
    }

    fn set_layout(&mut self, kind: LayoutKind) {
        info!("Workspace {} layout: {:?}", self.workspaces.current_index() + 1, kind);
        self.workspaces.current_mut().layout = kind;
        self.arrange();
    }

    fn toggle_floating(&mut self, window: Window) {
        let Some(client) = self.workspaces.find_mut(window) else { return };
        if client.is_fullscreen {
            return;
        }
        client.is_floating = !client.is_floating;
        debug!("Window {} floating: {}", window, client.is_floating);
        self.arrange();
    }

    /// Enters or leaves fullscreen. Entering evicts any other fullscreen
    /// client of the same workspace; leaving restores the saved geometry and
    /// re-tiles.
    pub fn set_fullscreen(&mut self, window: Window, on: bool) {
        let Some(index) = self.workspaces.locate(window) else { return };
        if self.workspaces.find(window).is_some_and(|c| c.is_fullscreen == on) {
            return;
        }
        let visible = index == self.workspaces.current_index();

        if on {
            self.evict_fullscreen(index, window);

            let (width, height) = self.display.screen_size();
            let geometry = layout::fullscreen(width, height);
            if let Some(client) = self.workspaces.find_mut(window) {
                client.saved_geometry = Some(client.geometry);
                client.is_fullscreen = true;
                client.geometry = geometry;
            }
            self.display.set_fullscreen_state(window, true);
            if visible {
                self.display.move_resize(window, geometry);
                self.display.set_border(window, 0, self.config.unfocused_border);
                self.display.raise(window);
            }
            info!("Window {} entered fullscreen", window);
        } else {
            self.leave_fullscreen(window, visible);
            if visible {
                self.arrange();
            }
            info!("Window {} left fullscreen", window);
        }
    }

    /// Takes every fullscreen client of workspace `index` other than `keep`
    /// out of fullscreen.
    fn evict_fullscreen(&mut self, index: usize, keep: Window) {
        let visible = index == self.workspaces.current_index();
        let others: Vec<Window> = self
            .workspaces
            .get(index)
            .map(|ws| {
                ws.clients.iter().filter(|c| c.is_fullscreen && c.window != keep).map(|c| c.window).collect()
            })
            .unwrap_or_default();
        for other in others {
            self.leave_fullscreen(other, visible);
        }
    }

    fn leave_fullscreen(&mut self, window: Window, visible: bool) {
        let Some(client) = self.workspaces.find_mut(window) else { return };
        client.is_fullscreen = false;
        if let Some(saved) = client.saved_geometry.take() {
            client.geometry = saved;
        }
        let geometry = client.geometry;
        self.display.set_fullscreen_state(window, false);
        if visible {
            self.display.move_resize(window, geometry);
            self.display.set_border(window, self.config.border_width, self.config.unfocused_border);
        }
    }

    pub fn switch_workspace(&mut self, target: usize) {
        let Some(switch) = self.workspaces.switch_to(target) else { return };
        info!("Switching from workspace {} to {}", switch.from + 1, switch.to + 1);

        if self.drag.is_dragging() {
            self.drag.end();
        }
        for window in switch.hide {
            self.hide(window);
        }
        self.arrange();
        for window in switch.show {
            self.display.map(window);
        }
        self.apply_focus();
        self.display.set_current_desktop(target);
    }

    /// Sends `window` to workspace `target`, re-tiling the one it left.
    pub fn move_to_workspace(&mut self, window: Window, target: usize) {
        let Some(source) = self.workspaces.move_client(window, target) else { return };
        info!("Moved window {} to workspace {}", window, target + 1);

        if self.workspaces.find(window).is_some_and(|c| c.is_fullscreen) {
            self.evict_fullscreen(target, window);
        }
        if self.drag.dragged_window() == Some(window) {
            self.drag.end();
        }
        if source == self.workspaces.current_index() {
            self.hide(window);
            self.arrange();
            self.apply_focus();
        }
        self.update_client_list();
    }

    fn hide(&mut self, window: Window) {
        *self.expected_unmaps.entry(window).or_insert(0) += 1;
        self.display.unmap(window);
    }

    fn update_client_list(&mut self) {
        let windows = self.workspaces.all_windows();
        self.display.set_client_list(&windows);
    }
}

/// Converts a 1-based workspace number to an index.
fn workspace_index(number: u8) -> Option<usize> {
    usize::from(number).checked_sub(1)
}
