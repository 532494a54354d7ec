//! In-memory display used by the manager tests.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;
use x11rb::protocol::xproto::Window;

use crate::core::display::{ButtonGrab, ConfigureRequest, DisplayEvent, DisplayServer, KeyGrab, WindowAttributes};
use crate::window::client::Geometry;

#[derive(Error, Debug)]
pub enum MockError {
    #[error("scripted event queue exhausted")]
    Exhausted,
}

/// Every request the manager issued, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    MoveResize(Window, Geometry),
    SetBorder(Window, u16, u32),
    Raise(Window),
    Focus(Window),
    Map(Window),
    Unmap(Window),
    Watch(Window),
    ConfigureNotify(Window, Geometry, u16),
    Forward(ConfigureRequest),
    Grab { keys: Vec<KeyGrab>, buttons: Vec<ButtonGrab> },
    RefreshKeyboardMapping,
    Close(Window),
    ActiveWindow(Option<Window>),
    CurrentDesktop(usize),
    ClientList(Vec<Window>),
    FullscreenState(Window, bool),
}

#[derive(Debug, Default)]
pub struct MockDisplay {
    pub width: u16,
    pub height: u16,
    pub events: VecDeque<DisplayEvent>,
    pub requests: Vec<Request>,
    pub attributes: HashMap<Window, WindowAttributes>,
    pub titles: HashMap<Window, String>,
    pub urgent: HashSet<Window>,
    pub dialogs: HashSet<Window>,
    pub keysyms: HashMap<u8, u32>,
    pub mapped: HashSet<Window>,
    pub flushes: usize,
}

impl MockDisplay {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height, ..Default::default() }
    }

    /// Registers a top-level window the way a client would create one.
    pub fn add_window(&mut self, window: Window, geometry: Geometry) {
        self.attributes.insert(window, WindowAttributes { geometry, override_redirect: false, viewable: false });
    }

    pub fn add_override_redirect(&mut self, window: Window) {
        self.attributes.insert(
            window,
            WindowAttributes { geometry: Geometry::new(0, 0, 10, 10), override_redirect: true, viewable: false },
        );
    }

    pub fn push(&mut self, event: DisplayEvent) {
        self.events.push_back(event);
    }

    /// Last geometry requested for `window`.
    pub fn geometry_of(&self, window: Window) -> Option<Geometry> {
        self.requests.iter().rev().find_map(|r| match r {
            Request::MoveResize(w, g) if *w == window => Some(*g),
            _ => None,
        })
    }

    pub fn border_of(&self, window: Window) -> Option<(u16, u32)> {
        self.requests.iter().rev().find_map(|r| match r {
            Request::SetBorder(w, width, color) if *w == window => Some((*width, *color)),
            _ => None,
        })
    }

    pub fn focused(&self) -> Option<Window> {
        self.requests.iter().rev().find_map(|r| match r {
            Request::Focus(w) => Some(*w),
            _ => None,
        })
    }

    pub fn is_mapped(&self, window: Window) -> bool {
        self.mapped.contains(&window)
    }

    pub fn count(&self, wanted: &Request) -> usize {
        self.requests.iter().filter(|r| *r == wanted).count()
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }
}

impl DisplayServer for MockDisplay {
    type Error = MockError;

    fn screen_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn next_event(&mut self) -> Result<DisplayEvent, MockError> {
        self.events.pop_front().ok_or(MockError::Exhausted)
    }

    fn coalesce_motion(&mut self, root_x: i16, root_y: i16) -> (i16, i16) {
        let mut latest = (root_x, root_y);
        while let Some(DisplayEvent::MotionNotify { root_x, root_y }) = self.events.front() {
            latest = (*root_x, *root_y);
            self.events.pop_front();
        }
        latest
    }

    fn move_resize(&mut self, window: Window, geometry: Geometry) {
        if let Some(attrs) = self.attributes.get_mut(&window) {
            attrs.geometry = geometry;
        }
        self.requests.push(Request::MoveResize(window, geometry));
    }

    fn set_border(&mut self, window: Window, width: u16, color: u32) {
        self.requests.push(Request::SetBorder(window, width, color));
    }

    fn raise(&mut self, window: Window) {
        self.requests.push(Request::Raise(window));
    }

    fn set_input_focus(&mut self, window: Window) {
        self.requests.push(Request::Focus(window));
    }

    fn map(&mut self, window: Window) {
        self.mapped.insert(window);
        if let Some(attrs) = self.attributes.get_mut(&window) {
            attrs.viewable = true;
        }
        self.requests.push(Request::Map(window));
    }

    fn unmap(&mut self, window: Window) {
        self.mapped.remove(&window);
        if let Some(attrs) = self.attributes.get_mut(&window) {
            attrs.viewable = false;
        }
        self.requests.push(Request::Unmap(window));
    }

    fn watch_client(&mut self, window: Window) {
        self.requests.push(Request::Watch(window));
    }

    fn top_level_windows(&mut self) -> Vec<Window> {
        let mut windows: Vec<Window> = self.attributes.keys().copied().collect();
        windows.sort_unstable();
        windows
    }

    fn window_attributes(&mut self, window: Window) -> Option<WindowAttributes> {
        self.attributes.get(&window).copied()
    }

    fn window_title(&mut self, window: Window) -> String {
        self.titles.get(&window).cloned().unwrap_or_else(|| "unknown".to_string())
    }

    fn is_urgent(&mut self, window: Window) -> bool {
        self.urgent.contains(&window)
    }

    fn is_dialog(&mut self, window: Window) -> bool {
        self.dialogs.contains(&window)
    }

    fn send_configure_notify(&mut self, window: Window, geometry: Geometry, border_width: u16) {
        self.requests.push(Request::ConfigureNotify(window, geometry, border_width));
    }

    fn forward_configure(&mut self, request: &ConfigureRequest) {
        self.requests.push(Request::Forward(*request));
    }

    fn grab_bindings(&mut self, keys: &[KeyGrab], buttons: &[ButtonGrab]) {
        self.requests.push(Request::Grab { keys: keys.to_vec(), buttons: buttons.to_vec() });
    }

    fn refresh_keyboard_mapping(&mut self) {
        self.requests.push(Request::RefreshKeyboardMapping);
    }

    fn keysym(&self, keycode: u8) -> u32 {
        self.keysyms.get(&keycode).copied().unwrap_or(0)
    }

    fn close_window(&mut self, window: Window) {
        self.requests.push(Request::Close(window));
    }

    fn set_active_window(&mut self, window: Option<Window>) {
        self.requests.push(Request::ActiveWindow(window));
    }

    fn set_current_desktop(&mut self, index: usize) {
        self.requests.push(Request::CurrentDesktop(index));
    }

    fn set_client_list(&mut self, windows: &[Window]) {
        self.requests.push(Request::ClientList(windows.to_vec()));
    }

    fn set_fullscreen_state(&mut self, window: Window, fullscreen: bool) {
        self.requests.push(Request::FullscreenState(window, fullscreen));
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }
}
