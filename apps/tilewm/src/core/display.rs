//! The boundary between the window manager and the display server.
//!
//! `WindowManager` only talks to the server through [`DisplayServer`], and
//! only hears from it through [`DisplayEvent`]. Requests on windows that
//! have since vanished must degrade to no-ops: implementations log failures
//! instead of returning them.

use x11rb::protocol::xproto::Window;

use crate::window::client::Geometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    pub geometry: Geometry,
    pub override_redirect: bool,
    pub viewable: bool,
}

/// A client's own configure request. Fields it did not ask to change are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigureRequest {
    pub window: Window,
    pub x: Option<i16>,
    pub y: Option<i16>,
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub border_width: Option<u16>,
    pub sibling: Option<Window>,
    pub stack_mode: Option<u32>,
}

/// `_NET_WM_STATE` action carried by a client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

impl StateAction {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Remove),
            1 => Some(Self::Add),
            2 => Some(Self::Toggle),
            _ => None,
        }
    }

    pub fn apply(self, current: bool) -> bool {
        match self {
            Self::Remove => false,
            Self::Add => true,
            Self::Toggle => !current,
        }
    }
}

/// Client messages the manager acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRequest {
    Fullscreen { window: Window, action: StateAction },
    Activate { window: Window },
    CurrentDesktop { index: u32 },
}

/// Which managed property changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Title,
    Hints,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    MapRequest { window: Window },
    DestroyNotify { window: Window },
    /// `via_root` is false for the copy reported on the window itself.
    UnmapNotify { window: Window, via_root: bool },
    ConfigureRequest(ConfigureRequest),
    /// `grab_induced` covers grab/ungrab crossings and inferior crossings.
    EnterNotify { window: Window, grab_induced: bool },
    KeyPress { keycode: u8, state: u16 },
    /// `window` is the top-level window under the pointer, if any.
    ButtonPress { window: Option<Window>, button: u8, state: u16, root_x: i16, root_y: i16 },
    ButtonRelease { button: u8 },
    MotionNotify { root_x: i16, root_y: i16 },
    KeyboardMappingChanged,
    PropertyNotify { window: Window, kind: PropertyKind },
    ClientMessage(ClientRequest),
    /// Asynchronous protocol error report; never fatal.
    ProtocolError { description: String },
}

/// A key grab: modifier mask plus keysym.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyGrab {
    pub modifiers: u16,
    pub keysym: u32,
}

/// A pointer button grab on the root window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonGrab {
    pub modifiers: u16,
    pub button: u8,
}

pub trait DisplayServer {
    type Error: std::error::Error + Send + Sync + 'static;

    fn screen_size(&self) -> (u16, u16);

    /// Blocks until the next event arrives.
    fn next_event(&mut self) -> Result<DisplayEvent, Self::Error>;

    /// Drains motion events already queued behind `(root_x, root_y)` and
    /// returns the latest position. Other queued events are kept in order.
    fn coalesce_motion(&mut self, root_x: i16, root_y: i16) -> (i16, i16);

    fn move_resize(&mut self, window: Window, geometry: Geometry);
    fn set_border(&mut self, window: Window, width: u16, color: u32);
    fn raise(&mut self, window: Window);
    fn set_input_focus(&mut self, window: Window);
    fn map(&mut self, window: Window);
    fn unmap(&mut self, window: Window);

    /// Selects the per-client events the manager listens to.
    fn watch_client(&mut self, window: Window);

    fn top_level_windows(&mut self) -> Vec<Window>;
    fn window_attributes(&mut self, window: Window) -> Option<WindowAttributes>;

    /// Title, falling back to `"unknown"`.
    fn window_title(&mut self, window: Window) -> String;
    /// Urgency hint, falling back to `false`.
    fn is_urgent(&mut self, window: Window) -> bool;
    fn is_dialog(&mut self, window: Window) -> bool;

    /// Tells a managed client where it is without moving it.
    fn send_configure_notify(&mut self, window: Window, geometry: Geometry, border_width: u16);
    /// Applies an unmanaged window's configure request unchanged.
    fn forward_configure(&mut self, request: &ConfigureRequest);

    /// Releases every grab, then registers the given key and button grabs.
    fn grab_bindings(&mut self, keys: &[KeyGrab], buttons: &[ButtonGrab]);
    fn refresh_keyboard_mapping(&mut self);
    fn keysym(&self, keycode: u8) -> u32;

    /// Politely asks the client to close, or kills it.
    fn close_window(&mut self, window: Window);

    fn set_active_window(&mut self, window: Option<Window>);
    fn set_current_desktop(&mut self, index: usize);
    fn set_client_list(&mut self, windows: &[Window]);
    fn set_fullscreen_state(&mut self, window: Window, fullscreen: bool);

    fn flush(&mut self);
}
