use x11rb::protocol::xproto::Window;

/// Position and content size of a window. The border is drawn outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

impl Geometry {
    pub const fn new(x: i16, y: i16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    /// The window ID of the application window
    pub window: Window,
    pub geometry: Geometry,
    /// Pre-fullscreen geometry, present only while fullscreen.
    pub saved_geometry: Option<Geometry>,
    pub is_fullscreen: bool,
    /// Excluded from automatic layout after an interactive drag.
    pub is_floating: bool,
    pub is_urgent: bool,
    pub name: String,
    /// Workspace index, 0-based.
    pub workspace: usize,
}

impl Client {
    pub fn new(window: Window, geometry: Geometry, workspace: usize) -> Self {
        Self {
            window,
            geometry,
            saved_geometry: None,
            is_fullscreen: false,
            is_floating: false,
            is_urgent: false,
            name: String::from("unknown"),
            workspace,
        }
    }

    /// Whether the tiling engine places this client.
    pub fn is_tiled(&self) -> bool {
        !self.is_fullscreen && !self.is_floating
    }
}
