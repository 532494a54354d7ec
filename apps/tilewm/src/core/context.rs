use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tilewm_config::mask;
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::errors::ConnectionError;
use x11rb::protocol::xproto::{
    AtomEnum, ButtonIndex, ChangeWindowAttributesAux, ClientMessageData, ClientMessageEvent, ConfigWindow,
    ConfigureNotifyEvent, ConfigureRequestEvent, ConfigureWindowAux, ConnectionExt, EventMask, Grab, GrabMode,
    InputFocus, MapState, Mapping, ModMask, NotifyDetail, NotifyMode, PropMode, StackMode, Window,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::core::display::{
    ButtonGrab, ClientRequest, ConfigureRequest, DisplayEvent, DisplayServer, KeyGrab, PropertyKind, StateAction,
    WindowAttributes,
};
use crate::ewmh::atoms::AtomCollection;
use crate::input::keymap::Keymap;
use crate::window::client::Geometry;
use crate::window::error::{log_warn, ErrorCategory, ErrorTracker};

/// Lock-key combinations every grab is repeated under, so CapsLock and
/// NumLock never disable a binding.
const LOCK_VARIANTS: [u16; 4] = [0, mask::LOCK, mask::MOD2, mask::LOCK | mask::MOD2];

const URGENCY_HINT: u32 = 1 << 8;

pub struct X11Context {
    pub conn: RustConnection,
    pub screen_num: usize,
    pub root_window: Window,
    pub atoms: AtomCollection,
    pub screen_width: u16,
    pub screen_height: u16,
    keymap: Keymap,
    errors: Arc<ErrorTracker>,
    /// Events read ahead while coalescing motion.
    pending: VecDeque<Event>,
}

impl X11Context {
    pub fn new(errors: Arc<ErrorTracker>) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("connect to X server")?;
        let screen = &conn.setup().roots[screen_num];
        let root_window = screen.root;
        let screen_width = screen.width_in_pixels;
        let screen_height = screen.height_in_pixels;

        let atoms = AtomCollection::new(&conn)?.reply()?;

        // Only one client may redirect the root's substructure; failing here
        // means another window manager is running.
        let values = ChangeWindowAttributesAux::new()
            .event_mask(EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY);
        conn.change_window_attributes(root_window, &values)?
            .check()
            .context("another window manager already owns the root window")?;

        let mut ctx = Self {
            conn,
            screen_num,
            root_window,
            atoms,
            screen_width,
            screen_height,
            keymap: Keymap::default(),
            errors,
            pending: VecDeque::new(),
        };
        ctx.refresh_keyboard_mapping();
        Ok(ctx)
    }

    fn request<T, E: Display>(&self, result: Result<T, E>, operation: &str) -> Option<T> {
        self.errors.warn_if_failed(result, operation, ErrorCategory::Request)
    }

    fn translate(&self, event: Event) -> Option<DisplayEvent> {
        let translated = match event {
            Event::MapRequest(e) => DisplayEvent::MapRequest { window: e.window },
            Event::DestroyNotify(e) => DisplayEvent::DestroyNotify { window: e.window },
            Event::UnmapNotify(e) => DisplayEvent::UnmapNotify { window: e.window, via_root: e.event == self.root_window },
            Event::ConfigureRequest(e) => DisplayEvent::ConfigureRequest(configure_request(&e)),
            Event::EnterNotify(e) => DisplayEvent::EnterNotify {
                window: e.event,
                grab_induced: e.mode != NotifyMode::NORMAL || e.detail == NotifyDetail::INFERIOR,
            },
            Event::KeyPress(e) => DisplayEvent::KeyPress { keycode: e.detail, state: u16::from(e.state) },
            Event::ButtonPress(e) => {
                let window = if e.child != x11rb::NONE {
                    Some(e.child)
                } else if e.event != self.root_window {
                    Some(e.event)
                } else {
                    None
                };
                DisplayEvent::ButtonPress {
                    window,
                    button: e.detail,
                    state: u16::from(e.state),
                    root_x: e.root_x,
                    root_y: e.root_y,
                }
            }
            Event::ButtonRelease(e) => DisplayEvent::ButtonRelease { button: e.detail },
            Event::MotionNotify(e) => DisplayEvent::MotionNotify { root_x: e.root_x, root_y: e.root_y },
            Event::MappingNotify(e) if e.request != Mapping::POINTER => DisplayEvent::KeyboardMappingChanged,
            Event::PropertyNotify(e) => {
                let kind = if e.atom == self.atoms._NET_WM_NAME || e.atom == u32::from(AtomEnum::WM_NAME) {
                    PropertyKind::Title
                } else if e.atom == u32::from(AtomEnum::WM_HINTS) {
                    PropertyKind::Hints
                } else {
                    return None;
                };
                DisplayEvent::PropertyNotify { window: e.window, kind }
            }
            Event::ClientMessage(e) => {
                if e.format != 32 {
                    return None;
                }
                let data = e.data.as_data32();
                let request = if e.type_ == self.atoms._NET_WM_STATE
                    && (data[1] == self.atoms._NET_WM_STATE_FULLSCREEN || data[2] == self.atoms._NET_WM_STATE_FULLSCREEN)
                {
                    ClientRequest::Fullscreen { window: e.window, action: StateAction::from_raw(data[0])? }
                } else if e.type_ == self.atoms._NET_ACTIVE_WINDOW {
                    ClientRequest::Activate { window: e.window }
                } else if e.type_ == self.atoms._NET_CURRENT_DESKTOP {
                    ClientRequest::CurrentDesktop { index: data[0] }
                } else {
                    return None;
                };
                DisplayEvent::ClientMessage(request)
            }
            Event::Error(e) => DisplayEvent::ProtocolError {
                description: format!(
                    "{:?} in {} (resource {}, major {}, minor {})",
                    e.error_kind,
                    e.request_name.unwrap_or("unknown request"),
                    e.bad_value,
                    e.major_opcode,
                    e.minor_opcode
                ),
            },
            _ => return None,
        };
        Some(translated)
    }

    fn property_bytes(&self, window: Window, property: u32, type_: u32, long_length: u32) -> Option<Vec<u8>> {
        let reply = self
            .conn
            .get_property(false, window, property, type_, 0, long_length)
            .ok()?
            .reply()
            .ok()?;
        (!reply.value.is_empty()).then_some(reply.value)
    }

    fn property_u32s(&self, window: Window, property: u32, type_: u32, long_length: u32) -> Vec<u32> {
        self.conn
            .get_property(false, window, property, type_, 0, long_length)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .and_then(|reply| reply.value32().map(|values| values.collect()))
            .unwrap_or_default()
    }

    fn supports_delete(&self, window: Window) -> bool {
        self.property_u32s(window, self.atoms.WM_PROTOCOLS, AtomEnum::ATOM.into(), 64)
            .contains(&self.atoms.WM_DELETE_WINDOW)
    }
}

/// Keeps only the fields the client's value mask marks as requested.
fn configure_request(e: &ConfigureRequestEvent) -> ConfigureRequest {
    let value_mask = u16::from(e.value_mask);
    let has = |bit: ConfigWindow| value_mask & u16::from(bit) != 0;
    ConfigureRequest {
        window: e.window,
        x: has(ConfigWindow::X).then_some(e.x),
        y: has(ConfigWindow::Y).then_some(e.y),
        width: has(ConfigWindow::WIDTH).then_some(e.width),
        height: has(ConfigWindow::HEIGHT).then_some(e.height),
        border_width: has(ConfigWindow::BORDER_WIDTH).then_some(e.border_width),
        sibling: has(ConfigWindow::SIBLING).then_some(e.sibling),
        stack_mode: has(ConfigWindow::STACK_MODE).then_some(u32::from(e.stack_mode)),
    }
}

impl DisplayServer for X11Context {
    type Error = ConnectionError;

    fn screen_size(&self) -> (u16, u16) {
        (self.screen_width, self.screen_height)
    }

    fn next_event(&mut self) -> Result<DisplayEvent, ConnectionError> {
        loop {
            let event = match self.pending.pop_front() {
                Some(event) => event,
                None => self.conn.wait_for_event()?,
            };
            if let Some(event) = self.translate(event) {
                return Ok(event);
            }
        }
    }

    fn coalesce_motion(&mut self, root_x: i16, root_y: i16) -> (i16, i16) {
        let mut latest = (root_x, root_y);
        if !self.pending.is_empty() {
            return latest;
        }
        loop {
            match self.conn.poll_for_event() {
                Ok(Some(Event::MotionNotify(e))) => latest = (e.root_x, e.root_y),
                Ok(Some(other)) => {
                    self.pending.push_back(other);
                    break;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Polling for motion events failed: {}", e);
                    break;
                }
            }
        }
        latest
    }

    fn move_resize(&mut self, window: Window, geometry: Geometry) {
        let values = ConfigureWindowAux::new()
            .x(i32::from(geometry.x))
            .y(i32::from(geometry.y))
            .width(u32::from(geometry.width))
            .height(u32::from(geometry.height));
        self.request(self.conn.configure_window(window, &values), "move/resize window");
    }

    fn set_border(&mut self, window: Window, width: u16, color: u32) {
        self.request(
            self.conn.configure_window(window, &ConfigureWindowAux::new().border_width(u32::from(width))),
            "set border width",
        );
        self.request(
            self.conn.change_window_attributes(window, &ChangeWindowAttributesAux::new().border_pixel(color)),
            "set border color",
        );
    }

    fn raise(&mut self, window: Window) {
        self.request(
            self.conn.configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE)),
            "raise window",
        );
    }

    fn set_input_focus(&mut self, window: Window) {
        self.request(
            self.conn.set_input_focus(InputFocus::POINTER_ROOT, window, x11rb::CURRENT_TIME),
            "set input focus",
        );
    }

    fn map(&mut self, window: Window) {
        self.request(self.conn.map_window(window), "map window");
    }

    fn unmap(&mut self, window: Window) {
        self.request(self.conn.unmap_window(window), "unmap window");
    }

    fn watch_client(&mut self, window: Window) {
        let values = ChangeWindowAttributesAux::new().event_mask(EventMask::ENTER_WINDOW | EventMask::PROPERTY_CHANGE);
        self.request(self.conn.change_window_attributes(window, &values), "select client events");
    }

    fn top_level_windows(&mut self) -> Vec<Window> {
        let tree = self.conn.query_tree(self.root_window).map_err(anyhow::Error::from).and_then(|cookie| {
            cookie.reply().map_err(anyhow::Error::from)
        });
        self.errors
            .warn_if_failed(tree, "query window tree", ErrorCategory::Window)
            .map(|tree| tree.children)
            .unwrap_or_default()
    }

    fn window_attributes(&mut self, window: Window) -> Option<WindowAttributes> {
        let attrs = self.conn.get_window_attributes(window).ok()?.reply().ok()?;
        let geom = self.conn.get_geometry(window).ok()?.reply().ok()?;
        Some(WindowAttributes {
            geometry: Geometry::new(geom.x, geom.y, geom.width, geom.height),
            override_redirect: attrs.override_redirect,
            viewable: attrs.map_state == MapState::VIEWABLE,
        })
    }

    fn window_title(&mut self, window: Window) -> String {
        let candidates = [
            (self.atoms._NET_WM_NAME, self.atoms.UTF8_STRING),
            (AtomEnum::WM_NAME.into(), AtomEnum::ANY.into()),
        ];
        candidates
            .into_iter()
            .find_map(|(property, type_)| self.property_bytes(window, property, type_, 1024))
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn is_urgent(&mut self, window: Window) -> bool {
        let hints = self.property_u32s(window, AtomEnum::WM_HINTS.into(), AtomEnum::WM_HINTS.into(), 9);
        hints.first().is_some_and(|flags| flags & URGENCY_HINT != 0)
    }

    fn is_dialog(&mut self, window: Window) -> bool {
        self.property_u32s(window, self.atoms._NET_WM_WINDOW_TYPE, AtomEnum::ATOM.into(), 32)
            .contains(&self.atoms._NET_WM_WINDOW_TYPE_DIALOG)
    }

    fn send_configure_notify(&mut self, window: Window, geometry: Geometry, border_width: u16) {
        let event = ConfigureNotifyEvent {
            response_type: x11rb::protocol::xproto::CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: x11rb::NONE,
            x: geometry.x,
            y: geometry.y,
            width: geometry.width,
            height: geometry.height,
            border_width,
            override_redirect: false,
        };
        self.request(self.conn.send_event(false, window, EventMask::STRUCTURE_NOTIFY, event), "send configure notify");
    }

    fn forward_configure(&mut self, request: &ConfigureRequest) {
        let mut values = ConfigureWindowAux::new();
        if let Some(x) = request.x {
            values = values.x(i32::from(x));
        }
        if let Some(y) = request.y {
            values = values.y(i32::from(y));
        }
        if let Some(width) = request.width {
            values = values.width(u32::from(width));
        }
        if let Some(height) = request.height {
            values = values.height(u32::from(height));
        }
        if let Some(border_width) = request.border_width {
            values = values.border_width(u32::from(border_width));
        }
        if let Some(sibling) = request.sibling {
            values = values.sibling(sibling);
        }
        if let Some(mode) = request.stack_mode {
            values = values.stack_mode(StackMode::from(mode));
        }
        self.request(self.conn.configure_window(request.window, &values), "forward configure request");
    }

    fn grab_bindings(&mut self, keys: &[KeyGrab], buttons: &[ButtonGrab]) {
        let root = self.root_window;
        self.request(self.conn.ungrab_key(Grab::ANY, root, ModMask::ANY), "release key grabs");
        self.request(self.conn.ungrab_button(ButtonIndex::ANY, root, ModMask::ANY), "release button grabs");

        for grab in keys {
            let keycodes = self.keymap.keycodes(grab.keysym);
            if keycodes.is_empty() {
                debug!("No keycode produces keysym {:#x}", grab.keysym);
            }
            for keycode in keycodes {
                for extra in LOCK_VARIANTS {
                    self.request(
                        self.conn.grab_key(
                            true,
                            root,
                            ModMask::from(grab.modifiers | extra),
                            keycode,
                            GrabMode::ASYNC,
                            GrabMode::ASYNC,
                        ),
                        "grab key",
                    );
                }
            }
        }

        for grab in buttons {
            for extra in LOCK_VARIANTS {
                self.request(
                    self.conn.grab_button(
                        false,
                        root,
                        EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                        GrabMode::ASYNC,
                        GrabMode::ASYNC,
                        x11rb::NONE,
                        x11rb::NONE,
                        ButtonIndex::from(grab.button),
                        ModMask::from(grab.modifiers | extra),
                    ),
                    "grab button",
                );
            }
        }
    }

    fn refresh_keyboard_mapping(&mut self) {
        let setup = self.conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let reply = self
            .conn
            .get_keyboard_mapping(min, max - min + 1)
            .map_err(anyhow::Error::from)
            .and_then(|cookie| cookie.reply().map_err(anyhow::Error::from));
        if let Some(reply) = self.errors.warn_if_failed(reply, "get keyboard mapping", ErrorCategory::Window) {
            self.keymap = Keymap::new(min, reply.keysyms_per_keycode, reply.keysyms);
            debug!("Loaded keyboard mapping for keycodes {}..={}", min, max);
        }
    }

    fn keysym(&self, keycode: u8) -> u32 {
        self.keymap.keysym(keycode)
    }

    fn close_window(&mut self, window: Window) {
        if self.supports_delete(window) {
            let event = ClientMessageEvent {
                response_type: x11rb::protocol::xproto::CLIENT_MESSAGE_EVENT,
                format: 32,
                window,
                type_: self.atoms.WM_PROTOCOLS,
                data: ClientMessageData::from([self.atoms.WM_DELETE_WINDOW, x11rb::CURRENT_TIME, 0, 0, 0]),
                sequence: 0,
            };
            self.request(self.conn.send_event(false, window, EventMask::NO_EVENT, event), "send WM_DELETE_WINDOW");
        } else {
            self.request(self.conn.kill_client(window), "kill client");
        }
    }

    fn set_active_window(&mut self, window: Option<Window>) {
        self.request(
            self.conn.change_property32(
                PropMode::REPLACE,
                self.root_window,
                self.atoms._NET_ACTIVE_WINDOW,
                AtomEnum::WINDOW,
                &[window.unwrap_or(x11rb::NONE)],
            ),
            "set _NET_ACTIVE_WINDOW",
        );
    }

    fn set_current_desktop(&mut self, index: usize) {
        let index = u32::try_from(index).unwrap_or(0);
        self.request(
            self.conn.change_property32(
                PropMode::REPLACE,
                self.root_window,
                self.atoms._NET_CURRENT_DESKTOP,
                AtomEnum::CARDINAL,
                &[index],
            ),
            "set _NET_CURRENT_DESKTOP",
        );
    }

    fn set_client_list(&mut self, windows: &[Window]) {
        self.request(
            self.conn.change_property32(
                PropMode::REPLACE,
                self.root_window,
                self.atoms._NET_CLIENT_LIST,
                AtomEnum::WINDOW,
                windows,
            ),
            "set _NET_CLIENT_LIST",
        );
    }

    fn set_fullscreen_state(&mut self, window: Window, fullscreen: bool) {
        let fullscreen_state = [self.atoms._NET_WM_STATE_FULLSCREEN];
        let states: &[u32] = if fullscreen { &fullscreen_state } else { &[] };
        self.request(
            self.conn.change_property32(PropMode::REPLACE, window, self.atoms._NET_WM_STATE, AtomEnum::ATOM, states),
            "set _NET_WM_STATE",
        );
    }

    fn flush(&mut self) {
        log_warn(self.conn.flush(), "flush connection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_event(value_mask: ConfigWindow) -> ConfigureRequestEvent {
        ConfigureRequestEvent {
            response_type: x11rb::protocol::xproto::CONFIGURE_REQUEST_EVENT,
            stack_mode: StackMode::BELOW,
            sequence: 0,
            parent: 1,
            window: 42,
            sibling: 7,
            x: 10,
            y: 20,
            width: 300,
            height: 200,
            border_width: 1,
            value_mask,
        }
    }

    #[test]
    fn test_configure_request_keeps_masked_fields() {
        let request = configure_request(&request_event(ConfigWindow::X | ConfigWindow::HEIGHT | ConfigWindow::STACK_MODE));
        assert_eq!(
            request,
            ConfigureRequest {
                window: 42,
                x: Some(10),
                height: Some(200),
                stack_mode: Some(u32::from(StackMode::BELOW)),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_configure_request_stack_mode_round_trips() {
        let request = configure_request(&request_event(ConfigWindow::STACK_MODE | ConfigWindow::SIBLING));
        assert_eq!(request.sibling, Some(7));
        assert_eq!(request.stack_mode.map(StackMode::from), Some(StackMode::BELOW));
    }
}
