use x11rb::protocol::xproto::Window;

use crate::window::client::Geometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging {
        window: Window,
        kind: DragKind,
        origin: Geometry,
        start_pointer_x: i16,
        start_pointer_y: i16,
    },
}

/// Tracks one press/motion/release bracket of an interactive move or resize.
#[derive(Debug)]
pub struct InteractionController {
    state: DragState,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self { state: DragState::Idle }
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn dragged_window(&self) -> Option<Window> {
        match self.state {
            DragState::Dragging { window, .. } => Some(window),
            DragState::Idle => None,
        }
    }

    /// Enters Dragging. A press while already dragging restarts the bracket.
    pub fn begin(&mut self, window: Window, kind: DragKind, origin: Geometry, pointer_x: i16, pointer_y: i16) {
        self.state = DragState::Dragging {
            window,
            kind,
            origin,
            start_pointer_x: pointer_x,
            start_pointer_y: pointer_y,
        };
    }

    /// Geometry the dragged window should take for a pointer at `(pointer_x, pointer_y)`.
    pub fn motion(&self, pointer_x: i16, pointer_y: i16) -> Option<(Window, Geometry)> {
        let DragState::Dragging { window, kind, origin, start_pointer_x, start_pointer_y } = self.state else {
            return None;
        };
        let dx = i32::from(pointer_x) - i32::from(start_pointer_x);
        let dy = i32::from(pointer_y) - i32::from(start_pointer_y);

        let geometry = match kind {
            DragKind::Move => Geometry {
                x: clamp_i16(i32::from(origin.x) + dx),
                y: clamp_i16(i32::from(origin.y) + dy),
                ..origin
            },
            DragKind::Resize => Geometry {
                width: clamp_dimension(i32::from(origin.width) + dx),
                height: clamp_dimension(i32::from(origin.height) + dy),
                ..origin
            },
        };
        Some((window, geometry))
    }

    /// Returns to Idle, yielding the window that was being dragged.
    pub fn end(&mut self) -> Option<Window> {
        let window = self.dragged_window();
        self.state = DragState::Idle;
        window
    }
}

fn clamp_i16(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

fn clamp_dimension(value: i32) -> u16 {
    value.clamp(1, i32::from(u16::MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: Geometry = Geometry::new(100, 50, 400, 300);

    #[test]
    fn test_idle_ignores_motion_and_release() {
        let mut drag = InteractionController::new();
        assert!(drag.motion(10, 10).is_none());
        assert_eq!(drag.end(), None);
        assert_eq!(drag.state(), DragState::Idle);
    }

    #[test]
    fn test_move_follows_pointer_displacement() {
        let mut drag = InteractionController::new();
        drag.begin(9, DragKind::Move, ORIGIN, 500, 500);
        assert!(drag.is_dragging());
        assert_eq!(drag.motion(530, 480), Some((9, Geometry::new(130, 30, 400, 300))));
        // Displacement is measured from the press, not the previous motion.
        assert_eq!(drag.motion(490, 510), Some((9, Geometry::new(90, 60, 400, 300))));
        assert_eq!(drag.end(), Some(9));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_resize_grows_and_shrinks_per_axis() {
        let mut drag = InteractionController::new();
        drag.begin(3, DragKind::Resize, ORIGIN, 0, 0);
        assert_eq!(drag.motion(50, -20), Some((3, Geometry::new(100, 50, 450, 280))));
    }

    #[test]
    fn test_resize_never_below_one_pixel() {
        let mut drag = InteractionController::new();
        drag.begin(3, DragKind::Resize, ORIGIN, 0, 0);
        for (px, py) in [(-400, -300), (-401, -301), (i16::MIN, i16::MIN), (-399, 5000)] {
            let (_, g) = drag.motion(px, py).unwrap();
            assert!(g.width >= 1 && g.height >= 1, "{:?} from ({}, {})", g, px, py);
        }
        let (_, g) = drag.motion(i16::MIN, i16::MIN).unwrap();
        assert_eq!((g.width, g.height), (1, 1));
    }

    #[test]
    fn test_new_press_restarts_bracket() {
        let mut drag = InteractionController::new();
        drag.begin(1, DragKind::Move, ORIGIN, 0, 0);
        drag.begin(2, DragKind::Resize, Geometry::new(0, 0, 10, 10), 5, 5);
        assert_eq!(drag.dragged_window(), Some(2));
        assert_eq!(drag.motion(6, 6), Some((2, Geometry::new(0, 0, 11, 11))));
    }
}
