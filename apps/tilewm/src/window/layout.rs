use tilewm_config::LayoutKind;
use x11rb::protocol::xproto::Window;

use crate::window::client::Geometry;

/// Builds a geometry whose content size excludes a border on each edge.
fn inset(x: i32, y: i32, width: i32, height: i32, border: i32) -> Geometry {
    let coordinate = |v: i32| v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
    let dimension = |v: i32| (v - 2 * border).clamp(1, i32::from(u16::MAX)) as u16;
    Geometry { x: coordinate(x), y: coordinate(y), width: dimension(width), height: dimension(height) }
}

/// Places `windows` (already filtered to tiled clients, in registry order)
/// on a `screen_width` x `screen_height` screen. Float places nothing.
pub fn layout(
    kind: LayoutKind,
    windows: &[Window],
    screen_width: u16,
    screen_height: u16,
    border: u16,
) -> Vec<(Window, Geometry)> {
    let w = i32::from(screen_width);
    let h = i32::from(screen_height);
    let b = i32::from(border);

    match kind {
        LayoutKind::Float => Vec::new(),
        LayoutKind::Monocle => windows.iter().map(|&win| (win, inset(0, 0, w, h, b))).collect(),
        LayoutKind::Tile => match windows {
            [] => Vec::new(),
            [only] => vec![(*only, inset(b, b, w, h, b))],
            [master, stack @ ..] => {
                let master_width = w / 2;
                let mut placed = Vec::with_capacity(windows.len());
                placed.push((*master, inset(0, 0, master_width, h, b)));

                let count = stack.len() as i32;
                let row_height = h / count;
                let mut y = 0;
                for (i, &win) in stack.iter().enumerate() {
                    // The last row absorbs the division remainder.
                    let height = if i as i32 == count - 1 { h - y } else { row_height };
                    placed.push((win, inset(master_width, y, w - master_width, height, b)));
                    y += height;
                }
                placed
            }
        },
    }
}

/// Full-screen rectangle for a fullscreen client; it is shown without a border.
pub fn fullscreen(screen_width: u16, screen_height: u16) -> Geometry {
    Geometry::new(0, 0, screen_width.max(1), screen_height.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_oversized_border_saturates() {
        let placed = layout(LayoutKind::Tile, &[1], 1280, 720, u16::MAX);
        assert_eq!(placed, vec![(1, Geometry::new(i16::MAX, i16::MAX, 1, 1))]);
    }

    #[test]
    fn test_empty_sequence_places_nothing() {
        for kind in [LayoutKind::Tile, LayoutKind::Monocle, LayoutKind::Float] {
            assert!(layout(kind, &[], 1280, 720, 2).is_empty());
        }
    }

    #[test]
    fn test_single_tile_fills_screen_inside_border() {
        assert_eq!(layout(LayoutKind::Tile, &[7], 1280, 720, 2), vec![(7, Geometry::new(2, 2, 1276, 716))]);
    }

    #[test]
    fn test_master_and_two_stack_rows() {
        let placed = layout(LayoutKind::Tile, &[1, 2, 3], 1280, 720, 2);
        assert_eq!(
            placed,
            vec![
                (1, Geometry::new(0, 0, 636, 716)),
                (2, Geometry::new(640, 0, 636, 356)),
                (3, Geometry::new(640, 360, 636, 356)),
            ]
        );
    }

    #[rstest]
    #[case(2, 1080)]
    #[case(4, 1080)]
    #[case(5, 1000)]
    #[case(8, 719)]
    fn test_stack_rows_cover_full_height(#[case] count: u32, #[case] height: u16) {
        let windows: Vec<Window> = (1..=count).collect();
        let border = 3;
        let placed = layout(LayoutKind::Tile, &windows, 1920, height, border);
        assert_eq!(placed.len(), windows.len());

        let stack = &placed[1..];
        let total: i32 = stack.iter().map(|(_, g)| i32::from(g.height) + 2 * i32::from(border)).sum();
        assert_eq!(total, i32::from(height));

        let (_, last) = stack[stack.len() - 1];
        assert_eq!(i32::from(last.y) + i32::from(last.height) + 2 * i32::from(border), i32::from(height));
        assert!(stack.windows(2).all(|pair| pair[0].1.y < pair[1].1.y));
    }

    #[test]
    fn test_last_stack_row_takes_remainder() {
        // 100 / 3 = 33 rows, the last one gets 34.
        let placed = layout(LayoutKind::Tile, &[1, 2, 3, 4], 200, 100, 0);
        let heights: Vec<u16> = placed[1..].iter().map(|(_, g)| g.height).collect();
        assert_eq!(heights, vec![33, 33, 34]);
    }

    #[test]
    fn test_monocle_stacks_everything_on_full_screen() {
        let placed = layout(LayoutKind::Monocle, &[1, 2, 3], 800, 600, 1);
        assert!(placed.iter().all(|(_, g)| *g == Geometry::new(0, 0, 798, 598)));
        assert_eq!(placed.iter().map(|(w, _)| *w).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_float_leaves_clients_alone() {
        assert!(layout(LayoutKind::Float, &[1, 2], 800, 600, 1).is_empty());
    }

    #[test]
    fn test_layout_is_deterministic() {
        let windows = [4, 8, 15, 16, 23, 42];
        assert_eq!(
            layout(LayoutKind::Tile, &windows, 1366, 768, 2),
            layout(LayoutKind::Tile, &windows, 1366, 768, 2)
        );
    }

    #[test]
    fn test_tiny_screen_never_yields_zero_sizes() {
        let placed = layout(LayoutKind::Tile, &[1, 2, 3], 4, 4, 5);
        assert!(placed.iter().all(|(_, g)| g.width >= 1 && g.height >= 1));
    }
}
