use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt, CreateWindowAux, PropMode, Window, WindowClass};
use x11rb::wrapper::ConnectionExt as _;

use crate::core::context::X11Context;
use crate::window::error::log_and_ignore;

pub const WM_NAME: &str = "tilewm";

/// Hints the manager keeps up to date on the root window or on clients.
fn supported_atoms(ctx: &X11Context) -> [u32; 10] {
    let atoms = &ctx.atoms;
    [
        atoms._NET_SUPPORTED,
        atoms._NET_SUPPORTING_WM_CHECK,
        atoms._NET_CLIENT_LIST,
        atoms._NET_NUMBER_OF_DESKTOPS,
        atoms._NET_CURRENT_DESKTOP,
        atoms._NET_ACTIVE_WINDOW,
        atoms._NET_WM_NAME,
        atoms._NET_WM_STATE,
        atoms._NET_WM_STATE_FULLSCREEN,
        atoms._NET_WM_WINDOW_TYPE,
    ]
}

/// Announces the manager to pagers and panels and publishes the desktop
/// count. Returns the supporting-WM check window, destroyed on shutdown.
pub fn setup_hints(ctx: &X11Context, desktops: u32) -> Result<Window> {
    let conn = &ctx.conn;
    let root = ctx.root_window;

    // The check window is never mapped; it only carries properties.
    let check_win = conn.generate_id()?;
    conn.create_window(
        x11rb::COPY_DEPTH_FROM_PARENT,
        check_win,
        root,
        -1,
        -1,
        1,
        1,
        0,
        WindowClass::INPUT_OUTPUT,
        0,
        &CreateWindowAux::new(),
    )?;
    conn.change_property8(PropMode::REPLACE, check_win, ctx.atoms._NET_WM_NAME, ctx.atoms.UTF8_STRING, WM_NAME.as_bytes())?;

    for window in [check_win, root] {
        conn.change_property32(PropMode::REPLACE, window, ctx.atoms._NET_SUPPORTING_WM_CHECK, AtomEnum::WINDOW, &[check_win])?;
    }

    let cardinals = [(ctx.atoms._NET_NUMBER_OF_DESKTOPS, desktops), (ctx.atoms._NET_CURRENT_DESKTOP, 0)];
    for (property, value) in cardinals {
        conn.change_property32(PropMode::REPLACE, root, property, AtomEnum::CARDINAL, &[value])?;
    }
    conn.change_property32(PropMode::REPLACE, root, ctx.atoms._NET_SUPPORTED, AtomEnum::ATOM, &supported_atoms(ctx))?;
    conn.change_property32(PropMode::REPLACE, root, ctx.atoms._NET_CLIENT_LIST, AtomEnum::WINDOW, &[])?;

    Ok(check_win)
}

/// Withdraws what `setup_hints` published so the next manager starts clean.
pub fn teardown_hints(ctx: &X11Context, check_win: Window) -> Result<()> {
    let root = ctx.root_window;
    for property in [ctx.atoms._NET_SUPPORTING_WM_CHECK, ctx.atoms._NET_SUPPORTED, ctx.atoms._NET_ACTIVE_WINDOW] {
        log_and_ignore(ctx.conn.delete_property(root, property), "delete root hint");
    }
    ctx.conn.destroy_window(check_win)?;
    ctx.conn.flush()?;
    Ok(())
}
