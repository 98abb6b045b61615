use anyhow::{anyhow, Result};
use tracing::instrument;
use xcb::{
    x::{self, Atom, GetProperty, InternAtom, Window, ATOM_ANY},
    Connection,
};

use crate::tracker::focus::FocusProvider;

use super::process_tree::ProcessResolver;

fn intern_atom(conn: &Connection, name: &[u8]) -> Result<Atom> {
    let reply = conn.wait_for_reply(conn.send_request(&InternAtom {
        only_if_exists: false,
        name,
    }))?;
    Ok(reply.atom())
}

fn get_active_window(conn: &Connection, root: Window, active_window_atom: Atom) -> Result<Window> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window: root,
        property: active_window_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    result
        .value::<Window>()
        .first()
        .copied()
        .ok_or_else(|| anyhow!("Window manager reported no active window"))
}

fn get_pid(conn: &Connection, window: Window, pid_atom: Atom) -> Result<u32> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window,
        property: pid_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    result
        .value::<u32>()
        .first()
        .copied()
        .ok_or_else(|| anyhow!("Active window has no _NET_WM_PID"))
}

/// Reads `_NET_ACTIVE_WINDOW` and its `_NET_WM_PID` straight from the X server.
pub struct X11FocusProvider {
    connection: Connection,
    root: Window,
    active_window_atom: Atom,
    pid_atom: Atom,
    resolver: ProcessResolver,
}

impl X11FocusProvider {
    pub fn new() -> Result<Self> {
        let (connection, preferred_screen) = xcb::Connection::connect(None)?;
        let root = connection
            .get_setup()
            .roots()
            .nth(preferred_screen.max(0) as usize)
            .map(|screen| screen.root())
            .ok_or_else(|| anyhow!("X server has no screen {preferred_screen}"))?;
        let active_window_atom = intern_atom(&connection, b"_NET_ACTIVE_WINDOW")?;
        let pid_atom = intern_atom(&connection, b"_NET_WM_PID")?;
        Ok(Self {
            connection,
            root,
            active_window_atom,
            pid_atom,
            resolver: ProcessResolver::new(),
        })
    }
}

impl FocusProvider for X11FocusProvider {
    #[instrument(skip(self))]
    fn current_foreground_app(&mut self) -> Result<String> {
        let _ = self.connection.send_request(&x::GrabServer {});
        let pid = get_active_window(&self.connection, self.root, self.active_window_atom)
            .and_then(|window| get_pid(&self.connection, window, self.pid_atom));
        let _ = self.connection.send_request(&x::UngrabServer {});
        self.resolver.resolve(pid?)
    }
}
