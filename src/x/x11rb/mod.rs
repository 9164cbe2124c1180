//! An [`XConn`](crate::x::core::XConn) implementation backed by the
//! x11rb library.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::marker::PhantomData;

use x11rb::connection::Connection;
use x11rb::protocol::{
    xfixes::ConnectionExt as _,
    xproto::{self, ConnectionExt as _},
    Event,
};
use x11rb::rust_connection::RustConnection;

use tracing::{debug, trace, warn};

use strum::IntoEnumIterator;

use super::atom::{Atom, Atoms};
use super::core::{Result, XError, XWindow, XWindowID};
use super::cursor::CursorKind;
use super::input::keysym::KeySym;
use super::{Initialized, Uninitialized};
use crate::core::types::Geometry;
use crate::x::status::ConnStatus;

mod convert;
mod xconn;

pub(crate) const MAX_LONG_LENGTH: u32 = 1024;

// x11rb error plumbing: everything funnels into XError, with protocol
// errors keeping their kind and opcode so the benign-error whitelist
// can inspect them.

use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::ErrorKind;
use x11rb::x11_utils::X11Error;

use super::core::{ServerError, ServerErrorKind};

impl From<X11Error> for XError {
    fn from(e: X11Error) -> XError {
        let kind = match e.error_kind {
            ErrorKind::Access => ServerErrorKind::Access,
            ErrorKind::Drawable => ServerErrorKind::Drawable,
            ErrorKind::Match => ServerErrorKind::Match,
            ErrorKind::Window => ServerErrorKind::Window,
            _ => ServerErrorKind::Other(e.error_code),
        };
        XError::ServerError(ServerError {
            kind,
            major_opcode: e.major_opcode,
        })
    }
}

impl From<ConnectError> for XError {
    fn from(e: ConnectError) -> XError {
        XError::Connection(e.to_string())
    }
}

impl From<ConnectionError> for XError {
    fn from(e: ConnectionError) -> XError {
        XError::Connection(e.to_string())
    }
}

impl From<ReplyError> for XError {
    fn from(e: ReplyError) -> XError {
        match e {
            ReplyError::ConnectionError(c) => c.into(),
            ReplyError::X11Error(x) => x.into(),
        }
    }
}

impl From<ReplyOrIdError> for XError {
    fn from(e: ReplyOrIdError) -> XError {
        match e {
            ReplyOrIdError::ConnectionError(c) => c.into(),
            ReplyOrIdError::X11Error(x) => x.into(),
            ReplyOrIdError::IdsExhausted => XError::OtherError("XID space exhausted".into()),
        }
    }
}

const XFIXES_MAJ: u32 = 5;
const XFIXES_MIN: u32 = 0;

/// The keyboard mapping, cached so keycodes resolve to keysyms without
/// a server round trip on every key press.
#[derive(Debug, Clone, Default)]
pub(crate) struct Keymap {
    min_keycode: u8,
    keysyms_per_keycode: u8,
    keysyms: Vec<KeySym>,
}

impl Keymap {
    /// The keysym in the first column for the given keycode.
    fn keysym(&self, keycode: u8) -> KeySym {
        if keycode < self.min_keycode {
            return 0;
        }
        let idx = (keycode - self.min_keycode) as usize * self.keysyms_per_keycode as usize;
        self.keysyms.get(idx).copied().unwrap_or(0)
    }

    /// Every keycode whose first column carries the given keysym.
    fn keycodes_for(&self, keysym: KeySym) -> Vec<u8> {
        let per = self.keysyms_per_keycode.max(1) as usize;
        self.keysyms
            .chunks(per)
            .enumerate()
            .filter(|(_, syms)| syms.first() == Some(&keysym))
            .map(|(i, _)| self.min_keycode + i as u8)
            .collect()
    }
}

/// A connection to an X server, backed by the x11rb library.
///
/// This is a completely synchronous connection, and implements
/// [`XConn`][1] when initialized, so it can drive a
/// [`WindowManager`][2].
///
/// # Usage
///
/// ```no_run
/// use tatamiwm::x::X11RBConn;
///
/// let conn = X11RBConn::connect().expect("connection error");
/// let conn = conn.init().expect("could not initialize");
/// ```
///
/// [1]: crate::x::core::XConn
/// [2]: crate::manager::WindowManager
pub struct X11RBConn<S: ConnStatus = Initialized> {
    conn: RustConnection,
    root: XWindow,
    idx: usize,
    atoms: RefCell<Atoms>,
    keymap: RefCell<Keymap>,
    cursors: RefCell<Vec<(CursorKind, u32)>>,
    barriers: RefCell<Vec<u32>>,
    /// Events pulled off the wire while selectively draining crossings.
    pending: RefCell<VecDeque<Event>>,
    xfixes: bool,
    _marker: PhantomData<S>,
}

impl X11RBConn<Uninitialized> {
    /// Connects to the X server on the default display.
    pub fn connect() -> Result<X11RBConn<Uninitialized>> {
        let (conn, idx) = x11rb::connect(None)?;
        trace!("connected to X server, preferred screen {}", idx);

        Ok(X11RBConn {
            conn,
            root: XWindow::zeroed(),
            idx,
            atoms: RefCell::new(Atoms::new()),
            keymap: RefCell::new(Keymap::default()),
            cursors: RefCell::new(Vec::new()),
            barriers: RefCell::new(Vec::new()),
            pending: RefCell::new(VecDeque::new()),
            xfixes: false,
            _marker: PhantomData,
        })
    }

    /// Initializes the connection:
    ///
    /// - resolves the root window and its dimensions,
    /// - interns all [known atoms](crate::x::atom::Atom),
    /// - loads the keyboard mapping,
    /// - creates the cursors and installs the normal one on the root,
    /// - negotiates the XFixes extension (optional; pointer barriers
    ///   are disabled without it).
    pub fn init(mut self) -> Result<X11RBConn<Initialized>> {
        let root = {
            let screen = self
                .conn
                .setup()
                .roots
                .get(self.idx)
                .ok_or(XError::NoScreens)?;
            let id = screen.root;
            let geom = Geometry::new(
                0,
                0,
                screen.height_in_pixels as i32,
                screen.width_in_pixels as i32,
            );
            XWindow::with_data(id, geom)
        };
        trace!("got root: {:?}", root);

        // intern all known atoms: send every request first, then
        // collect the replies
        let mut cookies = Vec::new();
        for atom in Atom::iter() {
            cookies.push((
                atom.to_string(),
                self.conn.intern_atom(false, atom.as_ref().as_bytes())?,
            ));
        }
        {
            let atoms = self.atoms.get_mut();
            for (name, cookie) in cookies {
                atoms.insert(&name, cookie.reply()?.atom);
            }
        }

        self.load_keymap()?;

        for kind in [CursorKind::Normal, CursorKind::Move, CursorKind::Resize] {
            let cursor = self.create_cursor_inner(kind.glyph())?;
            self.cursors.get_mut().push((kind, cursor));
        }
        if let Some(&(_, normal)) = self.cursors.get_mut().first() {
            self.conn
                .change_window_attributes(
                    root.id,
                    &xproto::ChangeWindowAttributesAux::new().cursor(normal),
                )?
                .check()?;
        }

        let xfixes = match self.conn.xfixes_query_version(XFIXES_MAJ, XFIXES_MIN) {
            Ok(cookie) => cookie.reply().is_ok(),
            Err(_) => false,
        };
        if !xfixes {
            debug!("XFixes unavailable, pointer barriers disabled");
        }

        Ok(X11RBConn {
            conn: self.conn,
            root,
            idx: self.idx,
            atoms: self.atoms,
            keymap: self.keymap,
            cursors: self.cursors,
            barriers: self.barriers,
            pending: self.pending,
            xfixes,
            _marker: PhantomData,
        })
    }
}

impl<S: ConnStatus> X11RBConn<S> {
    pub(crate) fn load_keymap(&self) -> Result<()> {
        let setup = self.conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);

        let reply = self
            .conn
            .get_keyboard_mapping(min, max - min + 1)?
            .reply()?;

        *self.keymap.borrow_mut() = Keymap {
            min_keycode: min,
            keysyms_per_keycode: reply.keysyms_per_keycode,
            keysyms: reply.keysyms,
        };
        Ok(())
    }

    pub(crate) fn create_cursor_inner(&self, glyph: u16) -> Result<u32> {
        trace!("creating cursor for glyph {}", glyph);

        let fid = self.conn.generate_id()?;
        self.conn.open_font(fid, b"cursor")?.check()?;

        let cid = self.conn.generate_id()?;
        self.conn
            .create_glyph_cursor(cid, fid, fid, glyph, glyph + 1, 0, 0, 0, 0xffff, 0xffff, 0xffff)?
            .check()?;
        self.conn.close_font(fid)?.check()?;

        Ok(cid)
    }
}

impl X11RBConn<Initialized> {
    pub(crate) fn lookup_keysym_inner(&self, keycode: u8) -> KeySym {
        self.keymap.borrow().keysym(keycode)
    }

    pub(crate) fn keycodes_for(&self, keysym: KeySym) -> Vec<u8> {
        self.keymap.borrow().keycodes_for(keysym)
    }

    pub(crate) fn cursor(&self, kind: CursorKind) -> u32 {
        self.cursors
            .borrow()
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|&(_, c)| c)
            .unwrap_or(0)
    }

    /// Interns an atom by name, hitting the cache first.
    pub(crate) fn atom_inner(&self, name: &str) -> Result<u32> {
        if let Some(known) = self.atoms.borrow().retrieve(name) {
            return Ok(known);
        }
        trace!("interning atom {}", name);
        let id = self.conn.intern_atom(false, name.as_bytes())?.reply()?.atom;
        self.atoms.borrow_mut().insert(name, id);
        Ok(id)
    }

    /// Resolves an atom ID to its name, caching the result.
    pub(crate) fn atom_name_inner(&self, atom: u32) -> Result<String> {
        if let Some(name) = self.atoms.borrow().retrieve_by_id(atom) {
            return Ok(name.to_string());
        }
        let reply = self.conn.get_atom_name(atom)?.reply()?;
        let name = String::from_utf8(reply.name)?;
        self.atoms.borrow_mut().insert(&name, atom);
        Ok(name)
    }

    pub(crate) fn get_geometry_inner(&self, window: XWindowID) -> Result<Geometry> {
        Ok(self.conn.get_geometry(window)?.reply().map(|ok| Geometry {
            x: ok.x as i32,
            y: ok.y as i32,
            height: ok.height as i32,
            width: ok.width as i32,
        })?)
    }

    /// Pulls the next event, draining the pending queue first.
    pub(crate) fn next_raw_event(&self) -> Result<Event> {
        if let Some(queued) = self.pending.borrow_mut().pop_front() {
            return Ok(queued);
        }
        self.conn.flush()?;
        Ok(self.conn.wait_for_event()?)
    }

    /// Discards queued crossing events, keeping everything else for the
    /// next poll.
    pub(crate) fn drain_crossings(&self) {
        loop {
            match self.conn.poll_for_event() {
                Ok(Some(Event::EnterNotify(_))) | Ok(Some(Event::LeaveNotify(_))) => continue,
                Ok(Some(other)) => self.pending.borrow_mut().push_back(other),
                Ok(None) => break,
                Err(e) => {
                    warn!("connection error while draining events: {}", e);
                    break;
                }
            }
        }
    }

    pub(crate) fn has_xfixes(&self) -> bool {
        self.xfixes
    }
}
