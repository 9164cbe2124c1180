//! A mock connection for driving the window manager in tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use strum::IntoEnumIterator;

use crate::bindings::{Keybind, Mousebind};
use crate::core::types::{ClientAttrs, ClientConfig, Geometry, Point};
use crate::x::atom::{Atom, Atoms};
use crate::x::core::{
    MapState, PointerQueryReply, Result, WindowAttributes, WindowClass, XAtom, XConn, XWindow,
    XWindowID,
};
use crate::x::cursor::CursorKind;
use crate::x::event::{ClientMessageEvent, ConfigureRequestData, XEvent};
use crate::x::input::{keysym::KeySym, KeyCode};
use crate::x::property::{Property, WindowState, WmHints, WmSizeHints};

const ROOT: XWindowID = 1;

/// The server-side state of a window known to the dummy connection.
#[derive(Debug, Clone)]
pub(crate) struct DummyWindow {
    pub geom: Geometry,
    pub border_width: u32,
    pub override_redirect: bool,
    pub map_state: MapState,
    pub props: HashMap<String, Property>,
}

impl Default for DummyWindow {
    fn default() -> Self {
        Self {
            geom: Geometry::default(),
            border_width: 0,
            override_redirect: false,
            map_state: MapState::Unmapped,
            props: HashMap::new(),
        }
    }
}

/// A connection implementing `XConn` without an X server behind it.
///
/// Events are replayed from an internal queue; `poll_next_event`
/// returning `None` ends a `run` loop, so a test can queue a scenario
/// and let the manager run it to completion. Every request issued by
/// the manager is recorded as a line in `requests`.
pub(crate) struct DummyConn {
    root: XWindow,
    outputs: RefCell<Vec<Geometry>>,
    events: RefCell<VecDeque<XEvent>>,
    windows: RefCell<HashMap<XWindowID, DummyWindow>>,
    atoms: RefCell<Atoms>,
    next_atom: Cell<XAtom>,
    next_window: Cell<XWindowID>,
    pointer: Cell<Point>,
    requests: RefCell<Vec<String>>,
}

impl DummyConn {
    /// Creates a dummy connection reporting the given outputs. The
    /// screen spans them all.
    pub fn new(outputs: Vec<Geometry>) -> Self {
        let width = outputs.iter().map(|g| g.x + g.width).max().unwrap_or(800);
        let height = outputs.iter().map(|g| g.y + g.height).max().unwrap_or(600);

        let mut atoms = Atoms::new();
        let mut next = 100;
        for atom in Atom::iter() {
            atoms.insert(atom.as_ref(), next);
            next += 1;
        }

        Self {
            root: XWindow::with_data(ROOT, Geometry::new(0, 0, height, width)),
            outputs: RefCell::new(outputs),
            events: RefCell::new(VecDeque::new()),
            windows: RefCell::new(HashMap::new()),
            atoms: RefCell::new(atoms),
            next_atom: Cell::new(next),
            next_window: Cell::new(1000),
            pointer: Cell::new(Point::new(0, 0)),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Registers a window on the "server" and returns its ID.
    pub fn add_window(&self, geom: Geometry) -> XWindowID {
        let id = self.next_window.get();
        self.next_window.set(id + 1);
        self.windows.borrow_mut().insert(
            id,
            DummyWindow {
                geom,
                ..DummyWindow::default()
            },
        );
        id
    }

    /// Mutates the server-side state of a window.
    pub fn with_window<F: FnOnce(&mut DummyWindow)>(&self, id: XWindowID, f: F) {
        if let Some(win) = self.windows.borrow_mut().get_mut(&id) {
            f(win);
        }
    }

    /// Sets WM_CLASS on a window.
    pub fn set_class(&self, id: XWindowID, instance: &str, class: &str) {
        self.with_window(id, |w| {
            w.props.insert(
                Atom::WmClass.as_ref().into(),
                Property::String(vec![instance.into(), class.into()]),
            );
        });
    }

    /// Sets WM_NORMAL_HINTS on a window.
    pub fn set_size_hints(&self, id: XWindowID, hints: WmSizeHints) {
        self.with_window(id, |w| {
            w.props.insert(
                Atom::WmNormalHints.as_ref().into(),
                Property::WMSizeHints(hints),
            );
        });
    }

    /// Queues an event for the manager to pick up.
    pub fn queue_event(&self, event: XEvent) {
        self.events.borrow_mut().push_back(event);
    }

    /// Replaces the set of reported outputs.
    pub fn set_outputs(&self, outputs: Vec<Geometry>) {
        *self.outputs.borrow_mut() = outputs;
    }

    pub fn set_pointer(&self, pt: Point) {
        self.pointer.set(pt);
    }

    /// Every request issued so far, oldest first.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.borrow_mut().clear();
    }

    fn record(&self, line: String) {
        self.requests.borrow_mut().push(line);
    }

    fn prop_of(&self, id: XWindowID, name: &str) -> Option<Property> {
        self.windows.borrow().get(&id)?.props.get(name).cloned()
    }

    fn atom_ids(&self, names: &[String]) -> Vec<XAtom> {
        names
            .iter()
            .filter_map(|n| self.atom(n).ok())
            .collect()
    }
}

impl XConn for DummyConn {
    fn poll_next_event(&self) -> Result<Option<XEvent>> {
        Ok(self.events.borrow_mut().pop_front())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    fn drop_pending_crossings(&self) {}

    fn get_root(&self) -> XWindow {
        self.root
    }

    fn screen_size(&self) -> (i32, i32) {
        (self.root.geom.width, self.root.geom.height)
    }

    fn get_geometry(&self, window: XWindowID) -> Result<Geometry> {
        self.windows
            .borrow()
            .get(&window)
            .map(|w| w.geom)
            .ok_or(crate::x::core::XError::RequestError("no such window"))
    }

    fn get_window_attributes(&self, window: XWindowID) -> Result<WindowAttributes> {
        self.windows
            .borrow()
            .get(&window)
            .map(|w| WindowAttributes {
                border_width: w.border_width,
                override_redirect: w.override_redirect,
                map_state: w.map_state,
            })
            .ok_or(crate::x::core::XError::RequestError("no such window"))
    }

    fn query_tree(&self, _window: XWindowID) -> Result<Vec<XWindowID>> {
        let mut ids: Vec<XWindowID> = self.windows.borrow().keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn query_pointer(&self, _window: XWindowID) -> Result<PointerQueryReply> {
        let pt = self.pointer.get();
        Ok(PointerQueryReply {
            root: ROOT,
            child: None,
            root_x: pt.x,
            root_y: pt.y,
        })
    }

    fn all_outputs(&self) -> Result<Vec<Geometry>> {
        Ok(self.outputs.borrow().clone())
    }

    fn atom(&self, name: &str) -> Result<XAtom> {
        if let Some(known) = self.atoms.borrow().retrieve(name) {
            return Ok(known);
        }
        let id = self.next_atom.get();
        self.next_atom.set(id + 1);
        self.atoms.borrow_mut().insert(name, id);
        Ok(id)
    }

    fn lookup_atom(&self, atom: XAtom) -> Result<String> {
        self.atoms
            .borrow()
            .retrieve_by_id(atom)
            .map(|s| s.to_string())
            .ok_or(crate::x::core::XError::RequestError("unknown atom"))
    }

    fn lookup_interned_atom(&self, name: &str) -> Option<XAtom> {
        self.atoms.borrow().retrieve(name)
    }

    fn grab_key(&self, kb: Keybind, window: XWindowID) -> Result<()> {
        self.record(format!("grab_key {:?} on {}", kb, window));
        Ok(())
    }

    fn ungrab_keys(&self, window: XWindowID) -> Result<()> {
        self.record(format!("ungrab_keys {}", window));
        Ok(())
    }

    fn grab_button(&self, mb: Mousebind, window: XWindowID, _confine: bool) -> Result<()> {
        self.record(format!("grab_button {:?} on {}", mb, window));
        Ok(())
    }

    fn grab_all_buttons(&self, window: XWindowID) -> Result<()> {
        self.record(format!("grab_all_buttons {}", window));
        Ok(())
    }

    fn ungrab_buttons(&self, window: XWindowID) -> Result<()> {
        self.record(format!("ungrab_buttons {}", window));
        Ok(())
    }

    fn grab_pointer(&self, window: XWindowID, cursor: CursorKind) -> Result<()> {
        self.record(format!("grab_pointer {} {:?}", window, cursor));
        Ok(())
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.record("ungrab_pointer".into());
        Ok(())
    }

    fn grab_server(&self) -> Result<()> {
        self.record("grab_server".into());
        Ok(())
    }

    fn ungrab_server(&self) -> Result<()> {
        self.record("ungrab_server".into());
        Ok(())
    }

    fn create_window(
        &self,
        _class: WindowClass,
        geom: Geometry,
        managed: bool,
    ) -> Result<XWindowID> {
        let id = self.add_window(geom);
        self.with_window(id, |w| w.override_redirect = !managed);
        self.record(format!("create_window {}", id));
        Ok(id)
    }

    fn destroy_window(&self, window: XWindowID) -> Result<()> {
        self.record(format!("destroy_window {}", window));
        self.windows.borrow_mut().remove(&window);
        Ok(())
    }

    fn map_window(&self, window: XWindowID) -> Result<()> {
        self.record(format!("map_window {}", window));
        self.with_window(window, |w| w.map_state = MapState::Viewable);
        Ok(())
    }

    fn unmap_window(&self, window: XWindowID) -> Result<()> {
        self.record(format!("unmap_window {}", window));
        self.with_window(window, |w| w.map_state = MapState::Unmapped);
        Ok(())
    }

    fn configure_window(&self, window: XWindowID, attrs: &[ClientConfig]) -> Result<()> {
        self.record(format!("configure_window {} {:?}", window, attrs));
        self.with_window(window, |w| {
            for attr in attrs {
                match attr {
                    ClientConfig::BorderWidth(bw) => w.border_width = *bw,
                    ClientConfig::Move { x, y } => {
                        w.geom.x = *x;
                        w.geom.y = *y;
                    }
                    ClientConfig::Resize { h, w: width } => {
                        w.geom.height = *h;
                        w.geom.width = *width;
                    }
                    ClientConfig::StackingMode(_) => {}
                }
            }
        });
        Ok(())
    }

    fn change_window_attributes(&self, window: XWindowID, attrs: &[ClientAttrs]) -> Result<()> {
        self.record(format!("change_window_attributes {} {:?}", window, attrs));
        Ok(())
    }

    fn set_input_focus(&self, window: XWindowID) -> Result<()> {
        self.record(format!("set_input_focus {}", window));
        Ok(())
    }

    fn send_client_message(&self, window: XWindowID, msg: ClientMessageEvent) -> Result<()> {
        self.record(format!("send_client_message {} type {}", window, msg.type_));
        Ok(())
    }

    fn send_configure_notify(
        &self,
        window: XWindowID,
        geom: Geometry,
        border_width: u32,
    ) -> Result<()> {
        self.record(format!(
            "send_configure_notify {} {:?} bw {}",
            window, geom, border_width
        ));
        Ok(())
    }

    fn forward_configure_request(&self, data: &ConfigureRequestData) -> Result<()> {
        self.record(format!("forward_configure_request {}", data.id));
        Ok(())
    }

    fn warp_pointer(&self, window: Option<XWindowID>, x: i32, y: i32) -> Result<()> {
        self.record(format!("warp_pointer {:?} {} {}", window, x, y));
        if window.is_none() {
            self.pointer.set(Point::new(x, y));
        }
        Ok(())
    }

    fn kill_client(&self, window: XWindowID) -> Result<()> {
        self.record(format!("kill_client {}", window));
        Ok(())
    }

    fn get_property(&self, prop: &str, window: XWindowID) -> Result<Option<Property>> {
        Ok(self.prop_of(window, prop))
    }

    fn set_property(&self, window: XWindowID, prop: &str, data: Property) -> Result<()> {
        self.record(format!("set_property {} {} {:?}", window, prop, data));
        self.with_window(window, |w| {
            w.props.insert(prop.into(), data);
        });
        Ok(())
    }

    fn append_property(&self, window: XWindowID, prop: &str, data: Property) -> Result<()> {
        self.record(format!("append_property {} {} {:?}", window, prop, data));
        self.with_window(window, |w| match (w.props.get_mut(prop), data) {
            (Some(Property::Window(have)), Property::Window(more)) => have.extend(more),
            (_, data) => {
                w.props.insert(prop.into(), data);
            }
        });
        Ok(())
    }

    fn delete_property(&self, window: XWindowID, prop: &str) -> Result<()> {
        self.record(format!("delete_property {} {}", window, prop));
        self.with_window(window, |w| {
            w.props.remove(prop);
        });
        Ok(())
    }

    fn get_wm_name(&self, window: XWindowID) -> String {
        self.prop_of(window, Atom::NetWmName.as_ref())
            .or_else(|| self.prop_of(window, Atom::WmName.as_ref()))
            .and_then(|p| p.into_single_string())
            .unwrap_or_default()
    }

    fn get_wm_class(&self, window: XWindowID) -> (String, String) {
        match self.prop_of(window, Atom::WmClass.as_ref()) {
            Some(Property::String(ss)) if ss.len() >= 2 => (ss[0].clone(), ss[1].clone()),
            _ => (String::new(), String::new()),
        }
    }

    fn get_wm_size_hints(&self, window: XWindowID) -> Option<WmSizeHints> {
        match self.prop_of(window, Atom::WmNormalHints.as_ref()) {
            Some(Property::WMSizeHints(hints)) => Some(hints),
            _ => None,
        }
    }

    fn get_wm_hints(&self, window: XWindowID) -> Option<WmHints> {
        match self.prop_of(window, Atom::WmHints.as_ref()) {
            Some(Property::WMHints(hints)) => Some(hints),
            _ => None,
        }
    }

    fn get_wm_protocols(&self, window: XWindowID) -> Option<Vec<XAtom>> {
        match self.prop_of(window, Atom::WmProtocols.as_ref()) {
            Some(Property::Atom(names)) => Some(self.atom_ids(&names)),
            _ => None,
        }
    }

    fn get_wm_state(&self, window: XWindowID) -> Option<WindowState> {
        match self.prop_of(window, Atom::WmState.as_ref()) {
            Some(Property::U32List(_, vals)) => match vals.first()? {
                0 => Some(WindowState::Withdrawn),
                1 => Some(WindowState::Normal),
                3 => Some(WindowState::Iconic),
                _ => None,
            },
            _ => None,
        }
    }

    fn get_wm_transient_for(&self, window: XWindowID) -> Option<XWindowID> {
        match self.prop_of(window, Atom::WmTransientFor.as_ref()) {
            Some(Property::Window(ids)) => ids.first().copied().filter(|&id| id != 0),
            _ => None,
        }
    }

    fn set_wm_state(&self, window: XWindowID, state: WindowState) {
        self.record(format!("set_wm_state {} {:?}", window, state));
        self.with_window(window, |w| {
            w.props.insert(
                Atom::WmState.as_ref().into(),
                Property::U32List(Atom::WmState.as_ref().into(), vec![state as u32, 0]),
            );
        });
    }

    fn clear_urgency(&self, window: XWindowID) {
        self.record(format!("clear_urgency {}", window));
        self.with_window(window, |w| {
            if let Some(Property::WMHints(hints)) = w.props.get_mut(Atom::WmHints.as_ref()) {
                hints.urgent = false;
            }
        });
    }

    fn get_window_type(&self, window: XWindowID) -> Option<Vec<XAtom>> {
        match self.prop_of(window, Atom::NetWmWindowType.as_ref()) {
            Some(Property::Atom(names)) => Some(self.atom_ids(&names)),
            _ => None,
        }
    }

    fn get_window_states(&self, window: XWindowID) -> Option<Vec<XAtom>> {
        match self.prop_of(window, Atom::NetWmState.as_ref()) {
            Some(Property::Atom(names)) => Some(self.atom_ids(&names)),
            _ => None,
        }
    }

    fn lookup_keysym(&self, code: KeyCode) -> KeySym {
        code as KeySym
    }

    fn refresh_keymap(&self) -> Result<()> {
        self.record("refresh_keymap".into());
        Ok(())
    }

    fn create_pointer_barriers(&self, rects: &[Geometry]) -> Result<()> {
        self.record(format!("create_pointer_barriers {}", rects.len()));
        Ok(())
    }

    fn destroy_pointer_barriers(&self) -> Result<()> {
        self.record("destroy_pointer_barriers".into());
        Ok(())
    }
}
