//! Implementation of the XConn trait for X11RBConn.

use x11rb::connection::Connection;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xfixes::ConnectionExt as _;
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::wrapper::ConnectionExt as _;

use tracing::trace;

use super::{X11RBConn, MAX_LONG_LENGTH};
use crate::bindings::{ButtonIndex, Keybind, Mousebind};
use crate::core::types::{ClientAttrs, ClientConfig, Geometry, StackMode};
use crate::x::core::{
    MapState, PointerQueryReply, Result, StackModeRaw, WindowAttributes, WindowClass, XAtom,
    XConn, XError, XWindow, XWindowID,
};
use crate::x::cursor::CursorKind;
use crate::x::event::{ClientMessageData, ClientMessageEvent, ConfigureRequestData, XEvent};
use crate::x::input::{keysym::KeySym, KeyCode, GRAB_MODIFIERS};
use crate::x::property::{Property, WindowState, WmHints, WmSizeHints};
use crate::x::{Atom, Initialized};

// WM_HINTS flag bits (ICCCM 4.1.2.4)
const HINT_INPUT: u32 = 1 << 0;
const HINT_STATE: u32 = 1 << 1;
const HINT_URGENCY: u32 = 1 << 8;

// WM_NORMAL_HINTS flag bits (ICCCM 4.1.2.3)
const P_POSITION: u32 = (1 << 0) | (1 << 2);
const P_SIZE: u32 = (1 << 1) | (1 << 3);
const P_MIN_SIZE: u32 = 1 << 4;
const P_MAX_SIZE: u32 = 1 << 5;
const P_RESIZE_INC: u32 = 1 << 6;
const P_ASPECT: u32 = 1 << 7;
const P_BASE_SIZE: u32 = 1 << 8;

fn button_grab_mask() -> xproto::EventMask {
    xproto::EventMask::BUTTON_PRESS | xproto::EventMask::BUTTON_RELEASE
}

fn pointer_grab_mask() -> xproto::EventMask {
    button_grab_mask() | xproto::EventMask::POINTER_MOTION
}

fn xbutton(button: ButtonIndex) -> xproto::ButtonIndex {
    match button {
        ButtonIndex::Left => xproto::ButtonIndex::M1,
        ButtonIndex::Middle => xproto::ButtonIndex::M2,
        ButtonIndex::Right => xproto::ButtonIndex::M3,
        ButtonIndex::Button4 => xproto::ButtonIndex::M4,
        ButtonIndex::Button5 => xproto::ButtonIndex::M5,
    }
}

fn hints_from_raw(raw: &[u32]) -> Option<WmHints> {
    if raw.len() < 9 {
        return None;
    }
    let flags = raw[0];
    Some(WmHints {
        initial_state: if flags & HINT_STATE != 0 && raw[2] == WindowState::Iconic as u32 {
            WindowState::Iconic
        } else {
            WindowState::Normal
        },
        urgent: flags & HINT_URGENCY != 0,
        input: (flags & HINT_INPUT != 0).then(|| raw[1] != 0),
    })
}

fn size_hints_from_raw(raw: &[u32]) -> Option<WmSizeHints> {
    if raw.len() < 18 {
        return None;
    }
    let flags = raw[0];
    let pair = |a: usize, b: usize| (raw[a] as i32, raw[b] as i32);

    Some(WmSizeHints {
        position: (flags & P_POSITION != 0).then(|| pair(1, 2)),
        size: (flags & P_SIZE != 0).then(|| pair(3, 4)),
        min_size: (flags & P_MIN_SIZE != 0).then(|| pair(5, 6)),
        max_size: (flags & P_MAX_SIZE != 0).then(|| pair(7, 8)),
        resize_inc: (flags & P_RESIZE_INC != 0).then(|| pair(9, 10)),
        min_aspect: (flags & P_ASPECT != 0).then(|| pair(11, 12)),
        max_aspect: (flags & P_ASPECT != 0).then(|| pair(13, 14)),
        base_size: (flags & P_BASE_SIZE != 0).then(|| pair(15, 16)),
    })
}

fn null_terminated_strings(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|&b| b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

impl X11RBConn<Initialized> {
    fn value32_of(reply: &xproto::GetPropertyReply) -> Result<Vec<u32>> {
        reply
            .value32()
            .map(|it| it.collect())
            .ok_or_else(|| XError::InvalidPropertyData("expected format 32".into()))
    }

    fn get_property_by_atom(&self, atom: XAtom, window: XWindowID) -> Result<Option<Property>> {
        let reply = self
            .conn
            .get_property(false, window, atom, xproto::AtomEnum::ANY, 0, MAX_LONG_LENGTH)?
            .reply()?;

        if reply.type_ == x11rb::NONE {
            return Ok(None);
        }
        let type_name = self.atom_name_inner(reply.type_)?;

        let prop = match type_name.as_str() {
            "ATOM" => Property::Atom(
                Self::value32_of(&reply)?
                    .into_iter()
                    .filter_map(|a| self.atom_name_inner(a).ok())
                    .collect(),
            ),
            "CARDINAL" => {
                Property::Cardinal(Self::value32_of(&reply)?.first().copied().unwrap_or(0))
            }
            "STRING" | "COMPOUND_TEXT" => Property::String(null_terminated_strings(&reply.value)),
            "UTF8_STRING" => Property::UTF8String(null_terminated_strings(&reply.value)),
            "WINDOW" => Property::Window(Self::value32_of(&reply)?),
            "WM_HINTS" => match hints_from_raw(&Self::value32_of(&reply)?) {
                Some(hints) => Property::WMHints(hints),
                None => {
                    return Err(XError::InvalidPropertyData("truncated WM_HINTS".into()));
                }
            },
            "WM_SIZE_HINTS" => match size_hints_from_raw(&Self::value32_of(&reply)?) {
                Some(hints) => Property::WMSizeHints(hints),
                None => {
                    return Err(XError::InvalidPropertyData(
                        "truncated WM_SIZE_HINTS".into(),
                    ));
                }
            },
            _ => match reply.format {
                8 => Property::U8List(type_name, reply.value),
                16 => Property::U16List(
                    type_name,
                    reply
                        .value16()
                        .map(|it| it.collect())
                        .ok_or_else(|| XError::InvalidPropertyData("expected format 16".into()))?,
                ),
                _ => Property::U32List(type_name, Self::value32_of(&reply)?),
            },
        };
        Ok(Some(prop))
    }

    fn atoms_of(&self, prop: &str, window: XWindowID) -> Option<Vec<XAtom>> {
        match self.get_property_by_atom(self.atom_inner(prop).ok()?, window) {
            Ok(Some(Property::Atom(names))) => Some(
                names
                    .iter()
                    .filter_map(|n| self.atom_inner(n).ok())
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl XConn for X11RBConn<Initialized> {
    //* Event source

    fn poll_next_event(&self) -> Result<Option<XEvent>> {
        let event = self.next_raw_event()?;
        Ok(Some(self.process_raw_event(event)))
    }

    fn sync(&self) -> Result<()> {
        // a GetInputFocus round trip forces the server to process
        // everything issued before it
        self.conn.flush()?;
        self.conn.get_input_focus()?.reply()?;
        Ok(())
    }

    fn drop_pending_crossings(&self) {
        self.drain_crossings();
    }

    //* General queries

    fn get_root(&self) -> XWindow {
        self.root
    }

    fn screen_size(&self) -> (i32, i32) {
        (self.root.geom.width, self.root.geom.height)
    }

    fn get_geometry(&self, window: XWindowID) -> Result<Geometry> {
        self.get_geometry_inner(window)
    }

    fn get_window_attributes(&self, window: XWindowID) -> Result<WindowAttributes> {
        let attrs = self.conn.get_window_attributes(window)?.reply()?;
        let geom = self.conn.get_geometry(window)?.reply()?;

        Ok(WindowAttributes {
            border_width: geom.border_width as u32,
            override_redirect: attrs.override_redirect,
            map_state: match attrs.map_state {
                xproto::MapState::UNMAPPED => MapState::Unmapped,
                xproto::MapState::UNVIEWABLE => MapState::Unviewable,
                _ => MapState::Viewable,
            },
        })
    }

    fn query_tree(&self, window: XWindowID) -> Result<Vec<XWindowID>> {
        trace!("querying tree under {}", window);
        Ok(self.conn.query_tree(window)?.reply()?.children)
    }

    fn query_pointer(&self, window: XWindowID) -> Result<PointerQueryReply> {
        let reply = self.conn.query_pointer(window)?.reply()?;

        Ok(PointerQueryReply {
            root: reply.root,
            child: (reply.child != x11rb::NONE).then_some(reply.child),
            root_x: reply.root_x as i32,
            root_y: reply.root_y as i32,
        })
    }

    fn all_outputs(&self) -> Result<Vec<Geometry>> {
        let res = self
            .conn
            .randr_get_screen_resources(self.root.id)?
            .reply()
            .map_err(|e| XError::Randr(e.to_string()))?;

        let mut outputs = Vec::new();
        for crtc in res.crtcs {
            let Ok(cookie) = self.conn.randr_get_crtc_info(crtc, 0) else {
                continue;
            };
            let Ok(info) = cookie.reply() else {
                continue;
            };
            if info.width > 0 {
                outputs.push(Geometry::new(
                    info.x as i32,
                    info.y as i32,
                    info.height as i32,
                    info.width as i32,
                ));
            }
        }
        Ok(outputs)
    }

    //* Atoms

    fn atom(&self, name: &str) -> Result<XAtom> {
        self.atom_inner(name)
    }

    fn lookup_atom(&self, atom: XAtom) -> Result<String> {
        self.atom_name_inner(atom)
    }

    fn lookup_interned_atom(&self, name: &str) -> Option<XAtom> {
        self.atoms.borrow().retrieve(name)
    }

    //* Input grabs

    fn grab_key(&self, kb: Keybind, window: XWindowID) -> Result<()> {
        for code in self.keycodes_for(kb.keysym) {
            for extra in GRAB_MODIFIERS {
                let mods = kb.modmask | extra;
                self.conn
                    .grab_key(
                        true,
                        window,
                        xproto::ModMask::from(mods.bits()),
                        code,
                        xproto::GrabMode::ASYNC,
                        xproto::GrabMode::ASYNC,
                    )?
                    .check()?;
            }
        }
        Ok(())
    }

    fn ungrab_keys(&self, window: XWindowID) -> Result<()> {
        self.conn
            .ungrab_key(xproto::Grab::ANY, window, xproto::ModMask::ANY)?
            .check()?;
        Ok(())
    }

    fn grab_button(&self, mb: Mousebind, window: XWindowID, confine: bool) -> Result<()> {
        for extra in GRAB_MODIFIERS {
            let mods = mb.modmask | extra;
            self.conn
                .grab_button(
                    false,
                    window,
                    button_grab_mask(),
                    xproto::GrabMode::ASYNC,
                    xproto::GrabMode::SYNC,
                    if confine { window } else { x11rb::NONE },
                    x11rb::NONE,
                    xbutton(mb.button),
                    xproto::ModMask::from(mods.bits()),
                )?
                .check()?;
        }
        Ok(())
    }

    fn grab_all_buttons(&self, window: XWindowID) -> Result<()> {
        self.conn
            .grab_button(
                false,
                window,
                button_grab_mask(),
                xproto::GrabMode::ASYNC,
                xproto::GrabMode::SYNC,
                x11rb::NONE,
                x11rb::NONE,
                xproto::ButtonIndex::ANY,
                xproto::ModMask::ANY,
            )?
            .check()?;
        Ok(())
    }

    fn ungrab_buttons(&self, window: XWindowID) -> Result<()> {
        self.conn
            .ungrab_button(xproto::ButtonIndex::ANY, window, xproto::ModMask::ANY)?
            .check()?;
        Ok(())
    }

    fn grab_pointer(&self, window: XWindowID, cursor: CursorKind) -> Result<()> {
        let reply = self
            .conn
            .grab_pointer(
                false,
                window,
                pointer_grab_mask(),
                xproto::GrabMode::ASYNC,
                xproto::GrabMode::ASYNC,
                x11rb::NONE,
                self.cursor(cursor),
                x11rb::CURRENT_TIME,
            )?
            .reply()?;

        if reply.status == xproto::GrabStatus::SUCCESS {
            Ok(())
        } else {
            Err(XError::RequestError("could not grab pointer"))
        }
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.conn.ungrab_pointer(x11rb::CURRENT_TIME)?.check()?;
        Ok(())
    }

    fn grab_server(&self) -> Result<()> {
        self.conn.grab_server()?.check()?;
        Ok(())
    }

    fn ungrab_server(&self) -> Result<()> {
        self.conn.ungrab_server()?.check()?;
        Ok(())
    }

    //* Window operations

    fn create_window(
        &self,
        class: WindowClass,
        geom: Geometry,
        managed: bool,
    ) -> Result<XWindowID> {
        let wid = self.conn.generate_id()?;
        let (xclass, aux) = match class {
            WindowClass::CheckOnly => (
                xproto::WindowClass::INPUT_ONLY,
                xproto::CreateWindowAux::new().override_redirect(u32::from(!managed)),
            ),
            WindowClass::InputOutput(bg) => (
                xproto::WindowClass::INPUT_OUTPUT,
                xproto::CreateWindowAux::new()
                    .override_redirect(u32::from(!managed))
                    .background_pixel(bg)
                    .event_mask(xproto::EventMask::EXPOSURE | xproto::EventMask::BUTTON_PRESS),
            ),
        };

        self.conn
            .create_window(
                x11rb::COPY_FROM_PARENT as u8,
                wid,
                self.root.id,
                geom.x as i16,
                geom.y as i16,
                geom.width.max(1) as u16,
                geom.height.max(1) as u16,
                0,
                xclass,
                x11rb::COPY_FROM_PARENT,
                &aux,
            )?
            .check()?;
        Ok(wid)
    }

    fn destroy_window(&self, window: XWindowID) -> Result<()> {
        self.conn.destroy_window(window)?.check()?;
        Ok(())
    }

    fn map_window(&self, window: XWindowID) -> Result<()> {
        trace!("mapping window {}", window);
        self.conn.map_window(window)?.check()?;
        Ok(())
    }

    fn unmap_window(&self, window: XWindowID) -> Result<()> {
        trace!("unmapping window {}", window);
        self.conn.unmap_window(window)?.check()?;
        Ok(())
    }

    fn configure_window(&self, window: XWindowID, attrs: &[ClientConfig]) -> Result<()> {
        trace!("configuring window {} with {:?}", window, attrs);

        let mut aux = xproto::ConfigureWindowAux::new();
        for attr in attrs {
            match attr {
                ClientConfig::BorderWidth(bw) => aux = aux.border_width(*bw),
                ClientConfig::Move { x, y } => aux = aux.x(*x).y(*y),
                ClientConfig::Resize { h, w } => {
                    aux = aux.height((*h).max(1) as u32).width((*w).max(1) as u32)
                }
                ClientConfig::StackingMode(mode) => match mode {
                    StackMode::Above(sibling) => {
                        aux = aux.stack_mode(xproto::StackMode::ABOVE);
                        if let Some(s) = sibling {
                            aux = aux.sibling(*s);
                        }
                    }
                    StackMode::Below(sibling) => {
                        aux = aux.stack_mode(xproto::StackMode::BELOW);
                        if let Some(s) = sibling {
                            aux = aux.sibling(*s);
                        }
                    }
                },
            }
        }
        self.conn.configure_window(window, &aux)?.check()?;
        Ok(())
    }

    fn change_window_attributes(&self, window: XWindowID, attrs: &[ClientAttrs]) -> Result<()> {
        use xproto::EventMask;

        let mut aux = xproto::ChangeWindowAttributesAux::new();
        for attr in attrs {
            aux = match attr {
                ClientAttrs::BorderColour(color) => aux.border_pixel(*color),
                ClientAttrs::ClientEventMask => aux.event_mask(
                    EventMask::ENTER_WINDOW
                        | EventMask::FOCUS_CHANGE
                        | EventMask::PROPERTY_CHANGE
                        | EventMask::STRUCTURE_NOTIFY,
                ),
                ClientAttrs::DisableClientEvents => aux.event_mask(EventMask::NO_EVENT),
                ClientAttrs::RootEventMask => aux.event_mask(
                    EventMask::SUBSTRUCTURE_REDIRECT
                        | EventMask::SUBSTRUCTURE_NOTIFY
                        | EventMask::BUTTON_PRESS
                        | EventMask::POINTER_MOTION
                        | EventMask::ENTER_WINDOW
                        | EventMask::LEAVE_WINDOW
                        | EventMask::STRUCTURE_NOTIFY
                        | EventMask::PROPERTY_CHANGE,
                ),
            };
        }
        self.conn.change_window_attributes(window, &aux)?.check()?;
        Ok(())
    }

    fn set_input_focus(&self, window: XWindowID) -> Result<()> {
        self.conn
            .set_input_focus(
                xproto::InputFocus::POINTER_ROOT,
                window,
                x11rb::CURRENT_TIME,
            )?
            .check()?;
        Ok(())
    }

    fn send_client_message(&self, window: XWindowID, msg: ClientMessageEvent) -> Result<()> {
        let data = match msg.data {
            ClientMessageData::U8(d) => xproto::ClientMessageData::from(d),
            ClientMessageData::U16(d) => xproto::ClientMessageData::from(d),
            ClientMessageData::U32(d) => xproto::ClientMessageData::from(d),
        };
        let format = if msg.data.is_u8() {
            8
        } else if msg.data.is_u16() {
            16
        } else {
            32
        };
        let event = xproto::ClientMessageEvent::new(format, msg.window, msg.type_, data);

        self.conn
            .send_event(false, window, xproto::EventMask::NO_EVENT, event)?
            .check()?;
        Ok(())
    }

    fn send_configure_notify(
        &self,
        window: XWindowID,
        geom: Geometry,
        border_width: u32,
    ) -> Result<()> {
        let event = xproto::ConfigureNotifyEvent {
            response_type: xproto::CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: x11rb::NONE,
            x: geom.x as i16,
            y: geom.y as i16,
            width: geom.width.max(1) as u16,
            height: geom.height.max(1) as u16,
            border_width: border_width as u16,
            override_redirect: false,
        };
        self.conn
            .send_event(false, window, xproto::EventMask::STRUCTURE_NOTIFY, event)?
            .check()?;
        Ok(())
    }

    fn forward_configure_request(&self, data: &ConfigureRequestData) -> Result<()> {
        let mut aux = xproto::ConfigureWindowAux::new()
            .x(data.x)
            .y(data.y)
            .width(data.width.map(|w| w.max(1) as u32))
            .height(data.height.map(|h| h.max(1) as u32))
            .border_width(data.border_width)
            .sibling(data.sibling);
        if let Some(mode) = data.stack_mode {
            aux = aux.stack_mode(match mode {
                StackModeRaw::Above => xproto::StackMode::ABOVE,
                StackModeRaw::Below => xproto::StackMode::BELOW,
                StackModeRaw::TopIf => xproto::StackMode::TOP_IF,
                StackModeRaw::BottomIf => xproto::StackMode::BOTTOM_IF,
                StackModeRaw::Opposite => xproto::StackMode::OPPOSITE,
            });
        }
        self.conn.configure_window(data.id, &aux)?.check()?;
        Ok(())
    }

    fn warp_pointer(&self, window: Option<XWindowID>, x: i32, y: i32) -> Result<()> {
        self.conn
            .warp_pointer(
                x11rb::NONE,
                window.unwrap_or(self.root.id),
                0,
                0,
                0,
                0,
                x as i16,
                y as i16,
            )?
            .check()?;
        Ok(())
    }

    fn kill_client(&self, window: XWindowID) -> Result<()> {
        self.conn.kill_client(window)?.check()?;
        Ok(())
    }

    //* Properties

    fn get_property(&self, prop: &str, window: XWindowID) -> Result<Option<Property>> {
        let atom = self.atom_inner(prop)?;
        self.get_property_by_atom(atom, window)
    }

    fn set_property(&self, window: XWindowID, prop: &str, data: Property) -> Result<()> {
        self.write_property(window, prop, data, xproto::PropMode::REPLACE)
    }

    fn append_property(&self, window: XWindowID, prop: &str, data: Property) -> Result<()> {
        self.write_property(window, prop, data, xproto::PropMode::APPEND)
    }

    fn delete_property(&self, window: XWindowID, prop: &str) -> Result<()> {
        let atom = self.atom_inner(prop)?;
        self.conn.delete_property(window, atom)?.check()?;
        Ok(())
    }

    //* ICCCM conveniences

    fn get_wm_name(&self, window: XWindowID) -> String {
        let net_name = self
            .get_property(Atom::NetWmName.as_ref(), window)
            .ok()
            .flatten()
            .and_then(|p| p.into_single_string());

        net_name
            .or_else(|| {
                self.get_property(Atom::WmName.as_ref(), window)
                    .ok()
                    .flatten()
                    .and_then(|p| p.into_single_string())
            })
            .unwrap_or_default()
    }

    fn get_wm_class(&self, window: XWindowID) -> (String, String) {
        let mut strings = match self.get_property(Atom::WmClass.as_ref(), window) {
            Ok(Some(Property::String(ss))) | Ok(Some(Property::UTF8String(ss))) => ss,
            _ => return (String::new(), String::new()),
        };
        let instance = if strings.is_empty() {
            String::new()
        } else {
            strings.remove(0)
        };
        let class = strings.into_iter().next().unwrap_or_default();
        (instance, class)
    }

    fn get_wm_size_hints(&self, window: XWindowID) -> Option<WmSizeHints> {
        match self.get_property(Atom::WmNormalHints.as_ref(), window) {
            Ok(Some(Property::WMSizeHints(hints))) => Some(hints),
            _ => None,
        }
    }

    fn get_wm_hints(&self, window: XWindowID) -> Option<WmHints> {
        match self.get_property(Atom::WmHints.as_ref(), window) {
            Ok(Some(Property::WMHints(hints))) => Some(hints),
            _ => None,
        }
    }

    fn get_wm_protocols(&self, window: XWindowID) -> Option<Vec<XAtom>> {
        self.atoms_of(Atom::WmProtocols.as_ref(), window)
    }

    fn get_wm_state(&self, window: XWindowID) -> Option<WindowState> {
        let raw = match self.get_property(Atom::WmState.as_ref(), window) {
            Ok(Some(Property::U32List(_, vals))) => vals.first().copied()?,
            _ => return None,
        };
        match raw {
            x if x == WindowState::Normal as u32 => Some(WindowState::Normal),
            x if x == WindowState::Iconic as u32 => Some(WindowState::Iconic),
            x if x == WindowState::Withdrawn as u32 => Some(WindowState::Withdrawn),
            _ => None,
        }
    }

    fn get_wm_transient_for(&self, window: XWindowID) -> Option<XWindowID> {
        match self.get_property(Atom::WmTransientFor.as_ref(), window) {
            Ok(Some(Property::Window(ids))) => ids.first().copied().filter(|&id| id != 0),
            _ => None,
        }
    }

    fn set_wm_state(&self, window: XWindowID, state: WindowState) {
        let result = self.atom_inner(Atom::WmState.as_ref()).and_then(|atom| {
            self.conn
                .change_property32(
                    xproto::PropMode::REPLACE,
                    window,
                    atom,
                    atom,
                    &[state as u32, x11rb::NONE],
                )?
                .check()?;
            Ok(())
        });
        if let Err(e) = result {
            trace!("could not set WM_STATE on {}: {}", window, e);
        }
    }

    fn clear_urgency(&self, window: XWindowID) {
        // round-trip the raw hints so fields we do not model survive
        let result: Result<()> = (|| {
            let atom = self.atom_inner(Atom::WmHints.as_ref())?;
            let reply = self
                .conn
                .get_property(false, window, atom, xproto::AtomEnum::ANY, 0, MAX_LONG_LENGTH)?
                .reply()?;
            let raw: Option<Vec<u32>> = reply.value32().map(|it| it.collect());
            let Some(mut raw) = raw else {
                return Ok(());
            };
            if raw.is_empty() {
                return Ok(());
            }
            raw[0] &= !HINT_URGENCY;
            self.conn
                .change_property32(xproto::PropMode::REPLACE, window, atom, atom, &raw)?
                .check()?;
            Ok(())
        })();
        if let Err(e) = result {
            trace!("could not clear urgency on {}: {}", window, e);
        }
    }

    //* EWMH conveniences

    fn get_window_type(&self, window: XWindowID) -> Option<Vec<XAtom>> {
        self.atoms_of(Atom::NetWmWindowType.as_ref(), window)
    }

    fn get_window_states(&self, window: XWindowID) -> Option<Vec<XAtom>> {
        self.atoms_of(Atom::NetWmState.as_ref(), window)
    }

    //* Input plumbing

    fn lookup_keysym(&self, code: KeyCode) -> KeySym {
        self.lookup_keysym_inner(code)
    }

    fn refresh_keymap(&self) -> Result<()> {
        self.load_keymap()
    }

    //* Extensions

    fn create_pointer_barriers(&self, rects: &[Geometry]) -> Result<()> {
        use x11rb::protocol::xfixes::BarrierDirections;

        if !self.has_xfixes() {
            return Err(XError::RequestError("XFixes extension unavailable"));
        }

        for rect in rects {
            let (x1, y1) = (rect.x.max(0) as u16, rect.y.max(0) as u16);
            let (x2, y2) = (
                (rect.x + rect.width).max(0) as u16,
                (rect.y + rect.height).max(0) as u16,
            );
            // one barrier per work-area edge
            let edges = [
                (x1, y1, x2, y1),
                (x1, y2, x2, y2),
                (x1, y1, x1, y2),
                (x2, y1, x2, y2),
            ];
            for (ax, ay, bx, by) in edges {
                let barrier = self.conn.generate_id()?;
                self.conn
                    .xfixes_create_pointer_barrier(
                        barrier,
                        self.root.id,
                        ax,
                        ay,
                        bx,
                        by,
                        BarrierDirections::from(0u32),
                        &[],
                    )?
                    .check()?;
                self.barriers.borrow_mut().push(barrier);
            }
        }
        Ok(())
    }

    fn destroy_pointer_barriers(&self) -> Result<()> {
        for barrier in self.barriers.borrow_mut().drain(..) {
            self.conn.xfixes_delete_pointer_barrier(barrier)?.check()?;
        }
        Ok(())
    }
}

impl X11RBConn<Initialized> {
    fn write_property(
        &self,
        window: XWindowID,
        prop: &str,
        data: Property,
        mode: xproto::PropMode,
    ) -> Result<()> {
        let atom = self.atom_inner(prop)?;

        match data {
            Property::Atom(strings) => {
                let mut ids = Vec::with_capacity(strings.len());
                for s in &strings {
                    ids.push(self.atom_inner(s)?);
                }
                self.conn
                    .change_property32(mode, window, atom, xproto::AtomEnum::ATOM, &ids)?
                    .check()?;
            }
            Property::Cardinal(card) => {
                self.conn
                    .change_property32(mode, window, atom, xproto::AtomEnum::CARDINAL, &[card])?
                    .check()?;
            }
            Property::Window(ids) => {
                self.conn
                    .change_property32(mode, window, atom, xproto::AtomEnum::WINDOW, &ids)?
                    .check()?;
            }
            Property::String(strings) | Property::UTF8String(strings) => {
                self.conn
                    .change_property8(
                        mode,
                        window,
                        atom,
                        xproto::AtomEnum::STRING,
                        strings.join("\0").as_bytes(),
                    )?
                    .check()?;
            }
            Property::U8List(type_name, bytes) => {
                let type_atom = self.atom_inner(&type_name)?;
                self.conn
                    .change_property8(mode, window, atom, type_atom, &bytes)?
                    .check()?;
            }
            Property::U16List(type_name, words) => {
                let type_atom = self.atom_inner(&type_name)?;
                self.conn
                    .change_property16(mode, window, atom, type_atom, &words)?
                    .check()?;
            }
            Property::U32List(type_name, dwords) => {
                let type_atom = self.atom_inner(&type_name)?;
                self.conn
                    .change_property32(mode, window, atom, type_atom, &dwords)?
                    .check()?;
            }
            Property::WMHints(_) | Property::WMSizeHints(_) => {
                return Err(XError::RequestError(
                    "hint properties are written through their own paths",
                ));
            }
        }
        Ok(())
    }
}
