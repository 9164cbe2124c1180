//! The window manager proper.
//!
//! [`WindowManager`] owns the X connection and the monitor list, and is
//! driven entirely by [`XEvent`]s: the event loop in [`run`] blocks on
//! the connection and dispatches each event to a handler that mutates
//! the model and issues the corresponding X requests. All invariants on
//! the model (see [`WmState::validate`]) hold between any two
//! dispatches.
//!
//! [`run`]: WindowManager::run

use tracing::{debug, error, instrument, trace, warn};

use crate::bindings::{Keybinds, Mousebinds};
use crate::core::types::{
    ClientAttrs, ClientConfig, Geometry, MonitorDir, Point, Ring, StackMode,
};
use crate::core::window::Client;
use crate::core::Monitor;
use crate::layouts::{Layout, LayoutAction};
use crate::x::atom::Atom;
use crate::x::core::{Result as XResult, WindowClass, XConn, XWindow, XWindowID};
use crate::x::event::{
    ClientMessageData, ClientMessageEvent, ConfigureEvent, ConfigureRequestData, CrossingEvent,
    ExposeEvent, KeypressEvent, MappingEvent, MouseEvent, PointerEvent, PropertyEvent, XEvent,
};
use crate::x::property::{Property, WindowState};
use crate::{Result, WmError};

pub mod config;
pub mod state;

mod actions;

#[doc(inline)]
pub use config::{Config, ColorScheme, Rule, RuntimeConfig, WmConfig};
#[doc(inline)]
pub use state::WmState;

/// A callback rendering the bar of a monitor.
///
/// Bar drawing is not this crate's business; whenever the manager would
/// redraw a bar it invokes this hook with the monitor in question.
pub type BarHook<X> = Box<dyn FnMut(&X, &Monitor, &dyn RuntimeConfig)>;

/// A hook receiving errors the manager chose not to die on.
pub trait ErrorHandler {
    /// Handles the error.
    fn call(&self, error: WmError);
}

/// Releases a server grab when dropped, so no exit path can leak it.
struct ServerGrab<'a, X: XConn>(&'a X);

impl<'a, X: XConn> ServerGrab<'a, X> {
    fn acquire(conn: &'a X) -> Self {
        if let Err(e) = conn.grab_server() {
            warn!("could not grab server: {}", e);
        }
        Self(conn)
    }
}

impl<X: XConn> Drop for ServerGrab<'_, X> {
    fn drop(&mut self) {
        let _ = self.0.sync();
        if let Err(e) = self.0.ungrab_server() {
            warn!("could not ungrab server: {}", e);
        }
    }
}

/// The main window manager object that receives and responds to events.
///
/// Generic over the X connection (`X`) and the runtime configuration
/// (`C`), so both can be substituted: the former by a mock connection
/// in tests, the latter by an embedder's own configuration storage.
pub struct WindowManager<X, C>
where
    X: XConn,
    C: RuntimeConfig,
{
    pub(crate) conn: X,
    pub(crate) config: C,
    pub(crate) monitors: Ring<Monitor>,
    keybinds: Keybinds,
    mousebinds: Mousebinds,
    root: XWindow,
    /// Total screen dimensions, spanning all monitors.
    screen: (i32, i32),
    /// The gap around tiled windows. Starts at the configured value and
    /// moves with the gap actions.
    gap_px: i32,
    /// The client unfocused most recently, for focus swapping.
    prev_client: Option<XWindowID>,
    /// The `num` of the previously selected monitor.
    prev_monitor: Option<i32>,
    /// The `num` of the monitor the pointer was last seen on.
    motion_mon: Option<i32>,
    bar_hook: Option<BarHook<X>>,
    ehandler: Box<dyn ErrorHandler>,
    running: bool,
}

impl<X: XConn> WindowManager<X, WmConfig> {
    /// Registers as the window manager on the connection and builds the
    /// initial monitor layout.
    ///
    /// Fails with [`WmError::OtherWmRunning`] if another window manager
    /// has already selected substructure redirection on the root.
    #[instrument(level = "debug", skip_all)]
    pub fn new(conn: X, config: Config) -> Result<WindowManager<X, WmConfig>> {
        config.validate()?;
        let (runtime, keybinds, mousebinds) = config.split();

        let root = conn.get_root();
        debug!("registering on root window {}", root.id);

        conn.change_window_attributes(root.id, &[ClientAttrs::RootEventMask])
            .map_err(|_| WmError::OtherWmRunning)?;

        let screen = conn.screen_size();
        let gap_px = runtime.gap_px();

        let mut wm = WindowManager {
            conn,
            config: runtime,
            monitors: Ring::new(),
            keybinds,
            mousebinds,
            root,
            screen,
            gap_px,
            prev_client: None,
            prev_monitor: None,
            motion_mon: None,
            bar_hook: None,
            ehandler: Box::new(crate::log::DefaultErrorHandler),
            running: true,
        };

        wm.update_monitors();
        if wm.monitors.focused_idx().is_none() {
            wm.monitors.set_focused(0);
        }
        wm.update_bars();

        // advertise EWMH support and start the client list fresh
        let supported = Atom::ewmh_supported()
            .iter()
            .map(|a| a.as_ref().to_string())
            .collect();
        wm.check(wm.conn.set_property(
            root.id,
            Atom::NetSupported.as_ref(),
            Property::Atom(supported),
        ));
        wm.check(wm.conn.delete_property(root.id, Atom::NetClientList.as_ref()));

        wm.grab_keys();
        wm.focus(None);

        Ok(wm)
    }
}

impl<X, C> WindowManager<X, C>
where
    X: XConn,
    C: RuntimeConfig,
{
    /// Provides a view into the manager's state for introspection.
    pub fn state(&self) -> WmState<'_, X, C> {
        WmState {
            conn: &self.conn,
            config: &self.config,
            monitors: &self.monitors,
            root: self.root,
        }
    }

    /// Installs a callback to render monitor bars.
    pub fn set_bar_hook(&mut self, hook: BarHook<X>) {
        self.bar_hook = Some(hook);
    }

    /// Replaces the default error handler.
    pub fn set_error_handler(&mut self, handler: Box<dyn ErrorHandler>) {
        self.ehandler = handler;
    }

    /// Adopts windows that already exist on the server, as after a
    /// restart: viewable or iconic windows first, transients second so
    /// their parents are managed before them.
    pub fn scan(&mut self) {
        let windows = match self.check(self.conn.query_tree(self.root.id)) {
            Some(w) => w,
            None => return,
        };
        debug!("scan found {} top-level windows", windows.len());

        let mut transients = Vec::new();
        for window in windows {
            let Some(attrs) = self.conn.get_window_attributes(window).ok() else {
                continue;
            };
            if attrs.override_redirect {
                continue;
            }
            if self.conn.get_wm_transient_for(window).is_some() {
                transients.push(window);
                continue;
            }
            if self.should_adopt(window, &attrs.map_state) {
                self.manage(window);
            }
        }
        for window in transients {
            let Some(attrs) = self.conn.get_window_attributes(window).ok() else {
                continue;
            };
            if self.should_adopt(window, &attrs.map_state) {
                self.manage(window);
            }
        }
    }

    fn should_adopt(&self, window: XWindowID, state: &crate::x::core::MapState) -> bool {
        use crate::x::core::MapState;

        matches!(state, MapState::Viewable)
            || matches!(self.conn.get_wm_state(window), Some(WindowState::Iconic))
    }

    /// Runs the event loop until told to quit or the connection dies.
    pub fn run(&mut self) -> Result<()> {
        while self.running {
            match self.conn.poll_next_event() {
                Ok(Some(event)) => self.handle_event(event),
                Ok(None) => break,
                Err(ref e) if e.is_ignorable() => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.cleanup();
        Ok(())
    }

    /// Dispatches one event to its handler.
    pub fn handle_event(&mut self, event: XEvent) {
        use XEvent::*;

        trace!("dispatching {:?}", event);
        match event {
            ButtonPress(ev) => self.on_button_press(ev),
            ButtonRelease(_) => {}
            ClientMessage(ev) => self.on_client_message(ev),
            ConfigureNotify(ev) => self.on_configure_notify(ev),
            ConfigureRequest(ev) => self.on_configure_request(ev),
            DestroyNotify(id) => self.on_destroy_notify(id),
            EnterNotify(ev) => self.on_enter_notify(ev),
            Expose(ev) => self.on_expose(ev),
            FocusIn(id) => self.on_focus_in(id),
            KeyPress(ev) => self.on_key_press(ev),
            MappingNotify(ev) => self.on_mapping_notify(ev),
            MapRequest(id, override_redirect) => self.on_map_request(id, override_redirect),
            MotionNotify(ev) => self.on_motion_notify(ev),
            PropertyNotify(ev) => self.on_property_notify(ev),
            UnmapNotify(id, synthetic) => self.on_unmap_notify(id, synthetic),
            Unknown(code) => trace!("ignoring event type {}", code),
        }
    }

    //* ------- plumbing -------

    /// Filters an X result through the benign-error whitelist: drops
    /// whitelisted errors, routes everything else to the error hook.
    fn check<T>(&self, res: XResult<T>) -> Option<T> {
        match res {
            Ok(val) => Some(val),
            Err(ref e) if e.is_ignorable() => {
                trace!("ignoring benign X error: {}", e);
                None
            }
            Err(e) => {
                self.ehandler.call(WmError::XConn(e));
                None
            }
        }
    }

    fn selmon_idx(&self) -> usize {
        self.monitors
            .focused_idx()
            .expect("a monitor is always selected")
    }

    fn selmon(&self) -> &Monitor {
        &self.monitors[self.selmon_idx()]
    }

    /// Finds the monitor and client-list index of a managed window.
    fn locate(&self, id: XWindowID) -> Option<(usize, usize)> {
        for (midx, mon) in self.monitors.iter().enumerate() {
            if let Some(cidx) = mon.clients.get_idx(id) {
                return Some((midx, cidx));
            }
        }
        None
    }

    fn mon_idx_by_num(&self, num: i32) -> Option<usize> {
        self.monitors.element_by(|m| m.num == num).map(|(i, _)| i)
    }

    /// The monitor whose work area overlaps the given rectangle the
    /// most; the selected monitor when none does.
    fn rect_to_mon(&self, rect: Geometry) -> usize {
        let mut best = self.selmon_idx();
        let mut area = 0;

        for (i, mon) in self.monitors.iter().enumerate() {
            let a = rect.intersect_area(&mon.work_area());
            if a > area {
                area = a;
                best = i;
            }
        }
        best
    }

    fn point_to_mon(&self, pt: Point) -> usize {
        self.rect_to_mon(Geometry::new(pt.x, pt.y, 1, 1))
    }

    /// The monitor a window belongs to: by pointer for the root, by bar
    /// window, by client, falling back to the selected monitor.
    fn win_to_mon(&self, id: XWindowID) -> usize {
        if id == self.root.id {
            if let Some(reply) = self.conn.query_pointer(self.root.id).ok() {
                return self.point_to_mon(Point::new(reply.root_x, reply.root_y));
            }
        }
        if let Some((i, _)) = self.monitors.element_by(|m| m.bar_win == id && id != 0) {
            return i;
        }
        if let Some((midx, _)) = self.locate(id) {
            return midx;
        }
        self.selmon_idx()
    }

    fn layout(&self, midx: usize) -> Layout {
        let layouts = self.config.layouts();
        layouts[self.monitors[midx].lt_idx.min(layouts.len() - 1)]
    }

    fn is_floating_layout(&self, midx: usize) -> bool {
        self.layout(midx).is_floating()
    }

    /// Whether size hints apply to this client when resizing.
    fn honors_hints(&self, midx: usize, client: &Client) -> bool {
        client.obeys_size_hints || client.is_floating || self.is_floating_layout(midx)
    }

    //* ------- event handlers -------

    fn on_button_press(&mut self, ev: MouseEvent) {
        // focus the monitor under the press if it is not the current one
        let midx = self.win_to_mon(ev.id);
        if midx != self.selmon_idx() {
            if let Some(sel) = self.selmon().sel {
                self.unfocus(sel, true);
            }
            self.monitors.set_focused(midx);
            self.focus(None);
        }

        if self.locate(ev.id).is_some() {
            self.focus(Some(ev.id));
            if let Some(action) = self.mousebinds.lookup(&ev).cloned() {
                self.run_action(action);
            }
        }
    }

    fn on_client_message(&mut self, ev: ClientMessageEvent) {
        if self.locate(ev.window).is_none() {
            return;
        }

        let net_wm_state = self.conn.lookup_interned_atom(Atom::NetWmState.as_ref());
        let net_active = self.conn.lookup_interned_atom(Atom::NetActiveWindow.as_ref());
        let fullscreen = self
            .conn
            .lookup_interned_atom(Atom::NetWmStateFullscreen.as_ref());

        if Some(ev.type_) == net_wm_state {
            let Some(data) = ev.data.as_u32() else { return };
            if Some(data[1]) == fullscreen || Some(data[2]) == fullscreen {
                // 1 = add, 2 = toggle
                let currently = self
                    .state()
                    .lookup_client(ev.window)
                    .map_or(false, |c| c.is_fullscreen);
                let add = data[0] == 1 || (data[0] == 2 && !currently);
                self.set_fullscreen(ev.window, add);
            }
        } else if Some(ev.type_) == net_active {
            // swap the view to a tag-set showing the client, then
            // raise-and-focus it
            let (midx, _) = self.locate(ev.window).unwrap();
            if !self.monitors[midx].is_visible_id(ev.window) {
                let tags = self.monitors[midx]
                    .clients
                    .lookup(ev.window)
                    .map(|c| c.tags)
                    .unwrap_or(0);
                let mon = &mut self.monitors[midx];
                mon.seltags ^= 1;
                let slot = mon.seltags;
                mon.tagset[slot] = tags;
            }
            self.pop(ev.window);
        }
    }

    fn on_configure_notify(&mut self, ev: ConfigureEvent) {
        if !ev.is_root {
            return;
        }

        let dirty = self.screen != (ev.geom.width, ev.geom.height);
        self.screen = (ev.geom.width, ev.geom.height);

        if self.update_monitors() || dirty {
            self.update_bars();
            let bar_h = self.config.bar_height();
            for i in 0..self.monitors.len() {
                let mon = &self.monitors[i];
                if mon.bar_win != 0 {
                    let rect = mon.bar_rect(bar_h);
                    self.check(self.conn.configure_window(
                        mon.bar_win,
                        &[
                            ClientConfig::Move {
                                x: rect.x,
                                y: rect.y,
                            },
                            ClientConfig::Resize {
                                h: rect.height,
                                w: rect.width,
                            },
                        ],
                    ));
                }
            }
            self.focus(None);
            self.arrange(None);
        }
    }

    fn on_configure_request(&mut self, ev: ConfigureRequestData) {
        if let Some((midx, _)) = self.locate(ev.id) {
            let floating_layout = self.is_floating_layout(midx);
            let mgeom = self.monitors[midx].geometry();
            let visible = self.monitors[midx].is_visible_id(ev.id);

            let mon = &mut self.monitors[midx];
            let client = mon.clients.lookup_mut(ev.id).unwrap();

            if let Some(bw) = ev.border_width {
                client.border_width = bw;
            } else if client.is_floating || floating_layout {
                let mut geom = client.geometry();
                if let Some(x) = ev.x {
                    geom.x = mgeom.x + x;
                }
                if let Some(y) = ev.y {
                    geom.y = mgeom.y + y;
                }
                if let Some(w) = ev.width {
                    geom.width = w;
                }
                if let Some(h) = ev.height {
                    geom.height = h;
                }

                // floating windows straying off the monitor get centered
                let bw2 = 2 * client.border_width as i32;
                if geom.x + geom.width > mgeom.x + mgeom.width && client.is_floating {
                    geom.x = mgeom.x + (mgeom.width / 2 - (geom.width + bw2) / 2);
                }
                if geom.y + geom.height > mgeom.y + mgeom.height && client.is_floating {
                    geom.y = mgeom.y + (mgeom.height / 2 - (geom.height + bw2) / 2);
                }

                client.set_geometry(geom);
                let bw = client.border_width;

                let position_only = (ev.x.is_some() || ev.y.is_some())
                    && ev.width.is_none()
                    && ev.height.is_none();
                if position_only {
                    self.check(self.conn.send_configure_notify(ev.id, geom, bw));
                }
                if visible {
                    self.check(self.conn.configure_window(
                        ev.id,
                        &[
                            ClientConfig::Move {
                                x: geom.x,
                                y: geom.y,
                            },
                            ClientConfig::Resize {
                                h: geom.height,
                                w: geom.width,
                            },
                        ],
                    ));
                }
            } else {
                // tiled windows are pinned: tell them where they are
                let geom = client.geometry();
                let bw = client.border_width;
                self.check(self.conn.send_configure_notify(ev.id, geom, bw));
            }
        } else {
            self.check(self.conn.forward_configure_request(&ev));
        }
        self.check(self.conn.sync());
    }

    fn on_destroy_notify(&mut self, id: XWindowID) {
        if self.locate(id).is_some() {
            self.unmanage(id, true);
        }
    }

    fn on_enter_notify(&mut self, ev: CrossingEvent) {
        if (!ev.normal_mode || ev.inferior) && !ev.is_root {
            return;
        }

        let client = self.locate(ev.id);
        let midx = client.map(|(m, _)| m).unwrap_or_else(|| self.win_to_mon(ev.id));

        if midx != self.selmon_idx() {
            if let Some(sel) = self.selmon().sel {
                self.unfocus(sel, true);
            }
            self.monitors.set_focused(midx);
        } else if client.is_none() || client.map(|_| ev.id) == self.selmon().sel {
            return;
        }

        self.focus(client.map(|_| ev.id));
    }

    fn on_expose(&mut self, ev: ExposeEvent) {
        if ev.count == 0 {
            let midx = self.win_to_mon(ev.id);
            self.draw_bar(midx);
        }
    }

    /// Some clients acquire focus on their own; push it back where it
    /// belongs.
    fn on_focus_in(&mut self, id: XWindowID) {
        if let Some(sel) = self.selmon().sel {
            if sel != id {
                self.set_focus_on(sel);
            }
        }
    }

    fn on_key_press(&mut self, ev: KeypressEvent) {
        if let Some(action) = self.keybinds.lookup(&ev).cloned() {
            debug!("keybind {:?} -> {:?}", ev, action);
            self.run_action(action);
        }
    }

    fn on_mapping_notify(&mut self, ev: MappingEvent) {
        self.check(self.conn.refresh_keymap());
        if ev.is_keyboard {
            self.grab_keys();
        }
    }

    fn on_map_request(&mut self, id: XWindowID, override_redirect: bool) {
        if override_redirect || self.locate(id).is_some() {
            return;
        }
        self.manage(id);
    }

    fn on_motion_notify(&mut self, ev: PointerEvent) {
        if !ev.is_root {
            return;
        }

        let midx = self.point_to_mon(ev.location);
        let num = self.monitors[midx].num;

        if let Some(prev) = self.motion_mon {
            if prev != num {
                if let Some(sel) = self.selmon().sel {
                    self.unfocus(sel, true);
                }
                self.monitors.set_focused(midx);
                self.focus(None);
            }
        }
        self.motion_mon = Some(num);
    }

    fn on_property_notify(&mut self, ev: PropertyEvent) {
        let wm_name = self.conn.lookup_interned_atom(Atom::WmName.as_ref());
        let net_wm_name = self.conn.lookup_interned_atom(Atom::NetWmName.as_ref());

        if ev.is_root && Some(ev.atom) == wm_name {
            // the root name carries the status text
            let idx = self.selmon_idx();
            self.draw_bar(idx);
            return;
        }
        if ev.deleted {
            return;
        }
        let Some((midx, _)) = self.locate(ev.id) else {
            return;
        };

        let transient = self.conn.lookup_interned_atom(Atom::WmTransientFor.as_ref());
        let normal_hints = self.conn.lookup_interned_atom(Atom::WmNormalHints.as_ref());
        let hints = self.conn.lookup_interned_atom(Atom::WmHints.as_ref());
        let window_type = self.conn.lookup_interned_atom(Atom::NetWmWindowType.as_ref());

        if Some(ev.atom) == transient {
            let target = self.conn.get_wm_transient_for(ev.id);
            let target_managed = target.map_or(false, |t| self.locate(t).is_some());
            let mon = &mut self.monitors[midx];
            let client = mon.clients.lookup_mut(ev.id).unwrap();
            if !client.is_floating && target_managed {
                client.is_floating = true;
                self.arrange(Some(midx));
            }
        } else if Some(ev.atom) == normal_hints {
            let conn = &self.conn;
            self.monitors[midx]
                .clients
                .lookup_mut(ev.id)
                .unwrap()
                .update_size_hints(conn);
        } else if Some(ev.atom) == hints {
            let is_sel = self.monitors[midx].sel == Some(ev.id);
            {
                let conn = &self.conn;
                self.monitors[midx]
                    .clients
                    .lookup_mut(ev.id)
                    .unwrap()
                    .update_wm_hints(conn, is_sel);
            }
            let urgent = self.monitors[midx]
                .clients
                .lookup(ev.id)
                .map_or(false, |c| c.is_urgent);
            if urgent {
                if let Some(c) = self.monitors[midx].clients.lookup(ev.id) {
                    c.set_border(&self.conn, self.config.border_urgent());
                }
            }
            self.draw_bars();
        }

        if Some(ev.atom) == wm_name || Some(ev.atom) == net_wm_name {
            let conn = &self.conn;
            self.monitors[midx]
                .clients
                .lookup_mut(ev.id)
                .unwrap()
                .update_title(conn);
            if self.monitors[midx].sel == Some(ev.id) {
                self.draw_bar(midx);
            }
        }
        if Some(ev.atom) == window_type {
            self.update_window_type(ev.id);
        }
    }

    fn on_unmap_notify(&mut self, id: XWindowID, synthetic: bool) {
        if self.locate(id).is_none() {
            return;
        }
        if synthetic {
            // the client requested withdrawal
            self.conn.set_wm_state(id, WindowState::Withdrawn);
        } else {
            self.unmanage(id, false);
        }
    }

    //* ------- client lifecycle -------

    /// Starts managing a window: builds its client record, applies
    /// rules, clamps geometry, selects its events, attaches it, and
    /// focuses it.
    #[instrument(level = "debug", skip(self))]
    pub(crate) fn manage(&mut self, id: XWindowID) {
        let Some(attrs) = self.check(self.conn.get_window_attributes(id)) else {
            return;
        };
        let Some(geom) = self.check(self.conn.get_geometry(id)) else {
            return;
        };

        let border_px = self.config.border_px();
        let mut client = Client::new(id, geom, border_px);
        client.prev_border_width = attrs.border_width;
        client.obeys_size_hints = self.config.obeys_size_hints();
        client.update_title(&self.conn);
        client.update_class(&self.conn);

        // a transient window rides along with its parent
        let transient = self
            .conn
            .get_wm_transient_for(id)
            .and_then(|t| self.locate(t));
        let midx = if let Some((tmidx, tcidx)) = transient {
            client.tags = self.monitors[tmidx].clients[tcidx].tags;
            tmidx
        } else {
            self.apply_rules(&mut client)
        };

        let tag_mask = self.config.tag_mask();
        if client.tags & tag_mask == 0 {
            client.tags = self.monitors[midx].tag_mask();
        } else {
            client.tags &= tag_mask;
        }

        // keep the window's visible edges on its monitor
        let mgeom = self.monitors[midx].geometry();
        let bar_h = self.config.bar_height();
        let bw2 = 2 * border_px as i32;
        let mut g = client.geometry();
        if g.x + g.width + bw2 > mgeom.x + mgeom.width {
            g.x = mgeom.x + mgeom.width - g.width - bw2;
        }
        if g.y + g.height + bw2 > mgeom.y + mgeom.height {
            g.y = mgeom.y + mgeom.height - g.height - bw2;
        }
        g.x = g.x.max(mgeom.x);
        g.y = g.y.max(mgeom.y + if self.monitors[midx].top_bar { bar_h } else { 0 });

        // align windows opening at the origin with the tiling grid
        if geom.x == 0 && geom.y == 0 {
            g.x += self.gap_px;
            g.y += self.gap_px;
        }
        client.xwindow.set_geometry(g);
        client.prev_geom = g;

        self.check(
            self.conn
                .configure_window(id, &[ClientConfig::BorderWidth(border_px)]),
        );
        client.set_border(&self.conn, self.config.border_unfocused());
        self.check(self.conn.send_configure_notify(id, g, border_px));

        client.update_size_hints(&self.conn);
        client.update_wm_hints(&self.conn, false);

        // window-type flags, read before the client is attached
        let dialog = self.window_type_has(id, Atom::NetWmWindowTypeDialog);
        let wants_fullscreen = self.window_state_has(id, Atom::NetWmStateFullscreen);
        if dialog {
            client.is_floating = true;
        }

        self.check(
            self.conn
                .change_window_attributes(id, &[ClientAttrs::ClientEventMask]),
        );
        self.grab_buttons(id, false);

        if !client.is_floating {
            client.is_floating = transient.is_some() || client.is_fixed;
            client.prev_floating = client.is_floating;
        }
        if client.is_floating {
            self.check(
                self.conn
                    .configure_window(id, &[ClientConfig::StackingMode(StackMode::Above(None))]),
            );
        }

        self.monitors[midx].attach(client);
        self.monitors[midx].attach_stack(id);

        self.check(self.conn.append_property(
            self.root.id,
            Atom::NetClientList.as_ref(),
            Property::Window(vec![id]),
        ));

        // park the window off-screen until the arrange pass places it;
        // some clients need the move before they see their first map
        self.check(self.conn.configure_window(
            id,
            &[
                ClientConfig::Move {
                    x: g.x + 2 * self.screen.0,
                    y: g.y,
                },
                ClientConfig::Resize {
                    h: g.height,
                    w: g.width,
                },
            ],
        ));
        self.conn.set_wm_state(id, WindowState::Normal);

        if midx == self.selmon_idx() {
            if let Some(sel) = self.selmon().sel {
                self.unfocus(sel, false);
            }
        }
        self.monitors[midx].sel = Some(id);

        if wants_fullscreen {
            self.set_fullscreen(id, true);
        }

        self.arrange(Some(midx));
        self.check(self.conn.map_window(id));
        self.focus(None);
    }

    /// Stops managing a window.
    ///
    /// If the window still exists, its pre-management state is restored
    /// under a server grab so a concurrent destroy cannot race the
    /// restore sequence.
    #[instrument(level = "debug", skip(self))]
    pub(crate) fn unmanage(&mut self, id: XWindowID, destroyed: bool) {
        let Some((midx, _)) = self.locate(id) else {
            return;
        };

        let client = self.monitors[midx].detach(id).unwrap();
        self.monitors[midx].detach_stack(id);

        if !destroyed {
            let grab = ServerGrab::acquire(&self.conn);
            let _ = self
                .conn
                .configure_window(id, &[ClientConfig::BorderWidth(client.prev_border_width)]);
            let _ = self.conn.ungrab_buttons(id);
            self.conn.set_wm_state(id, WindowState::Withdrawn);
            drop(grab);
        }

        if self.prev_client == Some(id) {
            self.prev_client = None;
        }
        self.focus(None);
        self.update_client_list();
        self.arrange(Some(midx));
    }

    /// Applies the first matching rules to a freshly created client and
    /// returns the monitor it should go to.
    fn apply_rules(&self, client: &mut Client) -> usize {
        let mut midx = self.selmon_idx();
        let (instance, class) = {
            let (i, c) = client.class();
            (i.to_string(), c.to_string())
        };

        for rule in self.config.rules() {
            if rule.matches(&class, &instance, client.name()) {
                client.is_floating = rule.is_floating;
                client.obeys_size_hints = rule.obeys_size_hints;
                client.tags |= rule.tags;
                if rule.monitor >= 0 {
                    if let Some(i) = self.mon_idx_by_num(rule.monitor) {
                        midx = i;
                    }
                }
            }
        }
        midx
    }

    fn window_type_has(&self, id: XWindowID, atom: Atom) -> bool {
        let Some(wanted) = self.conn.lookup_interned_atom(atom.as_ref()) else {
            return false;
        };
        self.conn
            .get_window_type(id)
            .map_or(false, |types| types.contains(&wanted))
    }

    fn window_state_has(&self, id: XWindowID, atom: Atom) -> bool {
        let Some(wanted) = self.conn.lookup_interned_atom(atom.as_ref()) else {
            return false;
        };
        self.conn
            .get_window_states(id)
            .map_or(false, |states| states.contains(&wanted))
    }

    /// Refreshes type-derived flags: dialogs float, a fullscreen state
    /// atom puts the client into fullscreen.
    fn update_window_type(&mut self, id: XWindowID) {
        if self.window_state_has(id, Atom::NetWmStateFullscreen) {
            self.set_fullscreen(id, true);
        }
        if self.window_type_has(id, Atom::NetWmWindowTypeDialog) {
            if let Some((midx, _)) = self.locate(id) {
                if let Some(c) = self.monitors[midx].clients.lookup_mut(id) {
                    c.is_floating = true;
                }
            }
        }
    }

    //* ------- focus -------

    /// Focuses the given client, or the most recently focused visible
    /// client of the selected monitor when `None` (or when the given
    /// client is not visible).
    pub(crate) fn focus(&mut self, id: Option<XWindowID>) {
        let target = id
            .filter(|&w| {
                self.locate(w)
                    .map_or(false, |(m, _)| self.monitors[m].is_visible_id(w))
            })
            .or_else(|| self.selmon().first_visible_in_stack());

        let prev = self.selmon().sel;
        if prev.is_some() && prev != target {
            self.unfocus(prev.unwrap(), false);
        }

        if let Some(t) = target {
            let (midx, _) = self.locate(t).expect("focus target is managed");
            if midx != self.selmon_idx() {
                self.monitors.set_focused(midx);
            }

            {
                let conn = &self.conn;
                let mon = &mut self.monitors[midx];
                if let Some(client) = mon.clients.lookup_mut(t) {
                    if client.is_urgent {
                        client.is_urgent = false;
                        conn.clear_urgency(t);
                    }
                }
                // bump to the head of the focus LRU
                mon.stack.retain(|&w| w != t);
                mon.stack.insert(0, t);
            }

            self.grab_buttons(t, true);
            if let Some(client) = self.monitors[midx].clients.lookup(t) {
                client.set_border(&self.conn, self.config.border_focused());
            }
            self.set_focus_on(t);
            self.monitors[midx].sel = Some(t);
        } else {
            self.check(self.conn.set_input_focus(self.root.id));
            self.check(
                self.conn
                    .delete_property(self.root.id, Atom::NetActiveWindow.as_ref()),
            );
            let idx = self.selmon_idx();
            self.monitors[idx].sel = None;
        }

        self.draw_bars();
    }

    /// Takes visible focus away from a client without selecting another.
    pub(crate) fn unfocus(&mut self, id: XWindowID, refocus_root: bool) {
        if self.locate(id).is_none() {
            return;
        }

        self.prev_client = Some(id);
        self.grab_buttons(id, false);
        if let Some((midx, _)) = self.locate(id) {
            if let Some(client) = self.monitors[midx].clients.lookup(id) {
                client.set_border(&self.conn, self.config.border_unfocused());
            }
        }
        if refocus_root {
            self.check(self.conn.set_input_focus(self.root.id));
            self.check(
                self.conn
                    .delete_property(self.root.id, Atom::NetActiveWindow.as_ref()),
            );
        }
    }

    /// Hands input focus to a client: ICCCM input focus unless the
    /// client opted out, `WM_TAKE_FOCUS` if it speaks the protocol.
    fn set_focus_on(&mut self, id: XWindowID) {
        let never_focus = self
            .state()
            .lookup_client(id)
            .map_or(false, |c| c.never_focus);

        if !never_focus {
            self.check(self.conn.set_input_focus(id));
            self.check(self.conn.set_property(
                self.root.id,
                Atom::NetActiveWindow.as_ref(),
                Property::Window(vec![id]),
            ));
        }
        self.send_protocol(id, Atom::WmTakeFocus);
    }

    /// Sends a `WM_PROTOCOLS` message if the client supports the given
    /// protocol. Returns whether it did.
    fn send_protocol(&self, id: XWindowID, protocol: Atom) -> bool {
        let Some(proto_atom) = self.conn.lookup_interned_atom(protocol.as_ref()) else {
            return false;
        };
        let supported = self
            .conn
            .get_wm_protocols(id)
            .map_or(false, |ps| ps.contains(&proto_atom));

        if supported {
            let Some(wm_protocols) = self.conn.lookup_interned_atom(Atom::WmProtocols.as_ref())
            else {
                return false;
            };
            self.check(self.conn.send_client_message(
                id,
                ClientMessageEvent {
                    window: id,
                    type_: wm_protocols,
                    data: ClientMessageData::U32([proto_atom, 0, 0, 0, 0]),
                },
            ));
        }
        supported
    }

    /// Raises a client to the head of its monitor's client list and
    /// focuses it.
    fn pop(&mut self, id: XWindowID) {
        let Some((midx, _)) = self.locate(id) else {
            return;
        };
        if let Some(client) = self.monitors[midx].detach(id) {
            self.monitors[midx].attach(client);
        }
        self.focus(Some(id));
        self.arrange(Some(midx));
    }

    //* ------- geometry and arrangement -------

    /// Resizes a client, passing the proposal through its size hints.
    pub(crate) fn resize(&mut self, id: XWindowID, geom: Geometry, interact: bool) {
        let Some((midx, _)) = self.locate(id) else {
            return;
        };

        let work = self.monitors[midx].work_area();
        let bar_h = self.config.bar_height();
        let (corrected, changed) = {
            let client = self.monitors[midx].clients.lookup(id).unwrap();
            let apply = self.honors_hints(midx, client);
            client.apply_size_hints(geom, interact, self.screen, work, bar_h, apply)
        };

        if changed {
            self.resize_client(id, corrected);
        }
    }

    /// Applies a geometry to a client unconditionally and notifies it.
    pub(crate) fn resize_client(&mut self, id: XWindowID, geom: Geometry) {
        let Some((midx, _)) = self.locate(id) else {
            return;
        };
        let bw = {
            let client = self.monitors[midx].clients.lookup_mut(id).unwrap();
            client.set_geometry(geom);
            client.border_width
        };

        self.check(self.conn.configure_window(
            id,
            &[
                ClientConfig::Move {
                    x: geom.x,
                    y: geom.y,
                },
                ClientConfig::Resize {
                    h: geom.height,
                    w: geom.width,
                },
                ClientConfig::BorderWidth(bw),
            ],
        ));
        self.check(self.conn.send_configure_notify(id, geom, bw));
        self.check(self.conn.sync());
    }

    /// Re-lays out one monitor (or all of them), making hidden clients
    /// leave the screen and visible ones return.
    pub(crate) fn arrange(&mut self, midx: Option<usize>) {
        match midx {
            Some(i) => {
                self.show_hide(i);
                self.arrange_monitor(i);
                self.restack(i);
            }
            None => {
                for i in 0..self.monitors.len() {
                    self.show_hide(i);
                }
                for i in 0..self.monitors.len() {
                    self.arrange_monitor(i);
                }
            }
        }
    }

    fn arrange_monitor(&mut self, midx: usize) {
        let layout = self.layout(midx);
        self.monitors[midx].ltsymbol = layout.symbol.to_string();

        let Some(arrange) = layout.arrange else {
            return;
        };
        let actions = arrange(&self.monitors[midx], self.gap_px);

        for action in actions {
            match action {
                LayoutAction::Resize { id, geom } => self.resize(id, geom, false),
                LayoutAction::OverrideSymbol(symbol) => {
                    self.monitors[midx].ltsymbol = symbol;
                }
            }
        }
    }

    /// Shows visible clients top-down and hides the rest bottom-up, in
    /// two explicit passes over the focus stack.
    fn show_hide(&mut self, midx: usize) {
        let floating_layout = self.is_floating_layout(midx);
        let stack = self.monitors[midx].stack.clone();

        // top-down: move visible clients into place
        for &id in &stack {
            let Some(client) = self.monitors[midx].clients.lookup(id) else {
                continue;
            };
            if !self.monitors[midx].is_visible_id(id) {
                continue;
            }
            let geom = client.geometry();
            let floats = client.is_floating;
            let fullscreen = client.is_fullscreen;
            self.check(self.conn.configure_window(
                id,
                &[ClientConfig::Move {
                    x: geom.x,
                    y: geom.y,
                }],
            ));
            if (floating_layout || floats) && !fullscreen {
                self.resize(id, geom, false);
            }
        }

        // bottom-up: move hidden clients off-screen
        for &id in stack.iter().rev() {
            let Some(client) = self.monitors[midx].clients.lookup(id) else {
                continue;
            };
            if self.monitors[midx].is_visible_id(id) {
                continue;
            }
            let geom = client.geometry();
            self.check(self.conn.configure_window(
                id,
                &[ClientConfig::Move {
                    x: -2 * (geom.width + 2 * client.border_width as i32),
                    y: geom.y,
                }],
            ));
        }
    }

    /// Re-establishes the stacking order on a monitor: the selected
    /// floating client on top, every tiled client below the bar.
    pub(crate) fn restack(&mut self, midx: usize) {
        self.draw_bar(midx);

        let Some(sel) = self.monitors[midx].sel else {
            return;
        };
        let floating_layout = self.is_floating_layout(midx);
        let sel_floats = self.monitors[midx]
            .clients
            .lookup(sel)
            .map_or(false, |c| c.is_floating);

        if sel_floats || floating_layout {
            self.check(
                self.conn
                    .configure_window(sel, &[ClientConfig::StackingMode(StackMode::Above(None))]),
            );
        }

        if !floating_layout {
            let mon = &self.monitors[midx];
            let mut sibling = if mon.bar_win != 0 {
                Some(mon.bar_win)
            } else {
                None
            };
            let chain: Vec<XWindowID> = mon
                .stack
                .iter()
                .copied()
                .filter(|&id| {
                    mon.clients
                        .lookup(id)
                        .map_or(false, |c| !c.is_floating && mon.is_visible(c))
                })
                .collect();
            for id in chain {
                self.check(self.conn.configure_window(
                    id,
                    &[ClientConfig::StackingMode(StackMode::Below(sibling))],
                ));
                sibling = Some(id);
            }
        }

        self.check(self.conn.sync());
        self.conn.drop_pending_crossings();
    }

    //* ------- monitors -------

    /// Reconciles the monitor list against the server's outputs.
    ///
    /// Returns whether anything changed. Excess monitors drain their
    /// clients into the primary monitor; new outputs get fresh monitors
    /// with the configured startup tag-sets.
    pub(crate) fn update_monitors(&mut self) -> bool {
        let mut dirty = false;

        if self.config.barriers() {
            let _ = self.conn.destroy_pointer_barriers();
        }
        self.prev_monitor = None;

        let outputs = self.check(self.conn.all_outputs()).unwrap_or_default();
        let mut unique: Vec<Geometry> = Vec::with_capacity(outputs.len());
        for geom in outputs {
            if geom.width > 0 && !unique.contains(&geom) {
                unique.push(geom);
            }
        }
        if unique.is_empty() {
            unique.push(Geometry::new(0, 0, self.screen.1, self.screen.0));
        }

        let n = self.monitors.len();
        let nn = unique.len();

        if nn >= n {
            for i in n..nn {
                let tags = self.config.startup_tags(i, nn > 1) & self.config.tag_mask();
                let tags = if tags == 0 { 1 } else { tags };
                let mon = Monitor::new(i as i32, tags, &self.config);
                self.monitors.append(mon);
                dirty = true;
            }
            let bar_h = self.config.bar_height();
            for (i, geom) in unique.iter().enumerate() {
                let mon = &mut self.monitors[i];
                if i >= n || mon.geometry() != *geom {
                    dirty = true;
                    mon.num = i as i32;
                    mon.set_geometry(*geom);
                    mon.update_bar_pos(bar_h);
                }
            }
        } else {
            // fewer outputs than monitors: drain the excess into the
            // primary, preserving both orders
            for _ in nn..n {
                dirty = true;
                let last = self.monitors.len() - 1;
                let mut dead = self.monitors.remove(last).unwrap();

                if dead.bar_win != 0 {
                    let _ = self.conn.unmap_window(dead.bar_win);
                    let _ = self.conn.destroy_window(dead.bar_win);
                }

                while let Some(client) = dead.clients.remove(0) {
                    self.monitors[0].clients.append(client);
                }
                for id in dead.stack.drain(..) {
                    self.monitors[0].stack.push(id);
                }
            }
            if self.monitors.focused_idx().is_none() {
                self.monitors.set_focused(0);
            }
        }

        if dirty {
            self.monitors.set_focused(0);
            let idx = self.win_to_mon(self.root.id);
            self.monitors.set_focused(idx);
        }

        if self.config.barriers() {
            let rects: Vec<Geometry> = self.monitors.iter().map(|m| m.work_area()).collect();
            if let Err(e) = self.conn.create_pointer_barriers(&rects) {
                debug!("pointer barriers unavailable: {}", e);
            }
        }

        dirty
    }

    /// Creates bar windows for monitors that lack one.
    pub(crate) fn update_bars(&mut self) {
        let bar_h = self.config.bar_height();
        let bg = self.config.colors().bar_text.1;

        for i in 0..self.monitors.len() {
            if self.monitors[i].bar_win != 0 {
                continue;
            }
            let rect = self.monitors[i].bar_rect(bar_h);
            match self.conn.create_window(WindowClass::InputOutput(bg), rect, false) {
                Ok(win) => {
                    self.monitors[i].bar_win = win;
                    self.check(self.conn.map_window(win));
                }
                Err(e) => error!("could not create bar window: {}", e),
            }
        }
    }

    /// Moves a client to another monitor, giving it that monitor's
    /// current tag-set.
    pub(crate) fn send_to_monitor(&mut self, id: XWindowID, target: usize) {
        let Some((midx, _)) = self.locate(id) else {
            return;
        };
        if midx == target {
            return;
        }

        self.unfocus(id, true);
        let mut client = self.monitors[midx].detach(id).unwrap();
        self.monitors[midx].detach_stack(id);

        client.tags = self.monitors[target].tag_mask();
        self.monitors[target].attach(client);
        self.monitors[target].attach_stack(id);
        self.monitors[target].sel = Some(id);

        self.focus(None);
        self.arrange(None);
    }

    /// Resolves a monitor direction against the selected monitor.
    ///
    /// Directional lookups pick the nearest monitor along the axis,
    /// wrapping to the farthest one on the other side at the edge.
    pub fn monitor_in_dir(&self, dir: MonitorDir) -> usize {
        let sel = self.selmon_idx();

        if let MonitorDir::Previous = dir {
            return self
                .prev_monitor
                .and_then(|num| self.mon_idx_by_num(num))
                .unwrap_or_else(|| self.monitor_in_dir(MonitorDir::Right));
        }

        let (vertical, sign) = match dir {
            MonitorDir::Right => (false, 1),
            MonitorDir::Left => (false, -1),
            MonitorDir::Above => (true, 1),
            MonitorDir::Below => (true, -1),
            MonitorDir::Previous => unreachable!(),
        };

        let origin = self.monitors[sel].geometry();
        let mut nearest = sel;
        let mut faraway = sel;
        let (mut min_pos, mut min_neg) = (0, 0);

        for (i, mon) in self.monitors.iter().enumerate() {
            let geom = mon.geometry();
            let d = sign
                * if vertical {
                    geom.y - origin.y
                } else {
                    geom.x - origin.x
                };

            if d > 0 && (min_pos == 0 || d < min_pos) {
                min_pos = d;
                nearest = i;
            } else if d < 0 && (min_neg == 0 || d < min_neg) {
                min_neg = d;
                faraway = i;
            }
        }

        if nearest == sel {
            faraway
        } else {
            nearest
        }
    }

    //* ------- fullscreen -------

    /// Puts a client into or takes it out of fullscreen.
    pub(crate) fn set_fullscreen(&mut self, id: XWindowID, fullscreen: bool) {
        let Some((midx, _)) = self.locate(id) else {
            return;
        };
        let already = self.monitors[midx]
            .clients
            .lookup(id)
            .map_or(false, |c| c.is_fullscreen);

        if fullscreen && !already {
            self.check(self.conn.set_property(
                id,
                Atom::NetWmState.as_ref(),
                Property::Atom(vec![Atom::NetWmStateFullscreen.as_ref().to_string()]),
            ));
            let mgeom = self.monitors[midx].geometry();
            {
                let client = self.monitors[midx].clients.lookup_mut(id).unwrap();
                client.is_fullscreen = true;
                client.prev_floating = client.is_floating;
                client.prev_border_width = client.border_width;
                client.border_width = 0;
                client.is_floating = true;
            }
            self.resize_client(id, mgeom);
            self.check(
                self.conn
                    .configure_window(id, &[ClientConfig::StackingMode(StackMode::Above(None))]),
            );
        } else if !fullscreen && already {
            self.check(self.conn.set_property(
                id,
                Atom::NetWmState.as_ref(),
                Property::Atom(Vec::new()),
            ));
            let restored = {
                let client = self.monitors[midx].clients.lookup_mut(id).unwrap();
                client.is_fullscreen = false;
                client.is_floating = client.prev_floating;
                client.border_width = client.prev_border_width;
                client.prev_geom
            };
            self.resize_client(id, restored);
            if let Some(client) = self.monitors[midx].clients.lookup_mut(id) {
                client.prev_geom = restored;
            }
            self.arrange(Some(midx));
        }
    }

    //* ------- input plumbing -------

    /// Grabs all bound keys on the root window.
    pub(crate) fn grab_keys(&self) {
        self.check(self.conn.ungrab_keys(self.root.id));
        for kb in self.keybinds.keys() {
            self.check(self.conn.grab_key(*kb, self.root.id));
        }
    }

    /// Installs the button grabs appropriate to a client's focus state:
    /// bound buttons when focused, every button when not (so the first
    /// click focuses).
    fn grab_buttons(&self, id: XWindowID, focused: bool) {
        self.check(self.conn.ungrab_buttons(id));
        if focused {
            for mb in self.mousebinds.keys() {
                self.check(self.conn.grab_button(*mb, id, false));
            }
        } else {
            self.check(self.conn.grab_all_buttons(id));
        }
    }

    //* ------- bar -------

    fn draw_bar(&mut self, midx: usize) {
        if let Some(hook) = self.bar_hook.as_mut() {
            (hook)(&self.conn, &self.monitors[midx], &self.config);
        }
    }

    fn draw_bars(&mut self) {
        for i in 0..self.monitors.len() {
            self.draw_bar(i);
        }
    }

    /// Rewrites `_NET_CLIENT_LIST` from the managed clients.
    fn update_client_list(&self) {
        self.check(
            self.conn
                .delete_property(self.root.id, Atom::NetClientList.as_ref()),
        );
        for mon in self.monitors.iter() {
            for client in mon.clients.iter() {
                self.check(self.conn.append_property(
                    self.root.id,
                    Atom::NetClientList.as_ref(),
                    Property::Window(vec![client.id()]),
                ));
            }
        }
    }

    //* ------- teardown -------

    /// Releases every managed window and the resources owned by the
    /// manager.
    fn cleanup(&mut self) {
        debug!("cleaning up");

        // make everything visible so state restoration is observable
        let tag_mask = self.config.tag_mask();
        for i in 0..self.monitors.len() {
            let mon = &mut self.monitors[i];
            mon.tagset[mon.seltags] = tag_mask;
        }

        for i in 0..self.monitors.len() {
            while let Some(id) = self.monitors[i].stack.first().copied() {
                self.unmanage(id, false);
            }
        }

        self.check(self.conn.ungrab_keys(self.root.id));
        for i in 0..self.monitors.len() {
            let bar = self.monitors[i].bar_win;
            if bar != 0 {
                let _ = self.conn.unmap_window(bar);
                let _ = self.conn.destroy_window(bar);
                self.monitors[i].bar_win = 0;
            }
        }
        if self.config.barriers() {
            let _ = self.conn.destroy_pointer_barriers();
        }
        self.check(self.conn.set_input_focus(self.root.id));
        self.check(
            self.conn
                .delete_property(self.root.id, Atom::NetActiveWindow.as_ref()),
        );
        self.check(self.conn.sync());
    }
}

#[cfg(test)]
mod tests;
