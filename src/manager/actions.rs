//! The user-facing action layer.
//!
//! Every operation a binding can invoke lives here, as methods on
//! [`WindowManager`]. [`run_action`](WindowManager::run_action)
//! dispatches an [`Action`] to the matching method; each method is also
//! public API, so embedders can call them directly.

use tracing::{debug, warn};

use crate::bindings::Action;
use crate::core::types::{ClientConfig, Direction, Geometry, MonitorDir, Point};
use crate::manager::{RuntimeConfig, WindowManager};
use crate::util;
use crate::x::atom::Atom;
use crate::x::core::{XConn, XWindowID};
use crate::x::cursor::CursorKind;
use crate::x::event::XEvent;

impl<X, C> WindowManager<X, C>
where
    X: XConn,
    C: RuntimeConfig,
{
    /// Runs a bound action.
    pub fn run_action(&mut self, action: Action) {
        use Action::*;

        match action {
            Spawn(cmd) => self.spawn(&cmd),
            ToggleBar => self.toggle_bar(),
            FocusStack(dir) => self.focus_stack(dir),
            SwapFocus => self.swap_focus(),
            MoveStack(dir) => self.move_stack(dir),
            IncNMaster(n) => self.inc_nmaster(n),
            SetMfact(f) => self.set_mfact(f),
            IncGap(n) => self.inc_gap(n),
            View(mask) => self.view(mask),
            ToggleView(mask) => self.toggle_view(mask),
            Tag(mask) => self.tag(mask),
            ToggleTag(mask) => self.toggle_tag(mask),
            KillClient => self.kill_client(),
            SetLayout(idx) => self.set_layout(idx),
            ToggleFloating => self.toggle_floating(),
            ToggleFullscreen => self.toggle_fullscreen(),
            FocusMonitor(dir) => self.focus_monitor(dir, false),
            FocusMonitorWarp(dir) => self.focus_monitor(dir, true),
            TagMonitor(dir) => self.tag_monitor(dir),
            MoveMouse => self.drag_move(),
            ResizeMouse => self.drag_resize(),
            Quit => self.quit(),
        }
    }

    //* ------- tag-set operations -------

    /// Switches the view to the given tag mask.
    ///
    /// A mask of zero flips back to the previously viewed tag-set; the
    /// two-slot history makes `view` its own inverse.
    pub fn view(&mut self, mask: u32) {
        let tag_mask = self.config.tag_mask();
        let midx = self.monitors.focused_idx().unwrap_or(0);

        {
            let mon = &mut self.monitors[midx];
            if mask & tag_mask == mon.tagset[mon.seltags] {
                return;
            }
            mon.seltags ^= 1;
            if mask & tag_mask != 0 {
                let slot = mon.seltags;
                mon.tagset[slot] = mask & tag_mask;
            }
        }
        self.focus(None);
        self.arrange(Some(midx));
    }

    /// XORs the given mask into the viewed tag-set, if the result still
    /// shows something.
    pub fn toggle_view(&mut self, mask: u32) {
        let tag_mask = self.config.tag_mask();
        let midx = self.monitors.focused_idx().unwrap_or(0);

        let applied = {
            let mon = &mut self.monitors[midx];
            let new = mon.tagset[mon.seltags] ^ (mask & tag_mask);
            if new != 0 {
                let slot = mon.seltags;
                mon.tagset[slot] = new;
                true
            } else {
                false
            }
        };
        if applied {
            self.focus(None);
            self.arrange(Some(midx));
        }
    }

    /// Retags the selected client.
    pub fn tag(&mut self, mask: u32) {
        let tag_mask = self.config.tag_mask();
        let midx = self.monitors.focused_idx().unwrap_or(0);
        let Some(sel) = self.monitors[midx].sel else {
            return;
        };

        if mask & tag_mask != 0 {
            if let Some(client) = self.monitors[midx].clients.lookup_mut(sel) {
                client.tags = mask & tag_mask;
            }
            self.focus(None);
            self.arrange(Some(midx));
        }
    }

    /// XORs the given mask into the selected client's tags, if the
    /// result is nonempty.
    pub fn toggle_tag(&mut self, mask: u32) {
        let tag_mask = self.config.tag_mask();
        let midx = self.monitors.focused_idx().unwrap_or(0);
        let Some(sel) = self.monitors[midx].sel else {
            return;
        };

        let applied = {
            let Some(client) = self.monitors[midx].clients.lookup_mut(sel) else {
                return;
            };
            let new = client.tags ^ (mask & tag_mask);
            if new != 0 {
                client.tags = new;
                true
            } else {
                false
            }
        };
        if applied {
            self.focus(None);
            self.arrange(Some(midx));
        }
    }

    //* ------- focus operations -------

    /// Moves focus along the visible clients of the selected monitor,
    /// wrapping at the ends.
    pub fn focus_stack(&mut self, dir: Direction) {
        let midx = self.monitors.focused_idx().unwrap_or(0);
        let Some(sel) = self.monitors[midx].sel else {
            return;
        };

        if let Some(next) = self.monitors[midx].next_visible_from(sel, dir) {
            self.focus(Some(next));
            self.restack(midx);
        }
    }

    /// Refocuses the previously focused client, if it is still around.
    pub fn swap_focus(&mut self) {
        let midx = self.monitors.focused_idx().unwrap_or(0);
        let Some(prev) = self.prev_client else {
            return;
        };

        if self.monitors[midx].clients.contains(prev) {
            self.focus(Some(prev));
            self.restack(midx);
        }
    }

    /// Swaps the selected client with its next or previous visible
    /// tiled neighbor in the client list. The focus stack is untouched.
    pub fn move_stack(&mut self, dir: Direction) {
        let midx = self.monitors.focused_idx().unwrap_or(0);
        let Some(sel) = self.monitors[midx].sel else {
            return;
        };

        if let Some(other) = self.monitors[midx].next_tiled_from(sel, dir) {
            if other != sel {
                self.monitors[midx].swap_clients(sel, other);
                self.arrange(Some(midx));
            }
        }
    }

    //* ------- layout parameters -------

    /// Adjusts the configured master count, floored at zero (zero means
    /// the dynamic count).
    pub fn inc_nmaster(&mut self, n: i32) {
        let midx = self.monitors.focused_idx().unwrap_or(0);
        let mon = &mut self.monitors[midx];
        mon.nmaster = (mon.nmaster as i32 + n).max(0) as u32;
        self.arrange(Some(midx));
    }

    /// Adjusts the master area factor: relative for magnitudes below
    /// 1.0, absolute (minus 1.0) otherwise. Out-of-range results are
    /// discarded.
    pub fn set_mfact(&mut self, f: f32) {
        let midx = self.monitors.focused_idx().unwrap_or(0);
        if self.config.layouts()[self.monitors[midx].lt_idx].is_floating() {
            return;
        }

        let new = if f.abs() < 1.0 {
            self.monitors[midx].mfact + f
        } else {
            f - 1.0
        };
        if !(0.05..=0.95).contains(&new) {
            return;
        }
        self.monitors[midx].mfact = new;
        self.arrange(Some(midx));
    }

    /// Adjusts the gap around tiled windows, floored at zero. The gap
    /// is global, so every monitor is rearranged.
    pub fn inc_gap(&mut self, n: i32) {
        self.gap_px = (self.gap_px + n).max(0);
        self.arrange(None);
    }

    /// Switches the selected monitor to the layout at the given index
    /// in the layout table.
    pub fn set_layout(&mut self, idx: usize) {
        let layouts = self.config.layouts();
        if idx >= layouts.len() {
            warn!("no layout at index {}", idx);
            return;
        }
        let symbol = layouts[idx].symbol.to_string();
        let midx = self.monitors.focused_idx().unwrap_or(0);

        {
            let mon = &mut self.monitors[midx];
            mon.lt_idx = idx;
            mon.ltsymbol = symbol;
        }
        if self.monitors[midx].sel.is_some() {
            self.arrange(Some(midx));
        } else {
            self.draw_bar(midx);
        }
    }

    //* ------- client operations -------

    /// Toggles the selected client between tiled and floating.
    /// Fullscreen clients stay put.
    pub fn toggle_floating(&mut self) {
        let midx = self.monitors.focused_idx().unwrap_or(0);
        let Some(sel) = self.monitors[midx].sel else {
            return;
        };

        let (floats_now, geom) = {
            let Some(client) = self.monitors[midx].clients.lookup_mut(sel) else {
                return;
            };
            if client.is_fullscreen {
                return;
            }
            client.is_floating = !client.is_floating || client.is_fixed;
            (client.is_floating, client.geometry())
        };

        if floats_now {
            self.resize(sel, geom, false);
        }
        self.arrange(Some(midx));
    }

    /// Toggles the selected client's fullscreen state.
    pub fn toggle_fullscreen(&mut self) {
        let midx = self.monitors.focused_idx().unwrap_or(0);
        let Some(sel) = self.monitors[midx].sel else {
            return;
        };
        let fullscreen = self.monitors[midx]
            .clients
            .lookup(sel)
            .map_or(false, |c| c.is_fullscreen);

        self.set_fullscreen(sel, !fullscreen);
    }

    /// Asks the selected client to close via `WM_DELETE_WINDOW`, or
    /// disconnects it outright if it does not participate.
    pub fn kill_client(&mut self) {
        let midx = self.monitors.focused_idx().unwrap_or(0);
        let Some(sel) = self.monitors[midx].sel else {
            return;
        };

        if !self.send_protocol(sel, Atom::WmDeleteWindow) {
            debug!("client {} does not speak WM_DELETE_WINDOW, killing", sel);
            let guard = super::ServerGrab::acquire(&self.conn);
            let _ = self.conn.kill_client(sel);
            drop(guard);
        }
    }

    //* ------- bar -------

    /// Shows or hides the bar on the selected monitor.
    pub fn toggle_bar(&mut self) {
        let bar_h = self.config.bar_height();
        let midx = self.monitors.focused_idx().unwrap_or(0);

        if self.config.barriers() {
            let _ = self.conn.destroy_pointer_barriers();
        }

        let (bar_win, rect) = {
            let mon = &mut self.monitors[midx];
            mon.show_bar = !mon.show_bar;
            mon.update_bar_pos(bar_h);
            (mon.bar_win, mon.bar_rect(bar_h))
        };
        if bar_win != 0 {
            let _ = self.conn.configure_window(
                bar_win,
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
            );
        }
        self.arrange(Some(midx));

        if self.config.barriers() {
            let rects: Vec<Geometry> = self.monitors.iter().map(|m| m.work_area()).collect();
            let _ = self.conn.create_pointer_barriers(&rects);
        }
    }

    //* ------- monitor operations -------

    /// Focuses the monitor in the given direction. With `warp`, the
    /// pointer follows, returning to where it last was on that monitor.
    pub fn focus_monitor(&mut self, dir: MonitorDir, warp: bool) {
        if self.monitors.len() < 2 {
            return;
        }
        let midx = self.monitors.focused_idx().unwrap_or(0);
        let target = self.monitor_in_dir(dir);
        if target == midx {
            return;
        }

        if let Some(sel) = self.monitors[midx].sel {
            // giving up input focus here breaks focus handoff in some
            // editors, so keep it until the new monitor takes over
            self.unfocus(sel, false);
        }

        if warp {
            if let Ok(reply) = self.conn.query_pointer(self.root.id) {
                let mon = &mut self.monitors[midx];
                mon.lmx = reply.root_x;
                mon.lmy = reply.root_y;
            }
        }

        let old_num = self.monitors[midx].num;
        self.prev_monitor = Some(old_num);
        self.monitors.set_focused(target);
        self.focus(None);

        if warp {
            let (x, y) = (self.monitors[target].lmx, self.monitors[target].lmy);
            let _ = self.conn.warp_pointer(None, x, y);
        }
    }

    /// Sends the selected client to the monitor in the given direction.
    pub fn tag_monitor(&mut self, dir: MonitorDir) {
        if self.monitors.len() < 2 {
            return;
        }
        let midx = self.monitors.focused_idx().unwrap_or(0);
        let Some(sel) = self.monitors[midx].sel else {
            return;
        };
        let target = self.monitor_in_dir(dir);
        self.send_to_monitor(sel, target);
    }

    //* ------- mouse drags -------

    /// Grabs the pointer and moves the selected client with it until
    /// the button is released.
    ///
    /// Runs a nested event pump: only configure requests, exposes, map
    /// requests and motion are serviced while the drag is in progress.
    pub fn drag_move(&mut self) {
        let midx = self.monitors.focused_idx().unwrap_or(0);
        let Some(sel) = self.monitors[midx].sel else {
            return;
        };
        if self
            .state()
            .lookup_client(sel)
            .map_or(true, |c| c.is_fullscreen)
        {
            return;
        }
        self.restack(midx);

        let origin = self
            .state()
            .lookup_client(sel)
            .map(|c| c.geometry())
            .unwrap();
        let root = self.root.id;

        if self.conn.grab_pointer(root, CursorKind::Move).is_err() {
            return;
        }
        let Ok(start) = self.conn.query_pointer(root) else {
            let _ = self.conn.ungrab_pointer();
            return;
        };
        let start = Point::new(start.root_x, start.root_y);

        loop {
            let event = match self.conn.poll_next_event() {
                Ok(Some(ev)) => ev,
                _ => break,
            };
            match event {
                XEvent::ConfigureRequest(_) | XEvent::Expose(_) | XEvent::MapRequest(..) => {
                    self.handle_event(event)
                }
                XEvent::MotionNotify(ev) => {
                    let (dx, dy) = ev.location.offset_from(start);
                    let snap = self.config.snap();
                    let work = self.monitors[midx].work_area();

                    let Some(client) = self.state().lookup_client(sel) else {
                        break;
                    };
                    let (cw, ch) = (client.width(), client.height());
                    let was_floating = client.is_floating;
                    let geom = client.geometry();

                    let mut nx = origin.x + dx;
                    let mut ny = origin.y + dy;

                    if nx >= work.x
                        && nx <= work.x + work.width
                        && ny >= work.y
                        && ny <= work.y + work.height
                    {
                        // snap to the work area edges
                        if (work.x - nx).abs() < snap {
                            nx = work.x;
                        } else if ((work.x + work.width) - (nx + cw)).abs() < snap {
                            nx = work.x + work.width - cw;
                        }
                        if (work.y - ny).abs() < snap {
                            ny = work.y;
                        } else if ((work.y + work.height) - (ny + ch)).abs() < snap {
                            ny = work.y + work.height - ch;
                        }
                        if !was_floating
                            && !self.config.layouts()[self.monitors[midx].lt_idx].is_floating()
                            && ((nx - geom.x).abs() > snap || (ny - geom.y).abs() > snap)
                        {
                            self.toggle_floating();
                        }
                    }

                    let floating_now = self
                        .state()
                        .lookup_client(sel)
                        .map_or(false, |c| c.is_floating);
                    if self.config.layouts()[self.monitors[midx].lt_idx].is_floating()
                        || floating_now
                    {
                        let geom = self.state().lookup_client(sel).unwrap().geometry();
                        self.resize(
                            sel,
                            Geometry::new(nx, ny, geom.height, geom.width),
                            true,
                        );
                    }
                }
                XEvent::ButtonRelease(_) => break,
                _ => {}
            }
        }
        let _ = self.conn.ungrab_pointer();

        self.finish_drag(sel, midx);
    }

    /// Grabs the pointer and resizes the selected client with it until
    /// the button is released.
    pub fn drag_resize(&mut self) {
        let midx = self.monitors.focused_idx().unwrap_or(0);
        let Some(sel) = self.monitors[midx].sel else {
            return;
        };
        if self
            .state()
            .lookup_client(sel)
            .map_or(true, |c| c.is_fullscreen)
        {
            return;
        }
        self.restack(midx);

        let (origin, bw) = {
            let client = self.state().lookup_client(sel).unwrap();
            (client.geometry(), client.border_width() as i32)
        };
        let root = self.root.id;

        if self.conn.grab_pointer(root, CursorKind::Resize).is_err() {
            return;
        }
        // park the pointer on the bottom-right corner
        let _ = self
            .conn
            .warp_pointer(Some(sel), origin.width + bw - 1, origin.height + bw - 1);

        loop {
            let event = match self.conn.poll_next_event() {
                Ok(Some(ev)) => ev,
                _ => break,
            };
            match event {
                XEvent::ConfigureRequest(_) | XEvent::Expose(_) | XEvent::MapRequest(..) => {
                    self.handle_event(event)
                }
                XEvent::MotionNotify(ev) => {
                    let snap = self.config.snap();
                    let work = self.monitors[midx].work_area();

                    let nw = (ev.location.x - origin.x - 2 * bw + 1).max(1);
                    let nh = (ev.location.y - origin.y - 2 * bw + 1).max(1);

                    let Some(client) = self.state().lookup_client(sel) else {
                        break;
                    };
                    let was_floating = client.is_floating;
                    let geom = client.geometry();

                    if nw <= work.width
                        && nh <= work.height
                        && !was_floating
                        && !self.config.layouts()[self.monitors[midx].lt_idx].is_floating()
                        && ((nw - geom.width).abs() > snap || (nh - geom.height).abs() > snap)
                    {
                        self.toggle_floating();
                    }

                    let floating_now = self
                        .state()
                        .lookup_client(sel)
                        .map_or(false, |c| c.is_floating);
                    if self.config.layouts()[self.monitors[midx].lt_idx].is_floating()
                        || floating_now
                    {
                        let geom = self.state().lookup_client(sel).unwrap().geometry();
                        self.resize(sel, Geometry::new(geom.x, geom.y, nh, nw), true);
                    }
                }
                XEvent::ButtonRelease(_) => break,
                _ => {}
            }
        }
        let _ = self
            .conn
            .warp_pointer(Some(sel), origin.width + bw - 1, origin.height + bw - 1);
        let _ = self.conn.ungrab_pointer();
        self.conn.drop_pending_crossings();

        self.finish_drag(sel, midx);
    }

    /// After a drag, hand the client over if it now rests on another
    /// monitor.
    fn finish_drag(&mut self, sel: XWindowID, midx: usize) {
        let Some(geom) = self.state().lookup_client(sel).map(|c| c.geometry()) else {
            return;
        };
        let target = self.rect_to_mon(geom);
        if target != midx {
            self.send_to_monitor(sel, target);
            self.monitors.set_focused(target);
            self.focus(None);
        }
    }

    //* ------- process control -------

    /// Runs an external command, detached from the window manager.
    pub fn spawn(&mut self, cmd: &[String]) {
        if let Err(e) = util::spawn(cmd) {
            warn!("could not spawn {:?}: {}", cmd, e);
        }
    }

    /// Ends the event loop after the current dispatch.
    pub fn quit(&mut self) {
        debug!("quit requested");
        self.running = false;
    }
}
