//! This module exports `Monitor`, the per-screen record.
//!
//! A monitor owns its clients twice over: the `ClientRing` holds them
//! in attachment order (which is also the order tiled layouts place
//! them in), and `stack` holds their IDs in focus order, most recently
//! focused first. Every mutation keeps the two in lockstep; the
//! invariant checks in [`WmState`](crate::manager::WmState) assert it.

use tracing::trace;

use crate::core::types::{Direction, Geometry};
use crate::core::window::{Client, ClientRing};
use crate::manager::RuntimeConfig;
use crate::x::core::XWindowID;

/// A physical monitor and the window management state attached to it.
#[derive(Debug, Clone)]
pub struct Monitor {
    pub(crate) num: i32,
    pub(crate) ltsymbol: String,
    pub(crate) mfact: f32,
    pub(crate) nmaster: u32,
    pub(crate) nmaster_dynamic_max: u32,
    geom: Geometry,
    work: Geometry,
    pub(crate) bar_y: i32,
    pub(crate) show_bar: bool,
    pub(crate) top_bar: bool,
    pub(crate) seltags: usize,
    pub(crate) tagset: [u32; 2],
    pub(crate) lt_idx: usize,
    /// Last known pointer position on this monitor, used to restore the
    /// pointer when focus warps back here.
    pub(crate) lmx: i32,
    pub(crate) lmy: i32,
    pub(crate) clients: ClientRing,
    pub(crate) stack: Vec<XWindowID>,
    pub(crate) sel: Option<XWindowID>,
    pub(crate) bar_win: XWindowID,
}

impl Monitor {
    /// Creates a new monitor with the given index and starting tag-set.
    ///
    /// Its geometry is zeroed until the first geometry update assigns
    /// it a screen.
    pub fn new(num: i32, tags: u32, cfg: &dyn RuntimeConfig) -> Self {
        Self {
            num,
            ltsymbol: cfg.layouts()[0].symbol.to_string(),
            mfact: cfg.mfact(),
            nmaster: cfg.nmaster(),
            nmaster_dynamic_max: cfg.nmaster_dynamic_max(),
            geom: Geometry::zeroed(),
            work: Geometry::zeroed(),
            bar_y: 0,
            show_bar: cfg.show_bar(),
            top_bar: cfg.top_bar(),
            seltags: 0,
            tagset: [tags, tags],
            lt_idx: 0,
            lmx: 0,
            lmy: 0,
            clients: ClientRing::new(),
            stack: Vec::new(),
            sel: None,
            bar_win: 0,
        }
    }

    /// The index of this monitor.
    #[inline(always)]
    pub fn num(&self) -> i32 {
        self.num
    }

    /// The full screen rectangle of the monitor.
    #[inline(always)]
    pub fn geometry(&self) -> Geometry {
        self.geom
    }

    /// The work area: the screen rectangle minus the bar.
    #[inline(always)]
    pub fn work_area(&self) -> Geometry {
        self.work
    }

    /// The rectangle the bar window occupies.
    pub fn bar_rect(&self, bar_h: i32) -> Geometry {
        Geometry::new(self.work.x, self.bar_y, bar_h, self.work.width)
    }

    /// The symbol of the layout in effect, as shown in the bar.
    #[inline(always)]
    pub fn layout_symbol(&self) -> &str {
        &self.ltsymbol
    }

    /// The currently active tag-set.
    #[inline(always)]
    pub fn tag_mask(&self) -> u32 {
        self.tagset[self.seltags]
    }

    /// The ID of the selected client, if any.
    #[inline(always)]
    pub fn selected(&self) -> Option<XWindowID> {
        self.sel
    }

    /// Whether the given client is shown under the active tag-set.
    #[inline(always)]
    pub fn is_visible(&self, client: &Client) -> bool {
        client.tags & self.tag_mask() != 0
    }

    /// Whether the client with the given ID is shown; false if the ID
    /// is not on this monitor at all.
    pub fn is_visible_id(&self, id: XWindowID) -> bool {
        self.clients.lookup(id).map_or(false, |c| self.is_visible(c))
    }

    /// The number of clients shown under the active tag-set.
    pub fn visible_count(&self) -> usize {
        self.clients.iter().filter(|c| self.is_visible(c)).count()
    }

    /// The IDs of all visible tiled clients, in attachment order.
    pub fn tiled_ids(&self) -> Vec<XWindowID> {
        self.clients
            .iter()
            .filter(|c| c.is_tiled() && self.is_visible(c))
            .map(|c| c.id())
            .collect()
    }

    /// Assigns a new screen rectangle, resetting the work area to the
    /// full screen. `update_bar_pos` carves the bar back out.
    pub fn set_geometry(&mut self, geom: Geometry) {
        self.geom = geom;
        self.work = geom;
        self.lmx = geom.x + geom.width / 2;
        self.lmy = geom.y + geom.height / 2;
    }

    /// Recomputes the work area and bar position from the bar flags.
    pub fn update_bar_pos(&mut self, bar_h: i32) {
        self.work.y = self.geom.y;
        self.work.height = self.geom.height;
        if self.show_bar {
            self.work.height -= bar_h;
            if self.top_bar {
                self.bar_y = self.work.y;
                self.work.y += bar_h;
            } else {
                self.bar_y = self.work.y + self.work.height;
            }
        } else {
            self.bar_y = -bar_h;
        }
    }

    /// Attaches a client at the head of the client list.
    pub fn attach(&mut self, client: Client) {
        trace!("attaching client {} to monitor {}", client.id(), self.num);
        self.clients.push(client);
    }

    /// Detaches and returns the client with the given ID.
    pub fn detach(&mut self, id: XWindowID) -> Option<Client> {
        self.clients.remove_by_id(id)
    }

    /// Pushes a client ID onto the head of the focus stack.
    pub fn attach_stack(&mut self, id: XWindowID) {
        self.stack.insert(0, id);
    }

    /// Removes a client ID from the focus stack.
    ///
    /// If it was the selected client, selection falls back to the most
    /// recently focused client still visible.
    pub fn detach_stack(&mut self, id: XWindowID) {
        self.stack.retain(|&w| w != id);

        if self.sel == Some(id) {
            self.sel = self.first_visible_in_stack();
        }
    }

    /// The most recently focused client that is visible, if any.
    pub fn first_visible_in_stack(&self) -> Option<XWindowID> {
        self.stack
            .iter()
            .copied()
            .find(|&id| self.is_visible_id(id))
    }

    /// The next visible client relative to `id` in client-list order,
    /// wrapping at the ends. Returns `id` itself if it is the only
    /// visible client.
    pub fn next_visible_from(&self, id: XWindowID, dir: Direction) -> Option<XWindowID> {
        self.neighbor_matching(id, dir, |c| self.is_visible(c))
    }

    /// The next visible *tiled* client relative to `id`, wrapping. Used
    /// by the move-stack operation.
    pub fn next_tiled_from(&self, id: XWindowID, dir: Direction) -> Option<XWindowID> {
        self.neighbor_matching(id, dir, |c| c.is_tiled() && self.is_visible(c))
    }

    fn neighbor_matching(
        &self,
        id: XWindowID,
        dir: Direction,
        pred: impl Fn(&Client) -> bool,
    ) -> Option<XWindowID> {
        let anchor = self.clients.get_idx(id)?;
        let matches: Vec<(usize, XWindowID)> = self
            .clients
            .iter()
            .enumerate()
            .filter(|(_, c)| pred(c))
            .map(|(i, c)| (i, c.id()))
            .collect();

        if matches.is_empty() {
            return None;
        }

        match dir {
            Direction::Forward => matches
                .iter()
                .find(|(i, _)| *i > anchor)
                .or_else(|| matches.first())
                .map(|(_, id)| *id),
            Direction::Backward => matches
                .iter()
                .rev()
                .find(|(i, _)| *i < anchor)
                .or_else(|| matches.last())
                .map(|(_, id)| *id),
        }
    }

    /// Swaps the positions of two clients in the client list. The focus
    /// stack is untouched.
    pub fn swap_clients(&mut self, a: XWindowID, b: XWindowID) {
        if let (Some(ia), Some(ib)) = (self.clients.get_idx(a), self.clients.get_idx(b)) {
            self.clients.swap(ia, ib);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::Config;

    fn monitor_with(ids_and_tags: &[(XWindowID, u32)]) -> Monitor {
        let config = Config::default().into_runtime();
        let mut mon = Monitor::new(0, 1, &config);
        mon.set_geometry(Geometry::new(0, 0, 1080, 1920));
        mon.update_bar_pos(20);

        // attach in reverse so the slice reads in client-list order
        for &(id, tags) in ids_and_tags.iter().rev() {
            let mut client = Client::new(id, Geometry::default(), 1);
            client.tags = tags;
            mon.attach(client);
            mon.attach_stack(id);
        }
        mon
    }

    #[test]
    fn bar_is_carved_out_of_the_work_area() {
        let mon = monitor_with(&[]);

        assert_eq!(mon.geometry().height, 1080);
        assert_eq!(mon.work_area().height, 1060);
        assert_eq!(mon.work_area().y, 20);
        assert_eq!(mon.bar_y, 0);
    }

    #[test]
    fn detach_stack_reselects_a_visible_client() {
        let mut mon = monitor_with(&[(10, 1), (11, 2), (12, 1)]);
        mon.sel = Some(10);

        mon.detach_stack(10);
        // 11 is next in the stack but on tag 2; selection skips to 12
        assert_eq!(mon.sel, Some(12));
    }

    #[test]
    fn next_visible_skips_hidden_and_wraps() {
        let mon = monitor_with(&[(10, 1), (11, 2), (12, 1), (13, 4)]);

        assert_eq!(mon.next_visible_from(10, Direction::Forward), Some(12));
        assert_eq!(mon.next_visible_from(12, Direction::Forward), Some(10));
        assert_eq!(mon.next_visible_from(10, Direction::Backward), Some(12));
    }

    #[test]
    fn next_tiled_ignores_floating_clients() {
        let mut mon = monitor_with(&[(10, 1), (11, 1), (12, 1)]);
        mon.clients.lookup_mut(11).unwrap().is_floating = true;

        assert_eq!(mon.next_tiled_from(10, Direction::Forward), Some(12));
        assert_eq!(mon.tiled_ids(), vec![10, 12]);
    }

    #[test]
    fn swap_preserves_stack_order() {
        let mut mon = monitor_with(&[(10, 1), (11, 1)]);
        let stack_before = mon.stack.clone();

        mon.swap_clients(10, 11);

        let order: Vec<_> = mon.clients.iter().map(|c| c.id()).collect();
        assert_eq!(order, vec![11, 10]);
        assert_eq!(mon.stack, stack_before);
    }
}
