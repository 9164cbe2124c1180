//! This module exports `Client` and `ClientRing`, the per-window record
//! and the ordered collection a monitor keeps them in.

use tracing::{error, trace};

use super::ring::{Ring, Selector};
use crate::core::types::{ClientAttrs, Color, Geometry};
use crate::x::{
    core::{XConn, XWindow, XWindowID},
    property::WmSizeHints,
};

/// A Ring of type Client.
///
/// The ring order is the attachment order: newly managed clients sit at
/// the head, which is also where the tiling layouts start placing
/// windows.
pub type ClientRing = Ring<Client>;

impl ClientRing {
    /// Wrapper around `Ring::remove` that takes a window ID instead of
    /// an index.
    pub fn remove_by_id(&mut self, id: XWindowID) -> Option<Client> {
        let i = self.get_idx(id)?;

        self.remove(i)
    }

    /// Wrapper around `Ring::index` that takes a window ID.
    pub fn get_idx(&self, id: XWindowID) -> Option<usize> {
        self.index(Selector::Condition(&|win| win.id() == id))
    }

    /// Returns a reference to the client with the given window ID.
    pub fn lookup(&self, id: XWindowID) -> Option<&Client> {
        self.get_idx(id).and_then(|i| self.get(i))
    }

    /// Returns a mutable reference to the client with the given ID.
    pub fn lookup_mut(&mut self, id: XWindowID) -> Option<&mut Client> {
        if let Some(i) = self.get_idx(id) {
            self.get_mut(i)
        } else {
            None
        }
    }

    /// Tests whether the Ring contains a client with the given ID.
    pub fn contains(&self, id: XWindowID) -> bool {
        self.get_idx(id).is_some()
    }
}

/// The cached ICCCM size constraints of a client, in the decomposed
/// form the resize path consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SizeHintCache {
    pub base_w: i32,
    pub base_h: i32,
    pub inc_w: i32,
    pub inc_h: i32,
    pub max_w: i32,
    pub max_h: i32,
    pub min_w: i32,
    pub min_h: i32,
    /// Minimum height/width ratio. Zero when unconstrained.
    pub min_aspect: f32,
    /// Maximum width/height ratio. Zero when unconstrained.
    pub max_aspect: f32,
}

impl SizeHintCache {
    /// Decomposes a WM_NORMAL_HINTS property, filling defaulted fields
    /// the way ICCCM says to (base falls back to min and vice versa).
    fn from_hints(hints: Option<WmSizeHints>) -> Self {
        let mut cache = SizeHintCache::default();
        let Some(hints) = hints else {
            return cache;
        };

        match (hints.base_size, hints.min_size) {
            (Some((w, h)), _) => {
                cache.base_w = w;
                cache.base_h = h;
            }
            (None, Some((w, h))) => {
                cache.base_w = w;
                cache.base_h = h;
            }
            (None, None) => {}
        }

        if let Some((w, h)) = hints.resize_inc {
            cache.inc_w = w;
            cache.inc_h = h;
        }

        if let Some((w, h)) = hints.max_size {
            cache.max_w = w;
            cache.max_h = h;
        }

        match (hints.min_size, hints.base_size) {
            (Some((w, h)), _) => {
                cache.min_w = w;
                cache.min_h = h;
            }
            (None, Some((w, h))) => {
                cache.min_w = w;
                cache.min_h = h;
            }
            (None, None) => {}
        }

        if let Some((x, y)) = hints.min_aspect {
            if x > 0 {
                cache.min_aspect = y as f32 / x as f32;
            }
        }
        if let Some((x, y)) = hints.max_aspect {
            if y > 0 {
                cache.max_aspect = x as f32 / y as f32;
            }
        }

        cache
    }

    /// Whether the hints pin the client to a single size.
    fn is_fixed(&self) -> bool {
        self.max_w > 0
            && self.min_w > 0
            && self.max_h > 0
            && self.min_h > 0
            && self.max_w == self.min_w
            && self.max_h == self.min_h
    }
}

/// A managed top-level window.
///
/// Holds the data mirrored from the X server (title, class, hints) and
/// the manager-side state (tags, floating/fullscreen flags, previous
/// geometry for restores).
///
/// Clients are owned by their monitor's `ClientRing` and referenced
/// elsewhere by window ID.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) xwindow: XWindow,
    name: String,
    class: (String, String),

    pub(crate) tags: u32,
    pub(crate) border_width: u32,
    pub(crate) prev_border_width: u32,
    pub(crate) prev_geom: Geometry,
    pub(crate) hints: SizeHintCache,

    pub(crate) is_fixed: bool,
    pub(crate) is_floating: bool,
    pub(crate) is_urgent: bool,
    pub(crate) never_focus: bool,
    pub(crate) prev_floating: bool,
    pub(crate) is_fullscreen: bool,
    pub(crate) obeys_size_hints: bool,
}

impl PartialEq for Client {
    fn eq(&self, other: &Self) -> bool {
        self.xwindow.id == other.xwindow.id
    }
}

impl Client {
    /// Creates a new Client from its server-side geometry.
    pub fn new(id: XWindowID, geom: Geometry, border_width: u32) -> Self {
        Self {
            xwindow: XWindow::with_data(id, geom),
            name: String::new(),
            class: (String::new(), String::new()),
            tags: 0,
            border_width,
            prev_border_width: border_width,
            prev_geom: geom,
            hints: SizeHintCache::default(),
            is_fixed: false,
            is_floating: false,
            is_urgent: false,
            never_focus: false,
            prev_floating: false,
            is_fullscreen: false,
            obeys_size_hints: true,
        }
    }

    /// Returns the X ID of the client.
    #[inline(always)]
    pub fn id(&self) -> XWindowID {
        self.xwindow.id
    }

    /// Returns the geometry of the window, borders excluded.
    #[inline(always)]
    pub fn geometry(&self) -> Geometry {
        self.xwindow.geom
    }

    #[inline(always)]
    pub fn x(&self) -> i32 {
        self.xwindow.geom.x
    }

    #[inline(always)]
    pub fn y(&self) -> i32 {
        self.xwindow.geom.y
    }

    /// The total width the window occupies on screen, borders included.
    #[inline(always)]
    pub fn width(&self) -> i32 {
        self.xwindow.geom.width + 2 * self.border_width as i32
    }

    /// The total height the window occupies on screen, borders included.
    #[inline(always)]
    pub fn height(&self) -> i32 {
        self.xwindow.geom.height + 2 * self.border_width as i32
    }

    /// Returns the window title.
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the (instance, class) pair from WM_CLASS.
    #[inline(always)]
    pub fn class(&self) -> (&str, &str) {
        (&self.class.0, &self.class.1)
    }

    /// Returns the tag mask of the client.
    #[inline(always)]
    pub fn tags(&self) -> u32 {
        self.tags
    }

    #[inline(always)]
    pub fn is_floating(&self) -> bool {
        self.is_floating
    }

    #[inline(always)]
    pub fn is_fullscreen(&self) -> bool {
        self.is_fullscreen
    }

    #[inline(always)]
    pub fn is_urgent(&self) -> bool {
        self.is_urgent
    }

    /// Whether the client takes part in tiled layouts.
    #[inline(always)]
    pub fn is_tiled(&self) -> bool {
        !self.is_floating
    }

    #[inline(always)]
    pub fn border_width(&self) -> u32 {
        self.border_width
    }

    /// Sets the geometry of the window, saving the old one, but does
    /// not notify the X server. The manager's resize path does that.
    pub fn set_geometry(&mut self, geom: Geometry) {
        self.prev_geom = self.xwindow.geom;
        self.xwindow.set_geometry(geom);
    }

    /// Re-reads the window title from the server.
    pub fn update_title<X: XConn>(&mut self, conn: &X) {
        self.name = conn.get_wm_name(self.id());
        trace!("client {} title is now {:?}", self.id(), self.name);
    }

    /// Re-reads WM_CLASS from the server.
    pub fn update_class<X: XConn>(&mut self, conn: &X) {
        self.class = conn.get_wm_class(self.id());
    }

    /// Re-reads WM_NORMAL_HINTS from the server and rebuilds the size
    /// constraint cache.
    pub fn update_size_hints<X: XConn>(&mut self, conn: &X) {
        self.set_size_hints(conn.get_wm_size_hints(self.id()));
    }

    /// Rebuilds the size constraint cache from a decoded property.
    pub fn set_size_hints(&mut self, hints: Option<WmSizeHints>) {
        self.hints = SizeHintCache::from_hints(hints);
        self.is_fixed = self.hints.is_fixed();
    }

    /// Re-reads WM_HINTS, updating urgency and focusability.
    ///
    /// If the client is currently selected, an incoming urgency hint is
    /// cleared on the server instead of being recorded; the user is
    /// already looking at the window.
    pub fn update_wm_hints<X: XConn>(&mut self, conn: &X, is_selected: bool) {
        let Some(hints) = conn.get_wm_hints(self.id()) else {
            return;
        };

        if is_selected && hints.urgent {
            conn.clear_urgency(self.id());
        } else {
            self.is_urgent = hints.urgent;
        }
        self.never_focus = matches!(hints.input, Some(false));
    }

    /// Sets the border color of the client on the server.
    pub fn set_border<X: XConn>(&self, conn: &X, color: Color) {
        conn.change_window_attributes(self.id(), &[ClientAttrs::BorderColour(color)])
            .unwrap_or_else(|e| error!("{}", e));
    }

    /// Applies the client's ICCCM size constraints to a proposed
    /// geometry, per ICCCM 4.1.2.3.
    ///
    /// In interactive (mouse-driven) mode the position is clamped
    /// against the whole screen; otherwise against the monitor work
    /// area. The base/aspect/increment constraints only apply when
    /// `apply_hints` is set (tiled clients configured to ignore hints
    /// skip them).
    ///
    /// Returns the corrected geometry and whether it differs from the
    /// client's current one.
    pub fn apply_size_hints(
        &self,
        mut geom: Geometry,
        interact: bool,
        screen: (i32, i32),
        work: Geometry,
        bar_h: i32,
        apply_hints: bool,
    ) -> (Geometry, bool) {
        let (sw, sh) = screen;
        let bw2 = 2 * self.border_width as i32;

        // set minimum possible
        geom.width = geom.width.max(1);
        geom.height = geom.height.max(1);

        if interact {
            if geom.x >= sw {
                geom.x = sw - (geom.width + bw2);
            }
            if geom.y > sh {
                geom.y = sh - (geom.height + bw2);
            }
            if geom.x + geom.width + bw2 < 0 {
                geom.x = 0;
            }
            if geom.y + geom.height + bw2 < 0 {
                geom.y = 0;
            }
        } else {
            if geom.x >= work.x + work.width {
                geom.x = work.x + work.width - (geom.width + bw2);
            }
            if geom.y >= work.y + work.height {
                geom.y = work.y + work.height - (geom.height + bw2);
            }
            if geom.x + geom.width + bw2 <= work.x {
                geom.x = work.x;
            }
            if geom.y + geom.height + bw2 <= work.y {
                geom.y = work.y;
            }
        }

        // no window may be smaller than the bar
        geom.height = geom.height.max(bar_h);
        geom.width = geom.width.max(bar_h);

        if apply_hints {
            let h = &self.hints;
            let base_is_min = h.base_w == h.min_w && h.base_h == h.min_h;

            // temporarily remove base dimensions
            if !base_is_min {
                geom.width -= h.base_w;
                geom.height -= h.base_h;
            }

            // adjust for aspect limits
            if h.min_aspect > 0.0 && h.max_aspect > 0.0 {
                if h.max_aspect < geom.width as f32 / geom.height as f32 {
                    geom.width = (geom.height as f32 * h.max_aspect + 0.5) as i32;
                } else if h.min_aspect < geom.height as f32 / geom.width as f32 {
                    geom.height = (geom.width as f32 * h.min_aspect + 0.5) as i32;
                }
            }

            // increment calculation requires the base subtracted
            if base_is_min {
                geom.width -= h.base_w;
                geom.height -= h.base_h;
            }

            // snap to increment granularity
            if h.inc_w > 0 {
                geom.width -= geom.width % h.inc_w;
            }
            if h.inc_h > 0 {
                geom.height -= geom.height % h.inc_h;
            }

            // restore base dimensions and clamp to min/max
            geom.width = (geom.width + h.base_w).max(h.min_w);
            geom.height = (geom.height + h.base_h).max(h.min_h);
            if h.max_w > 0 {
                geom.width = geom.width.min(h.max_w);
            }
            if h.max_h > 0 {
                geom.height = geom.height.min(h.max_h);
            }
        }

        let changed = geom != self.xwindow.geom;
        (geom, changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_hints(hints: WmSizeHints) -> Client {
        let mut client = Client::new(1, Geometry::new(0, 0, 600, 800), 2);
        client.set_size_hints(Some(hints));
        client
    }

    const SCREEN: (i32, i32) = (1920, 1080);
    const WORK: Geometry = Geometry {
        x: 0,
        y: 20,
        height: 1060,
        width: 1920,
    };

    #[test]
    fn hint_cache_falls_back_between_base_and_min() {
        let cache = SizeHintCache::from_hints(Some(WmSizeHints {
            min_size: Some((200, 100)),
            ..Default::default()
        }));

        assert_eq!((cache.base_w, cache.base_h), (200, 100));
        assert_eq!((cache.min_w, cache.min_h), (200, 100));
        assert!(!cache.is_fixed());
    }

    #[test]
    fn fixed_size_hints_are_detected() {
        let cache = SizeHintCache::from_hints(Some(WmSizeHints {
            min_size: Some((300, 300)),
            max_size: Some((300, 300)),
            ..Default::default()
        }));

        assert!(cache.is_fixed());
    }

    #[test]
    fn resize_snaps_to_increments_and_respects_min() {
        let client = client_with_hints(WmSizeHints {
            base_size: Some((10, 10)),
            min_size: Some((50, 50)),
            resize_inc: Some((7, 13)),
            ..Default::default()
        });

        let (geom, _) = client.apply_size_hints(
            Geometry::new(10, 30, 500, 703),
            false,
            SCREEN,
            WORK,
            20,
            true,
        );

        // (703 - 10) - (703 - 10) % 7 + 10 = 703 - 0 + 10? 693 % 7 == 0
        assert_eq!((geom.width - 10) % 7, 0);
        assert_eq!((geom.height - 10) % 13, 0);
        assert!(geom.width >= 50 && geom.height >= 50);
    }

    #[test]
    fn apply_size_hints_is_idempotent() {
        let client = client_with_hints(WmSizeHints {
            base_size: Some((8, 8)),
            min_size: Some((40, 30)),
            resize_inc: Some((9, 17)),
            ..Default::default()
        });

        let proposal = Geometry::new(-50, 2000, 777, 1333);
        let (once, _) = client.apply_size_hints(proposal, false, SCREEN, WORK, 20, true);
        let (twice, _) = client.apply_size_hints(once, false, SCREEN, WORK, 20, true);

        assert_eq!(once, twice);
    }

    #[test]
    fn aspect_limits_are_enforced() {
        let client = client_with_hints(WmSizeHints {
            min_aspect: Some((2, 1)),
            max_aspect: Some((3, 1)),
            ..Default::default()
        });

        // far too tall for the minimum aspect: height gets pulled down
        let (geom, _) = client.apply_size_hints(
            Geometry::new(0, 20, 900, 600),
            false,
            SCREEN,
            WORK,
            20,
            true,
        );
        assert_eq!(geom.height, 300);

        // far too wide for the maximum aspect: width gets pulled in
        let (geom, _) = client.apply_size_hints(
            Geometry::new(0, 20, 100, 900),
            false,
            SCREEN,
            WORK,
            20,
            true,
        );
        assert_eq!(geom.width, 300);
    }

    #[test]
    fn clamping_keeps_window_on_the_work_area() {
        let client = Client::new(1, Geometry::new(0, 0, 100, 100), 1);

        let (geom, changed) = client.apply_size_hints(
            Geometry::new(5000, 5000, 100, 100),
            false,
            SCREEN,
            WORK,
            20,
            false,
        );

        assert!(changed);
        assert!(geom.x < WORK.x + WORK.width);
        assert!(geom.y < WORK.y + WORK.height);
    }

    #[test]
    fn minimum_dimension_is_the_bar_height() {
        let client = Client::new(1, Geometry::new(0, 0, 100, 100), 1);

        let (geom, _) =
            client.apply_size_hints(Geometry::new(0, 20, 1, 1), false, SCREEN, WORK, 24, false);

        assert_eq!(geom.width, 24);
        assert_eq!(geom.height, 24);
    }
}
