//! Window arrangements.
//!
//! A layout is a symbol plus an optional arrange function. Arrange
//! functions are pure: they map a monitor's visible clients and
//! parameters to a list of [`LayoutAction`]s, which the manager then
//! applies through its resize path (where ICCCM size hints get their
//! say). A layout with no arrange function leaves every window where
//! it is, which is the floating layout.

use std::fmt;

use crate::core::types::Geometry;
use crate::core::Monitor;
use crate::x::core::XWindowID;

/// Tiled layouts.
pub mod tiled;
/// The monocle (fullscreen-stack) layout.
pub mod monocle;

/// A function that can lay out the windows of a monitor.
///
/// Parameters:
/// - `&Monitor`: the monitor to lay out.
/// - `i32`: the gap, in pixels, around each window.
pub type ArrangeFn = fn(&Monitor, i32) -> Vec<LayoutAction>;

/// One step of applying a layout.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutAction {
    /// Give the window this geometry.
    Resize { id: XWindowID, geom: Geometry },
    /// Replace the monitor's layout symbol for this arrangement.
    OverrideSymbol(String),
}

/// An entry in the layout table.
///
/// The symbol is what the bar shows; it should stay short (the
/// reference configs keep it under 16 characters).
#[derive(Clone, Copy)]
pub struct Layout {
    pub symbol: &'static str,
    pub arrange: Option<ArrangeFn>,
}

impl Layout {
    /// Creates a new layout table entry.
    pub const fn new(symbol: &'static str, arrange: Option<ArrangeFn>) -> Self {
        Self { symbol, arrange }
    }

    /// Whether this layout floats its windows.
    #[inline(always)]
    pub fn is_floating(&self) -> bool {
        self.arrange.is_none()
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Layout")
            .field("symbol", &self.symbol)
            .field("floating", &self.is_floating())
            .finish()
    }
}

/// The stock layout table: tile, floating, monocle.
pub fn default_layouts() -> Vec<Layout> {
    vec![
        Layout::new("[]=", Some(tiled::tile)),
        Layout::new("><>", None),
        Layout::new("[M]", Some(monocle::monocle)),
    ]
}
