//! # tatamiwm - a dynamic tiling window manager for X
//!
//! tatamiwm manages top-level windows the way dwm taught the world to:
//! clients carry tag bitmasks, every monitor views a tag-set, and the
//! visible clients are arranged by the layout in effect - master/stack
//! tiling, monocle, or plain floating.
//!
//! ## Design
//!
//! The window management state machine lives behind the [`XConn`]
//! trait, which enumerates every operation it needs from a display
//! connection. The stock implementation is backed by the x11rb
//! library; tests drive the same state machine through a mock
//! connection, and embedders can supply their own.
//!
//! Configuration is a set of static tables handed over at startup (see
//! [`manager::Config`]); bar rendering is delegated entirely to a
//! [`BarHook`](manager::BarHook) callback, so the crate draws nothing
//! itself.
//!
//! ## Usage
//!
//! ```no_run
//! use tatamiwm::{x11rb_backed_wm, manager::Config};
//!
//! let mut wm = x11rb_backed_wm(Config::default()).expect("could not start");
//! wm.scan();
//! wm.run().expect("runtime error");
//! ```

mod log;

pub mod bindings;
pub mod core;
pub mod layouts;
pub mod manager;
pub mod x;

pub(crate) mod util;

use thiserror::Error;

#[doc(inline)]
pub use crate::core::types;
#[doc(inline)]
pub use crate::manager::WindowManager;
#[doc(inline)]
pub use crate::x::core::{XConn, XError};

use crate::manager::{Config, WmConfig};
use crate::x::x11rb::X11RBConn;

/// Everything that could possibly go wrong while the window manager is
/// running.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum WmError {
    /// An error with the underlying X connection.
    #[error(transparent)]
    XConn(#[from] XError),

    /// Another window manager already owns the display.
    #[error("another window manager is already running")]
    OtherWmRunning,

    /// Unable to spawn a process.
    #[error("error while running program: {0}")]
    SpawnProc(String),

    /// Received a reference to a client we do not manage.
    #[error("unknown client {0}")]
    UnknownClient(x::core::XWindowID),

    /// One or more configuration invariants was not upheld.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An error not covered by the other variants.
    #[error("{0}")]
    OtherError(String),
}

/// A specialized Result for window manager operations.
pub type Result<T> = ::core::result::Result<T, WmError>;

/// Convenience function for creating an x11rb-backed WindowManager.
pub fn x11rb_backed_wm(config: Config) -> Result<WindowManager<X11RBConn, WmConfig>> {
    let conn = X11RBConn::connect().map_err(WmError::XConn)?;
    let conn = conn.init().map_err(WmError::XConn)?;

    WindowManager::new(conn, config)
}
