//! Core data types for window management: the ordered containers, the
//! per-window and per-monitor records, and the geometry primitives they
//! are built on.

pub mod monitor;
pub mod ring;
pub mod types;
pub mod window;

#[doc(inline)]
pub use monitor::Monitor;
#[doc(inline)]
pub use ring::{Ring, Selector};
#[doc(inline)]
pub use window::{Client, ClientRing};
