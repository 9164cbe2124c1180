//! Types for inspecting the internal state of a `WindowManager`.

use std::collections::HashSet;
use std::fmt;

use crate::core::{Client, Monitor, Ring};
use crate::manager::RuntimeConfig;
use crate::x::core::{XConn, XWindow, XWindowID};

/// A read-only view into the state of the window manager.
///
/// The `'wm` lifetime refers to the lifetime of the parent
/// `WindowManager`.
pub struct WmState<'wm, X, C>
where
    X: XConn,
    C: RuntimeConfig,
{
    /// The `XConn` implementation currently in use.
    pub conn: &'wm X,
    /// The runtime configuration of the WindowManager.
    pub config: &'wm C,
    /// The monitors, with the ring focus on the selected one.
    pub monitors: &'wm Ring<Monitor>,
    /// The root window.
    pub root: XWindow,
}

impl<X, C> fmt::Debug for WmState<'_, X, C>
where
    X: XConn,
    C: RuntimeConfig,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WmState")
            .field("monitors", &self.monitors)
            .field("root", &self.root)
            .finish()
    }
}

impl<'wm, X, C> WmState<'wm, X, C>
where
    X: XConn,
    C: RuntimeConfig,
{
    /// The selected monitor.
    pub fn selected_monitor(&self) -> &'wm Monitor {
        self.monitors
            .focused()
            .expect("a selected monitor always exists")
    }

    /// Looks up a client anywhere on the desktop.
    pub fn lookup_client(&self, id: XWindowID) -> Option<&'wm Client> {
        self.monitors.iter().find_map(|m| m.clients.lookup(id))
    }

    /// Whether the window with the given ID is currently managed.
    pub fn is_managing(&self, id: XWindowID) -> bool {
        self.lookup_client(id).is_some()
    }

    /// The selected client of the selected monitor.
    pub fn selected_client(&self) -> Option<&'wm Client> {
        let mon = self.selected_monitor();
        mon.sel.and_then(|id| mon.clients.lookup(id))
    }

    /// Checks the structural invariants that must hold between any two
    /// event dispatches, returning a description of the first violation
    /// found.
    ///
    /// - every client sits in exactly one monitor's client list,
    /// - each monitor's client list and focus stack hold the same set,
    /// - every client has a nonempty tag mask within the configured
    ///   tag space,
    /// - a monitor's selected client, if set, is visible on it,
    /// - every tag-set selector is 0 or 1.
    pub fn validate(&self) -> Result<(), String> {
        let tag_mask = self.config.tag_mask();
        let mut seen: HashSet<XWindowID> = HashSet::new();

        for mon in self.monitors.iter() {
            if mon.seltags > 1 {
                return Err(format!("monitor {}: seltags is {}", mon.num, mon.seltags));
            }

            let in_list: HashSet<XWindowID> = mon.clients.iter().map(|c| c.id()).collect();
            let in_stack: HashSet<XWindowID> = mon.stack.iter().copied().collect();

            if in_list.len() != mon.clients.len() || in_stack.len() != mon.stack.len() {
                return Err(format!("monitor {}: duplicate client entries", mon.num));
            }
            if in_list != in_stack {
                return Err(format!(
                    "monitor {}: client list and focus stack diverge: {:?} vs {:?}",
                    mon.num, in_list, in_stack
                ));
            }

            for client in mon.clients.iter() {
                if !seen.insert(client.id()) {
                    return Err(format!("client {} is on more than one monitor", client.id()));
                }
                if client.tags == 0 {
                    return Err(format!("client {} has no tags", client.id()));
                }
                if client.tags & !tag_mask != 0 {
                    return Err(format!(
                        "client {} has tags {:#x} outside the tag space",
                        client.id(),
                        client.tags
                    ));
                }
            }

            if let Some(sel) = mon.sel {
                let Some(client) = mon.clients.lookup(sel) else {
                    return Err(format!("monitor {}: selected client {} not on it", mon.num, sel));
                };
                if !mon.is_visible(client) {
                    return Err(format!(
                        "monitor {}: selected client {} is not visible",
                        mon.num, sel
                    ));
                }
            }
        }

        Ok(())
    }
}
