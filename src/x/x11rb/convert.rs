//! Conversions from raw x11rb events into crate-native events.

use x11rb::protocol::xproto::{self, Mapping, NotifyDetail, NotifyMode};
use x11rb::protocol::Event;

use tracing::trace;

use super::X11RBConn;
use crate::core::types::{Geometry, Point};
use crate::x::core::StackModeRaw;
use crate::x::event::{
    ClientMessageData, ClientMessageEvent, ConfigureEvent, ConfigureRequestData, CrossingEvent,
    ExposeEvent, KeypressEvent, MappingEvent, MouseEvent, PointerEvent, PropertyEvent, XEvent,
};
use crate::x::input::ModMask;
use crate::x::Initialized;

/// An event was sent by another client rather than the server if the
/// high bit of its response type is set.
fn is_synthetic(response_type: u8) -> bool {
    response_type & 0x80 != 0
}

fn modmask(state: xproto::KeyButMask) -> ModMask {
    ModMask::from_bits_truncate(u16::from(state))
}

impl X11RBConn<Initialized> {
    /// Translates a raw protocol event into an [`XEvent`].
    pub(crate) fn process_raw_event(&self, event: Event) -> XEvent {
        let root = self.root.id;

        match event {
            Event::ButtonPress(ev) => XEvent::ButtonPress(MouseEvent {
                id: ev.event,
                button: ev.detail,
                mask: modmask(ev.state),
                location: Point::new(ev.root_x as i32, ev.root_y as i32),
            }),
            Event::ButtonRelease(ev) => XEvent::ButtonRelease(MouseEvent {
                id: ev.event,
                button: ev.detail,
                mask: modmask(ev.state),
                location: Point::new(ev.root_x as i32, ev.root_y as i32),
            }),
            Event::ClientMessage(ev) => XEvent::ClientMessage(ClientMessageEvent {
                window: ev.window,
                data: ClientMessageData::U32(ev.data.as_data32()),
                type_: ev.type_,
            }),
            Event::ConfigureNotify(ev) => XEvent::ConfigureNotify(ConfigureEvent {
                id: ev.window,
                geom: Geometry::new(
                    ev.x as i32,
                    ev.y as i32,
                    ev.height as i32,
                    ev.width as i32,
                ),
                is_root: ev.window == root,
            }),
            Event::ConfigureRequest(ev) => {
                use xproto::ConfigWindow as Mask;

                let has = |bit| ev.value_mask.contains(bit);
                XEvent::ConfigureRequest(ConfigureRequestData {
                    id: ev.window,
                    x: has(Mask::X).then_some(ev.x as i32),
                    y: has(Mask::Y).then_some(ev.y as i32),
                    height: has(Mask::HEIGHT).then_some(ev.height as i32),
                    width: has(Mask::WIDTH).then_some(ev.width as i32),
                    border_width: has(Mask::BORDER_WIDTH).then_some(ev.border_width as u32),
                    sibling: has(Mask::SIBLING).then_some(ev.sibling),
                    stack_mode: has(Mask::STACK_MODE).then(|| match ev.stack_mode {
                        xproto::StackMode::BELOW => StackModeRaw::Below,
                        xproto::StackMode::TOP_IF => StackModeRaw::TopIf,
                        xproto::StackMode::BOTTOM_IF => StackModeRaw::BottomIf,
                        xproto::StackMode::OPPOSITE => StackModeRaw::Opposite,
                        _ => StackModeRaw::Above,
                    }),
                })
            }
            Event::DestroyNotify(ev) => XEvent::DestroyNotify(ev.window),
            Event::EnterNotify(ev) => XEvent::EnterNotify(CrossingEvent {
                id: ev.event,
                is_root: ev.event == root,
                normal_mode: ev.mode == NotifyMode::NORMAL,
                inferior: ev.detail == NotifyDetail::INFERIOR,
            }),
            Event::Expose(ev) => XEvent::Expose(ExposeEvent {
                id: ev.window,
                count: ev.count as u32,
            }),
            Event::FocusIn(ev) => XEvent::FocusIn(ev.event),
            Event::KeyPress(ev) => XEvent::KeyPress(KeypressEvent {
                mask: modmask(ev.state),
                keycode: ev.detail,
                keysym: self.lookup_keysym_inner(ev.detail),
            }),
            Event::MappingNotify(ev) => XEvent::MappingNotify(MappingEvent {
                is_keyboard: ev.request == Mapping::KEYBOARD,
            }),
            Event::MapRequest(ev) => {
                let override_redirect = self
                    .conn_get_override_redirect(ev.window)
                    .unwrap_or(false);
                XEvent::MapRequest(ev.window, override_redirect)
            }
            Event::MotionNotify(ev) => XEvent::MotionNotify(PointerEvent {
                id: ev.event,
                is_root: ev.event == root,
                location: Point::new(ev.root_x as i32, ev.root_y as i32),
            }),
            Event::PropertyNotify(ev) => XEvent::PropertyNotify(PropertyEvent {
                id: ev.window,
                atom: ev.atom,
                is_root: ev.window == root,
                deleted: ev.state == xproto::Property::DELETE,
            }),
            Event::UnmapNotify(ev) => {
                XEvent::UnmapNotify(ev.window, is_synthetic(ev.response_type))
            }
            other => {
                trace!("untracked event {:?}", other);
                XEvent::Unknown(raw_response_type(&other))
            }
        }
    }

    fn conn_get_override_redirect(&self, window: u32) -> Option<bool> {
        use x11rb::protocol::xproto::ConnectionExt;

        Some(
            self.conn
                .get_window_attributes(window)
                .ok()?
                .reply()
                .ok()?
                .override_redirect,
        )
    }
}

fn raw_response_type(event: &Event) -> u8 {
    event.response_type() & 0x7f
}
