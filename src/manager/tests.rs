//! Scenario tests driving the full manager through a dummy connection.

use super::*;
use crate::core::types::Direction;
use crate::x::dummy::DummyConn;
use crate::x::event::{ClientMessageData, ClientMessageEvent, XEvent};

fn wm_on(outputs: Vec<Geometry>) -> WindowManager<DummyConn, WmConfig> {
    wm_with_config(outputs, Config::default())
}

fn wm_with_config(
    outputs: Vec<Geometry>,
    config: Config,
) -> WindowManager<DummyConn, WmConfig> {
    let conn = DummyConn::new(outputs);
    WindowManager::new(conn, config).expect("manager construction failed")
}

fn single_monitor() -> Vec<Geometry> {
    vec![Geometry::new(0, 0, 1080, 1920)]
}

fn dual_monitor() -> Vec<Geometry> {
    vec![
        Geometry::new(0, 0, 1080, 1920),
        Geometry::new(1920, 0, 1080, 1920),
    ]
}

/// Maps a fresh window through the usual MapRequest path.
fn map_window(wm: &mut WindowManager<DummyConn, WmConfig>, geom: Geometry) -> XWindowID {
    let id = wm.conn.add_window(geom);
    wm.handle_event(XEvent::MapRequest(id, false));
    id
}

fn assert_valid(wm: &WindowManager<DummyConn, WmConfig>) {
    if let Err(msg) = wm.state().validate() {
        panic!("invariant violation: {}", msg);
    }
}

#[test]
fn single_map_fills_the_work_area() {
    let mut wm = wm_on(single_monitor());

    let win = wm.conn.add_window(Geometry::new(10, 30, 300, 400));
    wm.conn.set_class(win, "xterm", "XTerm");
    wm.handle_event(XEvent::MapRequest(win, false));
    assert_valid(&wm);

    let state = wm.state();
    let mon = state.selected_monitor();
    let client = state.lookup_client(win).expect("window was not managed");

    assert_eq!(client.tags(), mon.tag_mask());
    assert!(!client.is_floating());
    assert_eq!(mon.selected(), Some(win));
    assert_eq!(mon.clients.get(0).map(|c| c.id()), Some(win));
    assert_eq!(mon.stack.first(), Some(&win));

    // sole tiled client: the whole work area minus gap and border
    let work = mon.work_area();
    let gap = 5;
    let bw2 = 2 * client.border_width() as i32;
    assert_eq!(
        client.geometry(),
        Geometry::new(
            work.x + gap,
            work.y + gap,
            work.height - bw2 - 2 * gap,
            work.width - bw2 - 2 * gap,
        )
    );
}

#[test]
fn rules_can_float_a_client() {
    let mut wm = wm_on(single_monitor());

    let win = wm.conn.add_window(Geometry::new(100, 100, 200, 300));
    wm.conn.set_class(win, "gimp", "Gimp");
    wm.handle_event(XEvent::MapRequest(win, false));
    assert_valid(&wm);

    let state = wm.state();
    let client = state.lookup_client(win).unwrap();
    assert!(client.is_floating());
    // the tiling pass leaves floating clients alone
    assert_eq!(client.geometry(), Geometry::new(100, 100, 200, 300));
}

#[test]
fn tag_then_view_moves_between_views() {
    let mut wm = wm_on(single_monitor());

    let a = map_window(&mut wm, Geometry::default());
    let b = map_window(&mut wm, Geometry::default());
    assert_eq!(wm.state().selected_monitor().selected(), Some(b));

    wm.tag(1 << 3);
    assert_valid(&wm);
    {
        let state = wm.state();
        let mon = state.selected_monitor();
        assert_eq!(state.lookup_client(b).unwrap().tags(), 1 << 3);
        assert!(!mon.is_visible_id(b));
        assert!(mon.is_visible_id(a));
        assert_eq!(mon.selected(), Some(a));
    }

    wm.view(1 << 3);
    assert_valid(&wm);
    {
        let mon = wm.state().selected_monitor();
        assert!(mon.is_visible_id(b));
        assert!(!mon.is_visible_id(a));
        assert_eq!(mon.selected(), Some(b));
    }

    wm.view(1);
    assert_valid(&wm);
    let mon = wm.state().selected_monitor();
    assert!(mon.is_visible_id(a));
    assert!(!mon.is_visible_id(b));
}

#[test]
fn view_history_is_an_involution() {
    let mut wm = wm_on(single_monitor());

    wm.view(1 << 1);
    wm.view(1 << 2);
    assert_eq!(wm.state().selected_monitor().tag_mask(), 1 << 2);

    // a zero mask toggles back to the previous view, repeatedly
    wm.view(0);
    assert_eq!(wm.state().selected_monitor().tag_mask(), 1 << 1);
    wm.view(0);
    assert_eq!(wm.state().selected_monitor().tag_mask(), 1 << 2);

    // viewing the previous tag-set again lands exactly on it
    wm.view(1 << 1);
    assert_eq!(wm.state().selected_monitor().tag_mask(), 1 << 1);
    assert_valid(&wm);
}

#[test]
fn monitor_removal_drains_clients_into_the_primary() {
    let mut wm = wm_on(dual_monitor());
    assert_eq!(wm.monitors.len(), 2);

    let a = map_window(&mut wm, Geometry::default());
    let b = map_window(&mut wm, Geometry::default());

    wm.focus_monitor(MonitorDir::Right, false);
    assert_eq!(wm.monitors.focused_idx(), Some(1));
    let c = map_window(&mut wm, Geometry::default());
    assert_eq!(wm.locate(c).map(|(m, _)| m), Some(1));

    wm.conn.set_outputs(single_monitor());
    assert!(wm.update_monitors());
    assert_valid(&wm);

    assert_eq!(wm.monitors.len(), 1);
    let state = wm.state();
    let mon = state.selected_monitor();
    assert!(mon.clients.contains(a));
    assert!(mon.clients.contains(b));
    // the drained client lands at the back of both orders
    assert_eq!(mon.clients.iter().last().map(|c| c.id()), Some(c));
    assert_eq!(mon.stack.last(), Some(&c));
}

#[test]
fn fullscreen_toggle_saves_and_restores() {
    let mut config = Config::default();
    config.border_px = 2;
    let mut wm = wm_with_config(single_monitor(), config);

    // floating layout, so the tiler leaves our geometry alone
    wm.set_layout(1);
    let win = map_window(&mut wm, Geometry::new(100, 100, 600, 800));
    assert_valid(&wm);
    assert_eq!(
        wm.state().lookup_client(win).unwrap().geometry(),
        Geometry::new(100, 100, 600, 800)
    );

    wm.toggle_fullscreen();
    assert_valid(&wm);
    {
        let state = wm.state();
        let client = state.lookup_client(win).unwrap();
        assert!(client.is_fullscreen());
        assert!(client.is_floating());
        assert_eq!(client.border_width(), 0);
        assert_eq!(client.geometry(), state.selected_monitor().geometry());
    }

    wm.toggle_fullscreen();
    assert_valid(&wm);
    let state = wm.state();
    let client = state.lookup_client(win).unwrap();
    assert!(!client.is_fullscreen());
    assert!(!client.is_floating());
    assert_eq!(client.border_width(), 2);
    assert_eq!(client.geometry(), Geometry::new(100, 100, 600, 800));
}

#[test]
fn net_active_window_swaps_the_view_to_the_client() {
    let mut wm = wm_on(single_monitor());

    let win = map_window(&mut wm, Geometry::default());
    wm.tag(1 << 3);
    assert!(!wm.state().selected_monitor().is_visible_id(win));
    let seltags_before = wm.state().selected_monitor().seltags;

    let type_ = wm
        .conn
        .lookup_interned_atom(Atom::NetActiveWindow.as_ref())
        .unwrap();
    wm.handle_event(XEvent::ClientMessage(ClientMessageEvent {
        window: win,
        type_,
        data: ClientMessageData::U32([0; 5]),
    }));
    assert_valid(&wm);

    let state = wm.state();
    let mon = state.selected_monitor();
    assert_ne!(mon.seltags, seltags_before);
    assert_eq!(mon.tag_mask(), 1 << 3);
    assert!(mon.is_visible_id(win));
    assert_eq!(mon.selected(), Some(win));
    assert_eq!(mon.clients.get(0).map(|c| c.id()), Some(win));
}

#[test]
fn fullscreen_client_message_applies_the_verbs() {
    let mut wm = wm_on(single_monitor());
    let win = map_window(&mut wm, Geometry::default());

    let type_ = wm
        .conn
        .lookup_interned_atom(Atom::NetWmState.as_ref())
        .unwrap();
    let fullscreen = wm
        .conn
        .lookup_interned_atom(Atom::NetWmStateFullscreen.as_ref())
        .unwrap();

    let message = |verb: u32| {
        XEvent::ClientMessage(ClientMessageEvent {
            window: win,
            type_,
            data: ClientMessageData::U32([verb, fullscreen, 0, 0, 0]),
        })
    };

    wm.handle_event(message(1)); // add
    assert!(wm.state().lookup_client(win).unwrap().is_fullscreen());

    wm.handle_event(message(2)); // toggle
    assert!(!wm.state().lookup_client(win).unwrap().is_fullscreen());

    wm.handle_event(message(0)); // remove, already off
    assert!(!wm.state().lookup_client(win).unwrap().is_fullscreen());
    assert_valid(&wm);
}

#[test]
fn focus_stack_round_trips() {
    let mut wm = wm_on(single_monitor());
    let _a = map_window(&mut wm, Geometry::default());
    let _b = map_window(&mut wm, Geometry::default());
    let c = map_window(&mut wm, Geometry::default());
    assert_eq!(wm.state().selected_monitor().selected(), Some(c));

    wm.focus_stack(Direction::Forward);
    let mid = wm.state().selected_monitor().selected();
    assert_ne!(mid, Some(c));

    wm.focus_stack(Direction::Backward);
    assert_eq!(wm.state().selected_monitor().selected(), Some(c));
    assert_valid(&wm);
}

#[test]
fn unmanage_refocuses_and_keeps_invariants() {
    let mut wm = wm_on(single_monitor());
    let a = map_window(&mut wm, Geometry::default());
    let b = map_window(&mut wm, Geometry::default());

    wm.handle_event(XEvent::DestroyNotify(b));
    assert_valid(&wm);

    let state = wm.state();
    assert!(!state.is_managing(b));
    assert_eq!(state.selected_monitor().selected(), Some(a));

    wm.handle_event(XEvent::DestroyNotify(a));
    assert_valid(&wm);
    assert_eq!(wm.state().selected_monitor().selected(), None);
}

#[test]
fn synthetic_unmap_withdraws_instead_of_unmanaging() {
    let mut wm = wm_on(single_monitor());
    let win = map_window(&mut wm, Geometry::default());

    wm.handle_event(XEvent::UnmapNotify(win, true));
    assert!(wm.state().is_managing(win));
    assert_eq!(
        wm.conn.get_wm_state(win),
        Some(crate::x::property::WindowState::Withdrawn)
    );

    wm.handle_event(XEvent::UnmapNotify(win, false));
    assert!(!wm.state().is_managing(win));
    assert_valid(&wm);
}

#[test]
fn transients_ride_along_with_their_parent() {
    let mut wm = wm_on(single_monitor());
    let parent = map_window(&mut wm, Geometry::default());
    wm.tag(1 << 2);
    wm.view(1 << 2);

    let child = wm.conn.add_window(Geometry::new(50, 50, 100, 100));
    wm.conn.with_window(child, |w| {
        w.props.insert(
            Atom::WmTransientFor.as_ref().into(),
            Property::Window(vec![parent]),
        );
    });
    wm.handle_event(XEvent::MapRequest(child, false));
    assert_valid(&wm);

    let state = wm.state();
    let client = state.lookup_client(child).unwrap();
    assert_eq!(client.tags(), 1 << 2);
    assert!(client.is_floating());
}

#[test]
fn move_stack_swaps_but_preserves_focus_order() {
    let mut wm = wm_on(single_monitor());
    let a = map_window(&mut wm, Geometry::default());
    let b = map_window(&mut wm, Geometry::default());
    let stack_before = wm.state().selected_monitor().stack.clone();

    wm.move_stack(Direction::Forward);
    assert_valid(&wm);

    let state = wm.state();
    let mon = state.selected_monitor();
    let order: Vec<XWindowID> = mon.clients.iter().map(|c| c.id()).collect();
    assert_eq!(order, vec![a, b]);
    assert_eq!(mon.stack, stack_before);
    assert_eq!(mon.selected(), Some(b));
}

#[test]
fn send_to_monitor_adopts_the_target_tagset() {
    let mut wm = wm_on(dual_monitor());
    let win = map_window(&mut wm, Geometry::default());

    wm.tag_monitor(MonitorDir::Right);
    assert_valid(&wm);

    let (midx, _) = wm.locate(win).unwrap();
    assert_eq!(midx, 1);
    let tags = wm.state().lookup_client(win).unwrap().tags();
    assert_eq!(tags, wm.monitors[1].tag_mask());
}

#[test]
fn monitor_direction_wraps_at_the_edge() {
    let wm = wm_on(dual_monitor());
    assert_eq!(wm.monitors.focused_idx(), Some(0));

    assert_eq!(wm.monitor_in_dir(MonitorDir::Right), 1);
    // nothing to the left: wrap to the farthest monitor on the right
    assert_eq!(wm.monitor_in_dir(MonitorDir::Left), 1);
}

#[test]
fn kill_client_asks_politely_when_supported() {
    let mut wm = wm_on(single_monitor());
    let win = map_window(&mut wm, Geometry::default());

    wm.conn.with_window(win, |w| {
        w.props.insert(
            Atom::WmProtocols.as_ref().into(),
            Property::Atom(vec![Atom::WmDeleteWindow.as_ref().into()]),
        );
    });
    wm.conn.clear_requests();
    wm.kill_client();
    let requests = wm.conn.requests();
    assert!(requests.iter().any(|r| r.starts_with("send_client_message")));
    assert!(!requests.iter().any(|r| r.starts_with("kill_client")));

    // and forcefully otherwise
    wm.conn.with_window(win, |w| {
        w.props.remove(Atom::WmProtocols.as_ref());
    });
    wm.conn.clear_requests();
    wm.kill_client();
    assert!(wm
        .conn
        .requests()
        .iter()
        .any(|r| r.starts_with("kill_client")));
}

#[test]
fn toggle_floating_respects_fixed_clients() {
    let mut wm = wm_on(single_monitor());
    let win = wm.conn.add_window(Geometry::new(0, 40, 300, 300));
    wm.conn.set_size_hints(
        win,
        crate::x::property::WmSizeHints {
            min_size: Some((300, 300)),
            max_size: Some((300, 300)),
            ..Default::default()
        },
    );
    wm.handle_event(XEvent::MapRequest(win, false));

    // fixed-size clients always float
    assert!(wm.state().lookup_client(win).unwrap().is_floating());

    wm.toggle_floating();
    // and cannot be forced back into the layout
    assert!(wm.state().lookup_client(win).unwrap().is_floating());
    assert_valid(&wm);
}

#[test]
fn quit_ends_the_event_loop() {
    let mut wm = wm_on(single_monitor());
    wm.quit();
    wm.run().unwrap();
}
