//! The monocle arrangement: one window at a time, full work area.

use super::LayoutAction;
use crate::core::types::Geometry;
use crate::core::Monitor;

/// Resizes every visible tiled client to fill the work area, and
/// overrides the layout symbol with the visible window count.
pub fn monocle(mon: &Monitor, gap: i32) -> Vec<LayoutAction> {
    let work = mon.work_area();
    let n = mon.visible_count();

    let mut actions = Vec::new();
    if n > 0 {
        actions.push(LayoutAction::OverrideSymbol(format!("[{}]", n)));
    }

    for id in mon.tiled_ids() {
        let bw2 = 2 * mon
            .clients
            .lookup(id)
            .map(|c| c.border_width() as i32)
            .unwrap_or(0);

        actions.push(LayoutAction::Resize {
            id,
            geom: Geometry::new(
                work.x + gap,
                work.y + gap,
                work.height - bw2 - 2 * gap,
                work.width - bw2 - 2 * gap,
            ),
        });
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::Client;
    use crate::manager::Config;

    #[test]
    fn every_tiled_client_gets_the_work_area_and_the_symbol_counts_all() {
        let config = Config::default().into_runtime();
        let mut mon = Monitor::new(0, 1, &config);
        mon.set_geometry(Geometry::new(0, 0, 1080, 1920));
        mon.update_bar_pos(20);

        for id in 1..=3u32 {
            let mut client = Client::new(id, Geometry::default(), 2);
            client.tags = 1;
            if id == 3 {
                client.is_floating = true;
            }
            mon.attach(client);
            mon.attach_stack(id);
        }

        let actions = monocle(&mon, 4);

        // floating client counts toward the symbol but is not resized
        assert_eq!(actions[0], LayoutAction::OverrideSymbol("[3]".into()));

        let resizes: Vec<_> = actions
            .iter()
            .filter_map(|a| match a {
                LayoutAction::Resize { geom, .. } => Some(*geom),
                _ => None,
            })
            .collect();
        assert_eq!(resizes.len(), 2);
        for geom in resizes {
            assert_eq!(geom, Geometry::new(4, 24, 1080 - 20 - 4 - 8, 1920 - 4 - 8));
        }
    }
}
