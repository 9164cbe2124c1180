//! The master/stack tiling arrangement.

use super::LayoutAction;
use crate::core::types::Geometry;
use crate::core::Monitor;

/// Tiles the visible clients into a master column and a stack column.
///
/// The effective master count is `nmaster` if set, otherwise half the
/// client count, clamped to `[1, nmaster_dynamic_max]`. When clients
/// spill into the stack column, the master column takes `mfact` of the
/// work-area width. Heights within each column are divided among the
/// remaining slots at every step, so rounding error accumulates into
/// the last window instead of leaving a strip at the bottom.
pub fn tile(mon: &Monitor, gap: i32) -> Vec<LayoutAction> {
    let work = mon.work_area();
    let tiled = mon.tiled_ids();
    let n = tiled.len();

    if n == 0 {
        return Vec::new();
    }

    let nm = if mon.nmaster != 0 {
        mon.nmaster as usize
    } else {
        (n / 2).max(1).min(mon.nmaster_dynamic_max as usize)
    };

    let master_w = if n > nm {
        (work.width as f32 * mon.mfact) as i32
    } else {
        work.width
    };

    let mut actions = Vec::with_capacity(n);
    let (mut master_y, mut stack_y) = (0, 0);

    for (i, id) in tiled.iter().enumerate() {
        let bw2 = 2 * mon
            .clients
            .lookup(*id)
            .map(|c| c.border_width() as i32)
            .unwrap_or(0);

        if i < nm {
            let h = (work.height - master_y) / (n.min(nm) - i) as i32;
            actions.push(LayoutAction::Resize {
                id: *id,
                geom: Geometry::new(
                    work.x + gap,
                    work.y + master_y + gap,
                    h - bw2 - 2 * gap,
                    master_w - bw2 - 2 * gap,
                ),
            });
            master_y += h;
        } else {
            let h = (work.height - stack_y) / (n - i) as i32;
            actions.push(LayoutAction::Resize {
                id: *id,
                geom: Geometry::new(
                    work.x + master_w + gap,
                    work.y + stack_y + gap,
                    h - bw2 - 2 * gap,
                    work.width - master_w - bw2 - 2 * gap,
                ),
            });
            stack_y += h;
        }
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::Client;
    use crate::manager::Config;

    fn tiled_monitor(count: usize) -> Monitor {
        let config = Config::default().into_runtime();
        let mut mon = Monitor::new(0, 1, &config);
        mon.set_geometry(Geometry::new(0, 0, 1080, 1920));
        mon.update_bar_pos(20);

        for id in 1..=count as u32 {
            let mut client = Client::new(id, Geometry::default(), 2);
            client.tags = 1;
            mon.attach(client);
            mon.attach_stack(id);
        }
        mon
    }

    fn resizes(actions: Vec<LayoutAction>) -> Vec<(u32, Geometry)> {
        actions
            .into_iter()
            .filter_map(|a| match a {
                LayoutAction::Resize { id, geom } => Some((id, geom)),
                LayoutAction::OverrideSymbol(_) => None,
            })
            .collect()
    }

    /// The on-screen footprint of a tile: geometry plus border and gap.
    fn footprint(geom: Geometry, bw: i32, gap: i32) -> Geometry {
        Geometry::new(
            geom.x - gap,
            geom.y - gap,
            geom.height + 2 * bw + 2 * gap,
            geom.width + 2 * bw + 2 * gap,
        )
    }

    #[test]
    fn lone_client_fills_the_work_area() {
        let mon = tiled_monitor(1);
        let placed = resizes(tile(&mon, 5));

        assert_eq!(placed.len(), 1);
        let (_, geom) = placed[0];
        assert_eq!(geom.x, mon.work_area().x + 5);
        assert_eq!(geom.y, mon.work_area().y + 5);
        assert_eq!(geom.width, mon.work_area().width - 4 - 10);
        assert_eq!(geom.height, mon.work_area().height - 4 - 10);
    }

    #[test]
    fn tiles_do_not_overlap_and_stay_inside_the_work_area() {
        for count in 2..=7 {
            let mon = tiled_monitor(count);
            let placed = resizes(tile(&mon, 5));
            assert_eq!(placed.len(), count);

            let work = mon.work_area();
            let boxes: Vec<Geometry> = placed
                .iter()
                .map(|(_, g)| footprint(*g, 2, 5))
                .collect();

            for (i, a) in boxes.iter().enumerate() {
                assert!(a.x >= work.x && a.y >= work.y);
                assert!(a.x + a.width <= work.x + work.width);
                assert!(a.y + a.height <= work.y + work.height);

                for b in boxes.iter().skip(i + 1) {
                    assert!(!a.overlaps(b), "tiles {:?} and {:?} overlap", a, b);
                }
            }
        }
    }

    #[test]
    fn master_column_width_follows_mfact() {
        let mut mon = tiled_monitor(4);
        mon.mfact = 0.6;
        mon.nmaster = 1;

        let placed = resizes(tile(&mon, 0));
        // newest client (id 4) is at the head of the list: the master
        let (id, master) = placed[0];
        assert_eq!(id, 4);
        assert_eq!(master.width + 4, (1920.0_f32 * 0.6) as i32);
        assert_eq!(master.height + 4, mon.work_area().height);
    }

    #[test]
    fn dynamic_master_count_is_half_of_n_clamped() {
        let mut mon = tiled_monitor(6);
        mon.nmaster = 0;
        mon.nmaster_dynamic_max = 2;

        let placed = resizes(tile(&mon, 0));
        let master_x = mon.work_area().x;

        // 6/2 = 3, clamped to 2 masters
        let masters = placed.iter().filter(|(_, g)| g.x == master_x).count();
        assert_eq!(masters, 2);
    }

    #[test]
    fn column_heights_sum_to_the_work_area() {
        let mon = tiled_monitor(5);
        let placed = resizes(tile(&mon, 3));
        let work = mon.work_area();

        let master_x = work.x + 3;
        for column_x in [true, false] {
            let total: i32 = placed
                .iter()
                .filter(|(_, g)| (g.x == master_x) == column_x)
                .map(|(_, g)| g.height + 4 + 6)
                .sum();
            assert_eq!(total, work.height);
        }
    }
}
