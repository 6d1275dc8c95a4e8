use crate::config::LayoutConfig;
use crate::error::LayoutWarning;
use crate::ir::{OpId, OpTree};

/// Skyline of claimed heights, one cell per horizontal unit.
#[derive(Debug, Default)]
struct Occupancy {
    cells: Vec<f32>,
}

impl Occupancy {
    fn cell_range(from: f32, until: f32) -> Option<(usize, usize)> {
        // Also rejects NaN bounds.
        if !(until >= from) {
            return None;
        }
        let from = from.floor().max(0.0) as usize;
        let until = until.floor().max(0.0) as usize;
        Some((from, until))
    }

    fn block(&mut self, from: f32, until: f32, value: f32) {
        let Some((from, until)) = Self::cell_range(from, until) else {
            return;
        };
        if self.cells.len() <= until {
            self.cells.resize(until + 1, -1.0);
        }
        for cell in &mut self.cells[from..=until] {
            *cell = cell.max(value);
        }
    }

    fn peak(&self, from: f32, until: f32) -> Option<f32> {
        let (from, until) = Self::cell_range(from, until)?;
        Some(
            (from..=until)
                .map(|idx| self.cells.get(idx).copied().unwrap_or(-1.0))
                .fold(-1.0, f32::max),
        )
    }
}

#[derive(Debug)]
struct Row {
    key: i64,
    members: Vec<OpId>,
    start: f32,
    end: f32,
    pad: f32,
    y: f32,
    degenerate: bool,
}

fn collect_rows(tree: &mut OpTree, members: &[OpId], config: &LayoutConfig) -> Vec<Row> {
    let mut rows: Vec<Row> = Vec::new();
    for &id in members {
        let key = tree.get(id).draw_order_row;
        match rows.iter_mut().find(|row| row.key == key) {
            Some(row) => row.members.push(id),
            None => rows.push(Row {
                key,
                members: vec![id],
                start: 0.0,
                end: 0.0,
                pad: 0.0,
                y: 0.0,
                degenerate: false,
            }),
        }
    }
    rows.sort_by_key(|row| row.key);

    for row in &mut rows {
        row.members.sort_by(|a, b| {
            tree.get(*a)
                .layout
                .x_relative
                .total_cmp(&tree.get(*b).layout.x_relative)
        });
        let (Some(&first), Some(&last)) = (row.members.first(), row.members.last()) else {
            continue;
        };
        row.start = tree.get(first).layout.x_relative;
        let last_layout = &tree.get(last).layout;
        let until = last_layout.x_relative + last_layout.w;
        // Reserve room up to where outgoing edges travel.
        let reach = tree
            .downstream_peers(last)
            .iter()
            .map(|dn| tree.get(*dn).layout.x_relative)
            .reduce(f32::max)
            .map(|dn_x| dn_x - config.row_reach_back);
        row.end = reach.map_or(until, |reach| until.max(reach));
        tree.get_mut(last).layout.is_last_in_row = true;

        let primary = row.members.iter().any(|id| {
            let op = tree.get(*id);
            op.n_params.is_some_and(|n| n > 0)
                || op.layout.is_volume
                || config.primary_op_names.contains(&op.name)
                || (config.respect_respath_rows && op.is_respath_row)
        });
        row.pad = config.row_pad(primary);
    }
    rows
}

/// Raise a queued row to `target` if it currently sits lower.
fn raise_row(rows: &mut [Row], queued: &[usize], key: i64, target: f32) {
    let Some(idx) = rows.iter().position(|row| row.key == key) else {
        return;
    };
    if queued.contains(&idx) && rows[idx].y < target {
        rows[idx].y = target;
    }
}

/// Assigns `y_relative` to every child of an expanded op, one row at a time.
///
/// Rows are processed in ascending `draw_order_row`. Each processed row claims
/// its x-range in the occupancy skyline, and every row still waiting is lifted
/// above whatever its own range now overlaps. Rows are never lowered.
pub(super) fn place_group_rows(
    tree: &mut OpTree,
    parent: OpId,
    config: &LayoutConfig,
) -> Vec<LayoutWarning> {
    let members = tree.get(parent).children.clone();
    let mut rows = collect_rows(tree, &members, config);
    let mut warnings = Vec::new();
    let parent_key = tree.get(parent).key.clone();

    for row in &mut rows {
        if !(row.end >= row.start) {
            row.degenerate = true;
            let warning = LayoutWarning::EmptyRowRange {
                parent: parent_key.clone(),
                row: row.key,
                start: row.start,
                end: row.end,
            };
            tracing::warn!(%warning, "skipping row");
            warnings.push(warning);
        }
    }

    let mut occupancy = Occupancy::default();
    let mut queued: Vec<usize> = (0..rows.len()).collect();
    while !queued.is_empty() {
        let current = queued.remove(0);
        let row_y = rows[current].y;
        if !rows[current].degenerate {
            occupancy.block(rows[current].start, rows[current].end, row_y + rows[current].pad);
        }

        let row_members = rows[current].members.clone();
        for &id in &row_members {
            let op = tree.get(id);
            if !op.is_node() {
                let top = row_y + op.layout.h + config.expanded_box_clearance;
                occupancy.block(op.layout.x_relative, op.layout.x_relative + op.layout.w, top);
            } else if let Some(volume) = op.layout.active_volume() {
                let x = op.layout.x_relative;
                occupancy.block((x - volume.x_span()).floor(), x, row_y + volume.y_span_half());
            }
        }

        // Rows feeding an expanded child line up with the sub-inputs they feed.
        for &id in &row_members {
            if tree.get(id).is_node() {
                continue;
            }
            for (sub, sub_y) in nested_ports(tree, id, row_y, true) {
                let uns = tree.upstream_in(sub, &members);
                if let [un] = uns.as_slice() {
                    raise_row(&mut rows, &queued, tree.get(*un).draw_order_row, sub_y);
                }
            }
        }

        if let Some(&first) = row_members.first() {
            for un in tree.upstream_in(first, &members) {
                if tree.get(un).layout.is_last_in_row {
                    raise_row(&mut rows, &queued, tree.get(un).draw_order_row, row_y);
                }
            }
        }

        // Same for rows fed by an expanded child's sub-outputs.
        for &id in &row_members {
            if tree.get(id).is_node() {
                continue;
            }
            for (sub, sub_y) in nested_ports(tree, id, row_y, false) {
                let dns = tree.downstream_in(sub, &members);
                if let [dn] = dns.as_slice() {
                    raise_row(&mut rows, &queued, tree.get(*dn).draw_order_row, sub_y);
                }
            }
        }

        for &idx in &queued {
            let row = &rows[idx];
            if row.degenerate {
                continue;
            }
            let mut target = occupancy.peak(row.start, row.end).unwrap_or(-1.0) + row.pad;
            for &id in &row.members {
                let layout = &tree.get(id).layout;
                let Some(volume) = layout.active_volume() else {
                    continue;
                };
                let x = layout.x_relative;
                if let Some(peak) = occupancy.peak((x - volume.x_span()).floor(), x) {
                    target = target.max(peak + volume.y_span_half());
                }
            }
            let row = &mut rows[idx];
            row.y = row.y.max(target);
        }
    }

    for row in &rows {
        for &id in &row.members {
            tree.get_mut(id).layout.y_relative = row.y;
        }
    }
    warnings
}

/// Sub-inputs (or sub-outputs) of an expanded child with their height in the
/// current frame, lowest first.
fn nested_ports(tree: &OpTree, child: OpId, child_y: f32, inputs: bool) -> Vec<(OpId, f32)> {
    let op = tree.get(child);
    let mut ports: Vec<(OpId, f32)> = op
        .children
        .iter()
        .copied()
        .filter(|sub| {
            if inputs {
                tree.upstream_peers(*sub).is_empty()
            } else {
                tree.downstream_peers(*sub).is_empty()
            }
        })
        .map(|sub| (sub, child_y + tree.get(sub).layout.y_relative))
        .collect();
    ports.sort_by(|a, b| a.1.total_cmp(&b.1));
    ports
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupancy_blocks_inclusive_integer_cells() {
        let mut occupancy = Occupancy::default();
        occupancy.block(1.0, 3.5, 2.0);
        occupancy.block(3.0, 4.0, 1.0);
        assert_eq!(occupancy.peak(0.0, 0.0), Some(-1.0));
        assert_eq!(occupancy.peak(3.0, 3.0), Some(2.0));
        assert_eq!(occupancy.peak(4.0, 9.0), Some(1.0));
        assert_eq!(occupancy.peak(-5.0, -1.0), Some(-1.0));
        assert_eq!(occupancy.peak(2.0, 1.0), None);
    }

    fn x_then_rows(json: &str, config: &LayoutConfig) -> OpTree {
        let mut tree = OpTree::from_json(json).unwrap();
        let root = tree.root();
        super::super::ranking::place_group_x(&mut tree, root, config);
        assert!(place_group_rows(&mut tree, root, config).is_empty());
        tree
    }

    fn y_of(tree: &OpTree, key: &str) -> f32 {
        tree.get(tree.resolve(key).unwrap()).layout.y_relative
    }

    #[test]
    fn primary_rows_clear_the_previous_band() {
        let json = r#"{"node_id": "root", "name": "Root", "node_type": "module", "children": [
            {"node_id": "a", "name": "linear", "node_type": "function", "n_params": 10, "dns": ["b", "c"]},
            {"node_id": "b", "name": "linear", "node_type": "function", "n_params": 10, "uns": ["a"], "dns": ["d"]},
            {"node_id": "c", "name": "linear", "node_type": "function", "n_params": 10, "draw_order_row": 1, "uns": ["a"], "dns": ["d"]},
            {"node_id": "d", "name": "add", "node_type": "function", "uns": ["b", "c"]}
        ]}"#;
        let tree = x_then_rows(json, &LayoutConfig::default());
        assert_eq!(y_of(&tree, "a"), 0.0);
        // Row 0 claims height 1 over [0, 3]; row 1 pads 1 above that.
        assert_eq!(y_of(&tree, "c"), 2.0);
        assert!(tree.get(tree.resolve("d").unwrap()).layout.is_last_in_row);
    }

    #[test]
    fn secondary_rows_use_the_small_pad() {
        let json = r#"{"node_id": "root", "name": "Root", "node_type": "module", "children": [
            {"node_id": "a", "name": "relu", "node_type": "function", "dns": ["b", "c"]},
            {"node_id": "c", "name": "relu", "node_type": "function", "uns": ["a"]},
            {"node_id": "b", "name": "relu", "node_type": "function", "draw_order_row": 1, "uns": ["a"]}
        ]}"#;
        let tree = x_then_rows(json, &LayoutConfig::default());
        // Row 0 claims height 0.2; row 1 pads another 0.2 above it.
        assert!((y_of(&tree, "b") - 0.4).abs() < 1e-6);
    }

    #[test]
    fn unmeasurable_row_is_skipped_with_a_warning() {
        let json = r#"{"node_id": "root", "name": "Root", "node_type": "module", "children": [
            {"node_id": "a", "name": "relu", "node_type": "function", "dns": ["b", "c"]},
            {"node_id": "b", "name": "relu", "node_type": "function", "uns": ["a"], "dns": ["d"]},
            {"node_id": "c", "name": "relu", "node_type": "function", "draw_order_row": 1, "uns": ["a"]},
            {"node_id": "d", "name": "relu", "node_type": "function", "uns": ["b"]}
        ]}"#;
        // A NaN step leaves d without a usable x, so row 0 has no range.
        let config = LayoutConfig {
            same_row_step: f32::NAN,
            ..LayoutConfig::default()
        };
        let mut tree = OpTree::from_json(json).unwrap();
        let stats = crate::layout::compute_layout(&mut tree, &config);
        assert!(stats.warnings.iter().any(|warning| matches!(
            warning,
            LayoutWarning::EmptyRowRange { row: 0, start, .. } if *start == 0.0
        )));
        assert_eq!(y_of(&tree, "c"), 0.0);
    }
}
