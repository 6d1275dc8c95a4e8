mod ranking;
mod rows;
pub mod routing;
mod types;
pub mod volume;

pub use routing::{EdgeSet, EdgeWeight, FlowScale, RoutedEdge, route_edges};
pub use types::*;

use std::time::Instant;

use crate::config::{LayoutConfig, PlaneBuffer};
use crate::error::LayoutWarning;
use crate::ir::{OpId, OpKind, OpTree};

/// Runs one full layout pass over the visible part of the tree.
///
/// Every layout field is reset from the op's seed values first, so running the
/// pass twice without changing any collapsed flag yields identical geometry.
/// The absolute position each op held before the pass is kept in `prev_pos`.
pub fn compute_layout(tree: &mut OpTree, config: &LayoutConfig) -> LayoutStats {
    let started = Instant::now();
    let ids: Vec<OpId> = tree.ids().collect();
    for &id in &ids {
        let op = tree.get_mut(id);
        let prev_pos = op.layout.position();
        op.layout = OpLayout {
            x_relative: op.seed_x,
            y_relative: op.seed_y,
            prev_pos,
            ..OpLayout::default()
        };
    }

    volume::assign_volumes(tree, &config.volume);

    let mut warnings = Vec::new();
    let root = tree.root();
    layout_op(tree, root, config, &mut warnings);
    place_absolute(tree, root);
    mark_plane_bounds(tree, root, &config.plane_buffer);
    mark_should_draw(tree, config);

    let stats = collect_stats(tree, warnings);
    tracing::debug!(
        nodes = stats.visible_nodes,
        planes = stats.visible_planes,
        warnings = stats.warnings.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "layout pass finished"
    );
    stats
}

/// Post-order: children are sized and arranged in their parent's frame
/// before the parent's own extent is known.
fn layout_op(tree: &mut OpTree, id: OpId, config: &LayoutConfig, warnings: &mut Vec<LayoutWarning>) {
    if tree.get(id).is_node() {
        return;
    }
    let children = tree.get(id).children.clone();
    for &child in &children {
        layout_op(tree, child, config, warnings);
    }

    volume::prune_group_volumes(tree, &children, &config.volume);
    if let Some(warning) = ranking::place_group_x(tree, id, config) {
        warnings.push(warning);
    }
    warnings.extend(rows::place_group_rows(tree, id, config));
    if !config.show_structural_nodes {
        compact_structural_io(tree, id);
    }

    let (w, h) = children.iter().fold((0.0_f32, 0.0_f32), |(w, h), child| {
        let layout = &tree.get(*child).layout;
        (w.max(layout.x_relative + layout.w), h.max(layout.y_relative + layout.h))
    });
    let layout = &mut tree.get_mut(id).layout;
    layout.w = w;
    layout.h = h;
}

/// Pulls synthetic outputs (and, when possible, every non-input) one step left
/// so hidden IO markers do not leave gaps.
fn compact_structural_io(tree: &mut OpTree, parent: OpId) {
    let members = tree.get(parent).children.clone();
    let mut inputs_removable = true;

    for &id in &members {
        let op = tree.get(id);
        if op.kind.is_output_marker() {
            let uns = tree.upstream_peers(id);
            let extraneous = match uns.as_slice() {
                [un] => {
                    let un_op = tree.get(*un);
                    matches!(un_op.kind, OpKind::FnOut { .. } | OpKind::ModOut { .. })
                        && !un_op.layout.is_volume
                }
                _ => false,
            };
            if extraneous {
                tree.get_mut(id).layout.x_relative -= 2.0;
                let un = &mut tree.get_mut(uns[0]).layout;
                un.x_relative -= 1.0;
                un.extraneous_io = true;
            } else {
                tree.get_mut(id).layout.x_relative -= 1.0;
            }
        } else if tree.upstream_peers(id).is_empty() {
            let dns = tree.downstream_peers(id);
            if dns.len() > 1 || op.kind.is_global_input() {
                inputs_removable = false;
            } else if let [dn] = dns.as_slice()
                && tree.get(*dn).layout.y_relative != op.layout.y_relative
            {
                inputs_removable = false;
            }
        }
    }

    if inputs_removable {
        for &id in &members {
            if !tree.upstream_peers(id).is_empty() {
                tree.get_mut(id).layout.x_relative -= 1.0;
            }
        }
    }
}

/// Pre-order flattening of relative coordinates. Ops hidden under a collapsed
/// ancestor take that ancestor's position, which is where they reappear from.
fn place_absolute(tree: &mut OpTree, root: OpId) {
    let mut stack = vec![(root, 0.0_f32, 0.0_f32, false)];
    while let Some((id, x, y, hidden)) = stack.pop() {
        let op = tree.get_mut(id);
        op.layout.x = x;
        op.layout.y = y;
        let folded = hidden || op.is_node();
        let children = op.children.clone();
        for child in children {
            if folded {
                stack.push((child, x, y, true));
            } else {
                let layout = &tree.get(child).layout;
                stack.push((child, x + layout.x_relative, y + layout.y_relative, false));
            }
        }
    }
}

fn mark_plane_bounds(tree: &mut OpTree, id: OpId, buffer: &PlaneBuffer) -> PlaneInfo {
    let op = tree.get(id);
    let plane = if op.is_node() {
        PlaneInfo {
            min_x: op.layout.x - buffer.left,
            max_x: op.layout.x + buffer.right,
            min_y: op.layout.y - buffer.top,
            max_y: op.layout.y + buffer.bottom,
        }
    } else {
        let children = op.children.clone();
        let mut bounds = PlaneInfo {
            min_x: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            min_y: f32::INFINITY,
            max_y: f32::NEG_INFINITY,
        };
        for child in children {
            let inner = mark_plane_bounds(tree, child, buffer);
            bounds.min_x = bounds.min_x.min(inner.min_x);
            bounds.max_x = bounds.max_x.max(inner.max_x);
            bounds.min_y = bounds.min_y.min(inner.min_y);
            bounds.max_y = bounds.max_y.max(inner.max_y);
        }
        PlaneInfo {
            min_x: bounds.min_x - buffer.left,
            max_x: bounds.max_x + buffer.right,
            min_y: bounds.min_y - buffer.top,
            max_y: bounds.max_y + buffer.bottom,
        }
    };
    tree.get_mut(id).layout.plane = plane;
    plane
}

fn mark_should_draw(tree: &mut OpTree, config: &LayoutConfig) {
    for id in tree.visible_nodes() {
        let op = tree.get(id);
        let meaningful = match &op.kind {
            OpKind::Function | OpKind::Module | OpKind::FnOut { .. } | OpKind::ModOut { .. } => true,
            kind => kind.is_global_input(),
        };
        let should_draw = (meaningful && !op.layout.extraneous_io)
            || config.show_structural_nodes
            || op.layout.is_volume;
        tree.get_mut(id).layout.should_draw = should_draw;
    }
}

fn collect_stats(tree: &OpTree, warnings: Vec<LayoutWarning>) -> LayoutStats {
    let nodes = tree.visible_nodes();
    let planes = tree.visible_planes();
    let max_depth_visible = nodes
        .iter()
        .chain(&planes)
        .map(|id| tree.get(*id).depth)
        .max()
        .unwrap_or(0);

    let mut n_params: Vec<u64> = nodes.iter().filter_map(|id| tree.get(*id).n_params).collect();
    n_params.sort_unstable();
    let max_n_params_visible = if n_params.is_empty() {
        None
    } else {
        let idx = ((n_params.len() as f64 * 0.95) as usize).min(n_params.len() - 1);
        Some(n_params[idx])
    };

    LayoutStats {
        visible_nodes: nodes.len(),
        visible_planes: planes.len(),
        max_depth_visible,
        max_n_params_visible,
        warnings,
    }
}

/// Deepest level at which the cumulative number of ops shown stays within
/// the configured node budget, never shallower than the configured minimum.
pub fn default_depth(tree: &OpTree, config: &LayoutConfig) -> u32 {
    let max_depth = tree.max_depth();
    let mut per_depth = vec![0usize; max_depth as usize + 1];
    for id in tree.ids() {
        let op = tree.get(id);
        per_depth[op.depth as usize] += op.children.len();
    }

    let mut depth = max_depth;
    let mut shown = 0usize;
    for (level, count) in per_depth.iter().enumerate() {
        shown += count;
        if shown > config.default_depth_node_budget {
            depth = (level as u32).saturating_sub(1);
            break;
        }
    }
    depth.max(config.min_default_depth)
}
