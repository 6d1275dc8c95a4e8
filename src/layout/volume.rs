use crate::config::VolumeConfig;
use crate::ir::{DimType, Op, OpId, OpKind, OpTree};

use super::ActivationVolume;

/// Derives the box footprint of a tensor node from its shape metadata.
///
/// Only one feature dimension plus two spatial dimensions qualify; two
/// spatial dimensions with no feature dimension imply a single channel.
/// Anything else, including missing or mismatched metadata, returns `None`.
pub fn volume_specs(op: &Op, config: &VolumeConfig) -> Option<ActivationVolume> {
    let shape = op.shape.as_ref()?;
    let dim_types = op.dim_types.as_ref()?;

    let mut features = Vec::new();
    let mut spatial = Vec::new();
    for (idx, dim) in dim_types.iter().enumerate() {
        let Some(extent) = shape.get(idx).copied() else {
            return None;
        };
        match dim {
            DimType::Features => features.push(extent),
            DimType::Spatial => spatial.push(extent),
            DimType::Batch | DimType::Unknown => {}
        }
    }

    let channels = match (features.as_slice(), spatial.len()) {
        ([channels], 2) => *channels,
        ([], 2) => 1.0,
        _ => return None,
    };

    let height = (spatial[0] * config.spatial_scalar + config.min_spatial).min(config.max_spatial);
    let width = (spatial[1] * config.spatial_scalar + config.min_spatial).min(config.max_spatial);
    let raw_depth = channels * config.channel_scalar;
    let (depth, depth_overflow) = if raw_depth > config.max_depth {
        (config.max_depth, raw_depth - config.max_depth)
    } else {
        (raw_depth, 0.0)
    };

    Some(ActivationVolume {
        width,
        height,
        depth,
        depth_overflow,
    })
}

fn is_eligible(tree: &OpTree, op: &Op, config: &VolumeConfig) -> bool {
    if !config.enabled || !op.kind.is_tensor_node() {
        return false;
    }
    if op.kind.is_global_input() || op.kind.is_global_output() {
        return true;
    }
    match &op.kind {
        // Drawn only while the module that produced it is shown collapsed.
        OpKind::ModOut { from_module } => from_module.is_some_and(|module| tree.get(module).collapsed),
        OpKind::FnOut {
            created_by_fn: Some(name),
        } => config.always_fns.contains(name) || config.reshape_fns.contains(name),
        _ => false,
    }
}

/// Attaches volume specs to every visible collapsed tensor node that qualifies.
pub(super) fn assign_volumes(tree: &mut OpTree, config: &VolumeConfig) {
    for id in tree.visible_nodes() {
        let op = tree.get(id);
        let volume = if is_eligible(tree, op, config) {
            volume_specs(op, config)
        } else {
            None
        };
        let layout = &mut tree.get_mut(id).layout;
        // Channels past the depth cap make long thin boxes; those stay plain.
        layout.is_volume = volume.is_some_and(|volume| volume.depth_overflow <= 0.0);
        layout.volume = volume;
    }
}

/// Within each row of a sibling group, an activation volume identical to the
/// next one along and close to it in seed x falls back to a plain node.
pub(super) fn prune_group_volumes(tree: &mut OpTree, members: &[OpId], config: &VolumeConfig) {
    let mut rows: Vec<(i64, Vec<OpId>)> = Vec::new();
    for &id in members {
        let op = tree.get(id);
        if !op.layout.is_volume {
            continue;
        }
        match rows.iter_mut().find(|(row, _)| *row == op.draw_order_row) {
            Some((_, ids)) => ids.push(id),
            None => rows.push((op.draw_order_row, vec![id])),
        }
    }

    for (_, mut ids) in rows {
        ids.sort_by(|a, b| tree.get(*a).seed_x.total_cmp(&tree.get(*b).seed_x));
        for pair in ids.windows(2) {
            let (prev, next) = (tree.get(pair[0]), tree.get(pair[1]));
            let (Some(prev_dims), Some(next_dims)) = (prev.layout.volume, next.layout.volume) else {
                continue;
            };
            let close = next.seed_x - prev.seed_x < config.prune_window;
            if prev_dims.same_dims(&next_dims) && !prev.kind.is_global_input() && close {
                tree.get_mut(pair[0]).layout.is_volume = false;
            }
        }
    }
}
