use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::error::LayoutWarning;
use crate::ir::{OpId, OpTree};

/// Per-group scratch state for the forward nudge. Positions are kept in f64
/// because the global-input pass works around a large negative seed.
struct Nudge {
    x: Vec<f64>,
    w: Vec<f64>,
    /// Rounded depth span of a volume, added to the gap in front of it.
    span: Vec<f64>,
    step: Vec<f64>,
    dns: Vec<Vec<usize>>,
    traversed: Vec<bool>,
    fully_marked: Vec<bool>,
    placed: Vec<bool>,
    visits: usize,
    cap: usize,
    capped: bool,
}

impl Nudge {
    fn new(tree: &OpTree, members: &[OpId], config: &LayoutConfig) -> Self {
        let slots: HashMap<OpId, usize> = members
            .iter()
            .enumerate()
            .map(|(slot, id)| (*id, slot))
            .collect();
        let seed = -(config.global_input_seed as f64);
        let mut dns = Vec::with_capacity(members.len());
        let mut step = Vec::with_capacity(members.len());
        let mut w = Vec::with_capacity(members.len());
        let mut span = Vec::with_capacity(members.len());
        for &id in members {
            let op = tree.get(id);
            let peers: Vec<usize> = tree
                .downstream_peers(id)
                .into_iter()
                .filter_map(|dn| slots.get(&dn).copied())
                .collect();
            let same_row = peers
                .iter()
                .all(|slot| tree.get(members[*slot]).draw_order_row == op.draw_order_row);
            step.push(if same_row {
                config.same_row_step as f64
            } else {
                config.cross_row_step as f64
            });
            dns.push(peers);
            w.push(op.layout.w as f64);
            span.push(
                op.layout
                    .active_volume()
                    .map(|volume| volume.x_span().round() as f64)
                    .unwrap_or(0.0),
            );
        }
        Self {
            x: vec![seed; members.len()],
            w,
            span,
            step,
            dns,
            traversed: vec![false; members.len()],
            fully_marked: vec![false; members.len()],
            placed: vec![false; members.len()],
            visits: 0,
            cap: config.max_nudge_visits,
            capped: false,
        }
    }

    fn enter(&mut self, slot: usize) -> bool {
        if self.visits >= self.cap {
            self.capped = true;
            return false;
        }
        self.visits += 1;
        self.traversed[slot] = true;
        true
    }

    fn threshold(&self, from: usize, to: usize) -> f64 {
        self.x[from] + self.w[from] + self.span[to]
    }

    /// Depth-first push of successors past their predecessor. Only the first
    /// predecessor that reaches a node moves it; later visits recurse only
    /// into nodes not seen before.
    fn nudge_forward(&mut self, start: usize) {
        if !self.enter(start) {
            return;
        }
        let mut stack = vec![(start, 0usize)];
        while let Some(&(op, next)) = stack.last() {
            let Some(&dn) = self.dns[op].get(next) else {
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            let threshold = self.threshold(op, dn);
            let descend = if self.x[dn] <= threshold {
                self.x[dn] = threshold + self.step[op];
                self.fully_marked[dn] = true;
                self.placed[dn] = true;
                true
            } else {
                !self.traversed[dn]
            };
            if descend {
                if !self.enter(dn) {
                    return;
                }
                stack.push((dn, 0));
            }
        }
    }

    /// Same walk for an input that is not pinned to the left edge: the branch
    /// is marked from a far-left seed, then shifted right by the smallest slack
    /// found against nodes another input already placed.
    fn snap_global(&mut self, start: usize, seed: f64) {
        self.x[start] = -seed;
        self.placed[start] = true;
        let mut branch = vec![start];
        let mut slack: Vec<f64> = Vec::new();

        if self.enter(start) {
            let mut stack = vec![(start, 0usize)];
            while let Some(&(op, next)) = stack.last() {
                let Some(&dn) = self.dns[op].get(next) else {
                    stack.pop();
                    continue;
                };
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                if self.fully_marked[dn] {
                    slack.push(self.x[dn] - self.x[op] - self.step[op] - self.w[op] - self.span[dn]);
                    continue;
                }
                let threshold = self.threshold(op, dn);
                let descend = if self.x[dn] <= threshold {
                    self.x[dn] = threshold + self.step[op];
                    self.placed[dn] = true;
                    branch.push(dn);
                    true
                } else {
                    !self.traversed[dn]
                };
                if descend {
                    if !self.enter(dn) {
                        break;
                    }
                    stack.push((dn, 0));
                }
            }
        }

        let shift = slack.into_iter().reduce(f64::min).unwrap_or(seed);
        branch.sort_unstable();
        branch.dedup();
        for slot in branch {
            self.x[slot] += shift;
            self.fully_marked[slot] = true;
        }
    }
}

/// Assigns `x_relative` to every child of an expanded op.
///
/// Inputs are the children with no dataflow predecessor inside the group.
/// Children never reached from any input end up on the left edge.
pub(super) fn place_group_x(
    tree: &mut OpTree,
    parent: OpId,
    config: &LayoutConfig,
) -> Option<LayoutWarning> {
    let members = tree.get(parent).children.clone();
    if members.is_empty() {
        return None;
    }
    let mut nudge = Nudge::new(tree, &members, config);

    let mut inputs: Vec<usize> = (0..members.len())
        .filter(|slot| tree.upstream_peers(members[*slot]).is_empty())
        .collect();
    inputs.sort_by(|a, b| {
        tree.get(members[*a])
            .input_priority
            .total_cmp(&tree.get(members[*b]).input_priority)
    });
    let (global, standard): (Vec<usize>, Vec<usize>) = inputs
        .iter()
        .partition(|slot| tree.get(members[**slot]).kind.is_global_input());

    for &slot in &standard {
        nudge.placed[slot] = true;
        nudge.nudge_forward(slot);
    }
    let seed = config.global_input_seed as f64;
    for &slot in &global {
        nudge.snap_global(slot, seed);
    }

    let anchor = if inputs.is_empty() {
        nudge.x.iter().copied().reduce(f64::min)
    } else {
        inputs.iter().map(|slot| nudge.x[*slot]).reduce(f64::min)
    }
    .unwrap_or(0.0);

    let mut x: Vec<f32> = nudge
        .x
        .iter()
        .zip(&nudge.placed)
        .map(|(value, placed)| if *placed { (value - anchor) as f32 } else { 0.0 })
        .collect();
    for &slot in &standard {
        x[slot] = 0.0;
    }

    let max_x = x.iter().copied().fold(0.0_f32, f32::max);
    for (slot, id) in members.iter().enumerate() {
        if tree.get(*id).kind.is_output_marker() {
            x[slot] = max_x;
        }
    }

    // Extension and elbow nodes sit one step off their single neighbour.
    let slot_of: HashMap<OpId, usize> = members
        .iter()
        .enumerate()
        .map(|(slot, id)| (*id, slot))
        .collect();
    for (slot, id) in members.iter().enumerate() {
        let Some(pre_elbow) = tree.get(*id).kind.structural_offset() else {
            continue;
        };
        if pre_elbow {
            let upstream = tree
                .upstream_peers(*id)
                .first()
                .and_then(|un| slot_of.get(un).copied());
            if let Some(un) = upstream {
                x[slot] = x[un] + config.structural_offset;
            }
        } else {
            let nearest = tree
                .downstream_peers(*id)
                .iter()
                .filter_map(|dn| slot_of.get(dn).map(|dn_slot| x[*dn_slot]))
                .reduce(f32::min);
            if let Some(dn_x) = nearest {
                x[slot] = dn_x - config.structural_offset;
            }
        }
    }

    for (slot, id) in members.iter().enumerate() {
        tree.get_mut(*id).layout.x_relative = x[slot];
    }

    if nudge.capped {
        let warning = LayoutWarning::NudgeVisitCap {
            parent: tree.get(parent).key.clone(),
            visits: nudge.visits,
        };
        tracing::warn!(%warning, "horizontal placement returned a partial result");
        return Some(warning);
    }
    None
}
