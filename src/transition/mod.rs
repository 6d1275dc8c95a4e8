pub mod backend;
mod registry;
mod tween;

pub use backend::{
    RecordingBackend, SceneBackend, SceneCommand, SceneObject, Transform, VisualHandle, VisualKind,
};
pub use registry::{EdgeVisual, NodeVisual, PlaneVisual, VisualRegistry};
pub use tween::{Animator, Channel, TickOutcome, Tween, TweenValue};

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::ir::{OpId, OpTree};
use crate::layout::routing::{EdgeShape, curve_points, edge_key, route_points};
use crate::layout::{EdgeSet, PlaneInfo, Point};

const ZERO_SCALE: Point = Point::new(0.0, 0.0);
const UNIT_SCALE: Point = Point::new(1.0, 1.0);

/// Which ops were drawn as nodes and which as planes at one moment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Visibility {
    pub nodes: BTreeSet<OpId>,
    pub planes: BTreeSet<OpId>,
}

impl Visibility {
    pub fn capture(tree: &OpTree) -> Self {
        Self {
            nodes: tree.visible_nodes().into_iter().collect(),
            planes: tree.visible_planes().into_iter().collect(),
        }
    }

    pub fn contains(&self, id: OpId) -> bool {
        self.nodes.contains(&id) || self.planes.contains(&id)
    }
}

/// Where things come from and go to between two layout passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionPlan {
    /// Newly shown ops, and ops that opened into a plane, mapped to the
    /// position they grow out of.
    pub origins: BTreeMap<OpId, Point>,
    /// Ops no longer shown, mapped to the node they folded into.
    pub termini: BTreeMap<OpId, Point>,
    /// Planes that closed back into a node, mapped to that node's position.
    pub collapsed: BTreeMap<OpId, Point>,
}

impl TransitionPlan {
    /// Compares the visibility captured before a layout pass with the tree
    /// after it. Hidden ops sit on their visible ancestor after layout, and
    /// `prev_pos` still holds where each op was before.
    pub fn between(tree: &OpTree, before: &Visibility) -> Self {
        let after = Visibility::capture(tree);
        let mut plan = Self::default();
        for &id in after.nodes.iter().chain(&after.planes) {
            let reopened = after.planes.contains(&id) && before.nodes.contains(&id);
            if !before.contains(id) || reopened {
                plan.origins.insert(id, tree.get(id).layout.prev_pos);
            }
        }
        for &id in before.nodes.iter().chain(&before.planes) {
            if !after.contains(id) {
                plan.termini.insert(id, tree.get(id).layout.position());
            }
        }
        for &id in before.planes.intersection(&after.nodes) {
            plan.collapsed.insert(id, tree.get(id).layout.position());
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty() && self.termini.is_empty() && self.collapsed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileCounts {
    pub spawned_nodes: usize,
    pub moved_nodes: usize,
    pub respawned_nodes: usize,
    pub removed_nodes: usize,
    pub spawned_planes: usize,
    pub moved_planes: usize,
    pub removed_planes: usize,
    pub new_edges: usize,
    pub moved_edges: usize,
    pub recycled_edges: usize,
    pub collapsed_edges: usize,
    pub removed_edges: usize,
}

/// Output of one reconciliation: commands to apply right away, then tweens
/// to start together as one batch.
#[derive(Debug, Clone, Default)]
pub struct TransitionBatch {
    pub commands: Vec<SceneCommand>,
    pub tweens: Vec<Tween>,
    pub counts: ReconcileCounts,
}

/// Brings the visual registry in line with the current layout and edge set.
pub fn reconcile(
    tree: &OpTree,
    edges: &EdgeSet,
    registry: &mut VisualRegistry,
    plan: &TransitionPlan,
    config: &LayoutConfig,
) -> Result<TransitionBatch, LayoutError> {
    let mut batch = TransitionBatch::default();
    reconcile_planes(tree, registry, plan, config, &mut batch);
    reconcile_nodes(tree, registry, plan, config.tween_ms, &mut batch);
    reconcile_edges(tree, edges, registry, plan, config, &mut batch)?;

    let counts = &batch.counts;
    tracing::debug!(
        spawned_nodes = counts.spawned_nodes,
        moved_nodes = counts.moved_nodes,
        removed_nodes = counts.removed_nodes,
        new_edges = counts.new_edges,
        moved_edges = counts.moved_edges,
        recycled_edges = counts.recycled_edges,
        collapsed_edges = counts.collapsed_edges,
        removed_edges = counts.removed_edges,
        tweens = batch.tweens.len(),
        "reconciled visuals"
    );
    Ok(batch)
}

fn spawn(handle: VisualHandle, kind: VisualKind, owner: &str, transform: Transform) -> SceneCommand {
    SceneCommand::Spawn {
        handle,
        kind,
        owner: owner.to_string(),
        transform,
    }
}

// ── Nodes ───────────────────────────────────────────────────────────

fn reconcile_nodes(
    tree: &OpTree,
    registry: &mut VisualRegistry,
    plan: &TransitionPlan,
    duration: f32,
    batch: &mut TransitionBatch,
) {
    let drawn: Vec<OpId> = tree
        .visible_nodes()
        .into_iter()
        .filter(|id| tree.get(*id).layout.should_draw)
        .collect();
    let drawn_set: BTreeSet<OpId> = drawn.iter().copied().collect();

    let stale: Vec<OpId> = registry
        .nodes
        .keys()
        .copied()
        .filter(|id| !drawn_set.contains(id))
        .collect();
    for id in stale {
        let Some(visual) = registry.nodes.remove(&id) else {
            continue;
        };
        batch.counts.removed_nodes += 1;
        let despawn = SceneCommand::Despawn {
            handle: visual.handle,
        };
        match plan.termini.get(&id) {
            Some(&terminus) => batch.tweens.push(
                Tween::position(visual.handle, visual.position, terminus, duration).then(despawn),
            ),
            None => batch.commands.push(despawn),
        }
    }

    for id in drawn {
        let op = tree.get(id);
        let kind = op.layout.visual_kind();
        let target = op.layout.position();
        let existing = registry.nodes.get(&id).cloned();
        let visual = match existing {
            Some(visual) if visual.kind == kind => {
                if visual.position != target {
                    batch.tweens.push(Tween::position(visual.handle, visual.position, target, duration));
                    batch.counts.moved_nodes += 1;
                }
                NodeVisual {
                    position: target,
                    ..visual
                }
            }
            Some(visual) => {
                // Plain and volume nodes are different meshes.
                batch.commands.push(SceneCommand::Despawn {
                    handle: visual.handle,
                });
                let handle = registry.allocate();
                batch.commands.push(spawn(
                    handle,
                    VisualKind::Node(kind),
                    &op.key,
                    Transform::hidden_at(visual.position),
                ));
                batch.tweens.push(Tween::scale(handle, ZERO_SCALE, UNIT_SCALE, duration));
                if visual.position != target {
                    batch.tweens.push(Tween::position(handle, visual.position, target, duration));
                }
                batch.counts.respawned_nodes += 1;
                NodeVisual {
                    handle,
                    kind,
                    position: target,
                }
            }
            None => {
                let handle = registry.allocate();
                let node_kind = VisualKind::Node(kind);
                if let Some(&origin) = plan.origins.get(&id) {
                    batch.commands.push(spawn(handle, node_kind, &op.key, Transform::at(origin)));
                    if origin != target {
                        batch.tweens.push(Tween::position(handle, origin, target, duration));
                    }
                } else if plan.collapsed.contains_key(&id) {
                    batch.commands.push(spawn(handle, node_kind, &op.key, Transform::hidden_at(target)));
                    batch.tweens.push(Tween::scale(handle, ZERO_SCALE, UNIT_SCALE, duration));
                } else {
                    batch.commands.push(spawn(handle, node_kind, &op.key, Transform::at(target)));
                }
                batch.counts.spawned_nodes += 1;
                NodeVisual {
                    handle,
                    kind,
                    position: target,
                }
            }
        };
        registry.nodes.insert(id, visual);
    }
}

// ── Planes ──────────────────────────────────────────────────────────

fn plane_transform(bounds: &PlaneInfo) -> Transform {
    Transform {
        position: bounds.center(),
        scale: Point::new(bounds.width(), bounds.height()),
    }
}

fn outline_transform(bounds: &PlaneInfo, outline_width: f32) -> Transform {
    Transform {
        position: bounds.center(),
        scale: Point::new(bounds.width() + outline_width, bounds.height() + outline_width),
    }
}

fn label_position(bounds: &PlaneInfo) -> Point {
    Point::new(bounds.max_x, bounds.max_y)
}

fn push_transform_tweens(
    batch: &mut TransitionBatch,
    handle: VisualHandle,
    from: Transform,
    to: Transform,
    duration: f32,
    on_complete: Option<SceneCommand>,
) {
    batch.tweens.push(Tween::position(handle, from.position, to.position, duration));
    let scale = Tween::scale(handle, from.scale, to.scale, duration);
    batch.tweens.push(match on_complete {
        Some(command) => scale.then(command),
        None => scale,
    });
}

fn reconcile_planes(
    tree: &OpTree,
    registry: &mut VisualRegistry,
    plan: &TransitionPlan,
    config: &LayoutConfig,
    batch: &mut TransitionBatch,
) {
    let duration = config.tween_ms;
    let outline_width = config.plane_outline_width;
    let root = tree.root();
    let shown: Vec<OpId> = tree
        .visible_planes()
        .into_iter()
        .filter(|id| *id != root)
        .collect();
    let shown_set: BTreeSet<OpId> = shown.iter().copied().collect();

    let stale: Vec<OpId> = registry
        .planes
        .keys()
        .copied()
        .filter(|id| !shown_set.contains(id))
        .collect();
    for id in stale {
        let Some(visual) = registry.planes.remove(&id) else {
            continue;
        };
        batch.counts.removed_planes += 1;
        batch.commands.push(SceneCommand::Despawn {
            handle: visual.label,
        });
        let target = plan.termini.get(&id).or_else(|| plan.collapsed.get(&id)).copied();
        let shapes = [
            (visual.plane, plane_transform(&visual.bounds)),
            (visual.outline, outline_transform(&visual.bounds, outline_width)),
        ];
        for (handle, from) in shapes {
            let despawn = SceneCommand::Despawn { handle };
            match target {
                Some(target) => push_transform_tweens(
                    batch,
                    handle,
                    from,
                    Transform::hidden_at(target),
                    duration,
                    Some(despawn),
                ),
                None => batch.commands.push(despawn),
            }
        }
    }

    for id in shown {
        let op = tree.get(id);
        let bounds = op.layout.plane;
        let attach = |label: VisualHandle| SceneCommand::AttachLabel {
            handle: label,
            text: op.name.clone(),
            position: label_position(&bounds),
        };
        let existing = registry.planes.get(&id).cloned();
        let visual = match existing {
            Some(visual) => {
                if visual.bounds != bounds {
                    push_transform_tweens(
                        batch,
                        visual.plane,
                        plane_transform(&visual.bounds),
                        plane_transform(&bounds),
                        duration,
                        Some(attach(visual.label)),
                    );
                    push_transform_tweens(
                        batch,
                        visual.outline,
                        outline_transform(&visual.bounds, outline_width),
                        outline_transform(&bounds, outline_width),
                        duration,
                        None,
                    );
                    batch.counts.moved_planes += 1;
                }
                PlaneVisual { bounds, ..visual }
            }
            None => {
                let visual = PlaneVisual {
                    plane: registry.allocate(),
                    outline: registry.allocate(),
                    label: registry.allocate(),
                    bounds,
                };
                let plane_final = plane_transform(&bounds);
                let outline_final = outline_transform(&bounds, outline_width);
                batch.commands.push(spawn(
                    visual.label,
                    VisualKind::PlaneLabel,
                    &op.key,
                    Transform::at(label_position(&bounds)),
                ));
                match plan.origins.get(&id) {
                    Some(&origin) => {
                        let start = Transform::hidden_at(origin);
                        batch.commands.push(spawn(visual.plane, VisualKind::Plane, &op.key, start));
                        batch.commands.push(spawn(visual.outline, VisualKind::PlaneOutline, &op.key, start));
                        push_transform_tweens(
                            batch,
                            visual.plane,
                            start,
                            plane_final,
                            duration,
                            Some(attach(visual.label)),
                        );
                        push_transform_tweens(batch, visual.outline, start, outline_final, duration, None);
                    }
                    None => {
                        batch.commands.push(spawn(visual.plane, VisualKind::Plane, &op.key, plane_final));
                        batch.commands.push(spawn(
                            visual.outline,
                            VisualKind::PlaneOutline,
                            &op.key,
                            outline_final,
                        ));
                        batch.commands.push(attach(visual.label));
                    }
                }
                batch.counts.spawned_planes += 1;
                visual
            }
        };
        registry.planes.insert(id, visual);
    }
}

// ── Edges ───────────────────────────────────────────────────────────

/// Re-samples a path as a curve between its own ends so it has `len` points.
fn resample(points: &[Point], len: usize) -> Vec<Point> {
    if points.len() == len {
        return points.to_vec();
    }
    match (points.first(), points.last()) {
        (Some(&first), Some(&last)) => curve_points(first, last, len.saturating_sub(1)),
        _ => vec![Point::default(); len],
    }
}

/// Point tween between two paths of possibly different length. The shorter
/// one is re-sampled for the tween; a shortened target is restored when the
/// tween completes.
fn morph(
    handle: VisualHandle,
    from: &[Point],
    to: &[Point],
    duration: f32,
) -> Result<Tween, LayoutError> {
    let len = from.len().max(to.len());
    let start = resample(from, len);
    let end = resample(to, len);
    let tween = Tween::points(handle, start, end, duration)?;
    Ok(if to.len() == len {
        tween
    } else {
        tween.then(SceneCommand::SetPoints {
            handle,
            points: to.to_vec(),
        })
    })
}

fn reconcile_edges(
    tree: &OpTree,
    edges: &EdgeSet,
    registry: &mut VisualRegistry,
    plan: &TransitionPlan,
    config: &LayoutConfig,
    batch: &mut TransitionBatch,
) -> Result<(), LayoutError> {
    let duration = config.tween_ms;
    for (key, visual) in registry.edges.iter_mut() {
        visual.still_exists = edges.contains(key);
        visual.recycled = false;
    }

    let stale: Vec<String> = registry
        .edges
        .iter()
        .filter(|(_, visual)| !visual.still_exists)
        .map(|(key, _)| key.clone())
        .collect();
    for key in stale {
        let Some(mut visual) = registry.edges.remove(&key) else {
            continue;
        };
        let from_folded = plan.termini.contains_key(&visual.from);
        let to_folded = plan.termini.contains_key(&visual.to);
        if !from_folded && !to_folded {
            batch.commands.push(SceneCommand::Despawn {
                handle: visual.handle,
            });
            batch.counts.removed_edges += 1;
            continue;
        }

        let fold = |id: OpId, folded: bool| {
            if folded {
                tree.visible_ancestor(id).unwrap_or(id)
            } else {
                id
            }
        };
        let from = fold(visual.from, from_folded);
        let to = fold(visual.to, to_folded);
        if from != to {
            let recycled_key = edge_key(tree, from, to);
            if edges.contains(&recycled_key) && !registry.edges.contains_key(&recycled_key) {
                visual.from = from;
                visual.to = to;
                visual.still_exists = true;
                visual.recycled = true;
                registry.edges.insert(recycled_key, visual);
                batch.counts.recycled_edges += 1;
                continue;
            }
        }

        let terminus = plan
            .termini
            .get(&visual.to)
            .or_else(|| plan.termini.get(&visual.from))
            .copied()
            .unwrap_or_default();
        let folded = vec![terminus; visual.points.len()];
        let handle = visual.handle;
        batch.tweens.push(
            Tween::points(handle, visual.points, folded, duration)?
                .then(SceneCommand::Despawn { handle }),
        );
        batch.counts.collapsed_edges += 1;
    }

    for edge in edges {
        if let Some(visual) = registry.edges.get_mut(&edge.key) {
            if visual.weight != edge.weight {
                batch.commands.push(SceneCommand::Restyle {
                    handle: visual.handle,
                    weight: edge.weight,
                });
                visual.weight = edge.weight;
            }
            if visual.points != edge.points {
                batch.tweens.push(morph(visual.handle, &visual.points, &edge.points, duration)?);
                visual.points = edge.points.clone();
                batch.counts.moved_edges += 1;
            }
            visual.from = edge.from;
            visual.to = edge.to;
            continue;
        }

        let handle = registry.allocate();
        let grows = plan.origins.contains_key(&edge.from) || plan.origins.contains_key(&edge.to);
        let spawn_points = if grows {
            // Start from where both ends were before the pass; ends that just
            // appeared were sitting on the op they grow out of.
            let start = route_points(
                tree.get(edge.from).layout.prev_pos,
                tree.get(edge.to).layout.prev_pos,
                EdgeShape::CURVED,
                &config.edges,
            );
            batch.tweens.push(morph(handle, &start, &edge.points, duration)?);
            resample(&start, start.len().max(edge.points.len()))
        } else {
            edge.points.clone()
        };
        batch.commands.push(SceneCommand::SpawnEdge {
            handle,
            owner: edge.key.clone(),
            points: spawn_points,
            weight: edge.weight,
        });
        registry.edges.insert(
            edge.key.clone(),
            EdgeVisual {
                handle,
                from: edge.from,
                to: edge.to,
                points: edge.points.clone(),
                weight: edge.weight,
                still_exists: true,
                recycled: false,
            },
        );
        batch.counts.new_edges += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{compute_layout, route_edges};

    const BLOCK: &str = r#"{
        "node_id": "root", "name": "Root", "node_type": "module", "collapsed": false,
        "children": [
            {"node_id": "x", "name": "embed", "node_type": "function", "dns": ["m", "m.f"]},
            {"node_id": "m", "name": "Block", "node_type": "module", "depth": 1, "collapsed": true,
             "uns": ["x"], "dns": ["h"],
             "children": [
                {"node_id": "m.f", "name": "linear", "node_type": "function", "depth": 2,
                 "uns": ["x"], "dns": ["m.g"]},
                {"node_id": "m.g", "name": "relu", "node_type": "function", "depth": 2,
                 "uns": ["m.f"], "dns": ["h"]}
             ]},
            {"node_id": "h", "name": "head", "node_type": "function", "uns": ["m", "m.g"]}
        ]
    }"#;

    struct Harness {
        tree: OpTree,
        registry: VisualRegistry,
        config: LayoutConfig,
        backend: RecordingBackend,
    }

    impl Harness {
        fn new() -> Self {
            let mut harness = Self {
                tree: OpTree::from_json(BLOCK).unwrap(),
                registry: VisualRegistry::new(),
                config: LayoutConfig::default(),
                backend: RecordingBackend::new(),
            };
            harness.pass();
            harness
        }

        fn id(&self, key: &str) -> OpId {
            self.tree.resolve(key).unwrap()
        }

        fn set_collapsed(&mut self, key: &str, collapsed: bool) -> TransitionBatch {
            let id = self.id(key);
            self.tree.get_mut(id).collapsed = collapsed;
            self.pass()
        }

        fn pass(&mut self) -> TransitionBatch {
            let before = Visibility::capture(&self.tree);
            compute_layout(&mut self.tree, &self.config);
            let plan = TransitionPlan::between(&self.tree, &before);
            let edges = route_edges(&self.tree, &self.config);
            let batch = reconcile(&self.tree, &edges, &mut self.registry, &plan, &self.config).unwrap();
            for command in &batch.commands {
                self.backend.apply(command);
            }
            batch
        }
    }

    fn position_tween(batch: &TransitionBatch, handle: VisualHandle) -> Option<(Point, Point)> {
        batch.tweens.iter().find_map(|tween| match tween.value {
            TweenValue::Position { from, to } if tween.handle == handle => Some((from, to)),
            _ => None,
        })
    }

    #[test]
    fn first_pass_spawns_everything_in_place() {
        let harness = Harness::new();
        let node = harness.backend.node_of("h").unwrap();
        assert_eq!(node.transform, Transform::at(Point::new(2.0, 0.0)));
        assert!(harness.backend.edge_of("xm").is_some());
        assert!(harness.backend.edge_of("mh").is_some());
        assert_eq!(harness.registry.nodes.len(), 3);
        assert!(harness.registry.planes.is_empty());
    }

    #[test]
    fn plan_tracks_origins_and_termini() {
        let mut tree = OpTree::from_json(BLOCK).unwrap();
        let config = LayoutConfig::default();
        compute_layout(&mut tree, &config);
        let m = tree.resolve("m").unwrap();
        let before = Visibility::capture(&tree);
        tree.get_mut(m).collapsed = false;
        compute_layout(&mut tree, &config);
        let plan = TransitionPlan::between(&tree, &before);
        let m_was = Point::new(1.0, 0.0);
        assert_eq!(plan.origins.get(&m), Some(&m_was));
        assert_eq!(plan.origins.get(&tree.resolve("m.g").unwrap()), Some(&m_was));
        assert!(plan.termini.is_empty());
        assert!(plan.collapsed.is_empty());
    }

    #[test]
    fn expanded_children_grow_out_of_the_module() {
        let mut harness = Harness::new();
        let batch = harness.set_collapsed("m", false);

        let m_was = Point::new(1.0, 0.0);
        let g = harness.registry.node(harness.id("m.g")).unwrap().handle;
        assert_eq!(harness.backend.node_of("m.g").unwrap().transform.position, m_was);
        assert_eq!(position_tween(&batch, g), Some((m_was, Point::new(2.0, 0.0))));
        // The module's own node is replaced by its plane.
        assert!(harness.registry.node(harness.id("m")).is_none());
        assert_eq!(batch.counts.spawned_planes, 1);
        assert_eq!(batch.counts.removed_edges, 2);

        let h = harness.registry.node(harness.id("h")).unwrap().handle;
        assert_eq!(position_tween(&batch, h), Some((Point::new(2.0, 0.0), Point::new(3.0, 0.0))));

        // The label waits for the plane to finish growing.
        assert!(harness.backend.objects_of("m").all(|(_, object)| object.label.is_none()));
        let plane = harness.registry.plane(harness.id("m")).unwrap().clone();
        assert!(batch.tweens.iter().any(|tween| {
            tween.handle == plane.plane
                && matches!(&tween.on_complete[..], [SceneCommand::AttachLabel { handle, .. }] if *handle == plane.label)
        }));
    }

    #[test]
    fn collapsing_recycles_and_folds_edges() {
        let mut harness = Harness::new();
        harness.set_collapsed("m", false);
        let inner = harness.registry.edge("m.fm.g").unwrap().handle;
        let batch = harness.set_collapsed("m", true);

        assert_eq!(batch.counts.recycled_edges, 2);
        assert_eq!(batch.counts.collapsed_edges, 1);
        assert!(harness.registry.edge("xm").unwrap().recycled);
        let fold = batch.tweens.iter().find(|tween| tween.handle == inner).unwrap();
        match &fold.value {
            TweenValue::Points { to, .. } => {
                assert!(to.iter().all(|point| *point == Point::new(1.0, 0.0)));
            }
            other => panic!("unexpected tween {other:?}"),
        }
        assert_eq!(fold.on_complete, vec![SceneCommand::Despawn { handle: inner }]);

        // The module node scales back in where its plane closes.
        let m = harness.registry.node(harness.id("m")).unwrap().handle;
        assert_eq!(
            harness.backend.objects.get(&m).unwrap().transform,
            Transform::hidden_at(Point::new(1.0, 0.0))
        );
        assert_eq!(batch.counts.removed_planes, 1);
    }

    #[test]
    fn straight_and_bent_paths_morph_with_equal_lengths() {
        let straight = vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0)];
        let bent = route_points(
            Point::new(0.0, 0.0),
            Point::new(4.0, 2.0),
            EdgeShape::CURVED,
            &LayoutConfig::default().edges,
        );
        let tween = morph(5, &straight, &bent, 600.0).unwrap();
        match &tween.value {
            TweenValue::Points { from, to } => assert_eq!(from.len(), to.len()),
            other => panic!("unexpected tween {other:?}"),
        }
        assert!(tween.on_complete.is_empty());

        let back = morph(5, &bent, &straight, 600.0).unwrap();
        assert_eq!(
            back.on_complete,
            vec![SceneCommand::SetPoints {
                handle: 5,
                points: straight
            }]
        );
    }
}
