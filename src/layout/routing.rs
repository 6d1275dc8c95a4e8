use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::config::{EdgeStyleConfig, LayoutConfig};
use crate::ir::{OpId, OpTree};

use super::Point;

// ── Curve shaping ───────────────────────────────────────────────────
/// Inner control points sit this fraction of the horizontal span in from each end.
const CONTROL_X_INSET: f32 = 0.05;
/// Same, for the vertical span.
const CONTROL_Y_INSET: f32 = 0.02;
/// Chordal parameterization: knot spacing follows straight-line distance.
const CHORDAL_EXPONENT: f32 = 0.5;
const MIN_KNOT_SPACING: f32 = 1e-4;

/// How an edge may be drawn, derived from its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeShape {
    /// Both endpoints share a parent and a row and neither can expand, so
    /// the edge can never bend and two points are enough.
    pub straight: bool,
    /// Source is the last node of its row, so the bend goes at the target end.
    pub source_last_in_row: bool,
}

impl EdgeShape {
    pub fn between(tree: &OpTree, from: OpId, to: OpId) -> Self {
        let (a, b) = (tree.get(from), tree.get(to));
        let straight = a.parent == b.parent
            && a.draw_order_row == b.draw_order_row
            && a.children.is_empty()
            && b.children.is_empty();
        Self {
            straight,
            source_last_in_row: a.layout.is_last_in_row,
        }
    }

    /// Shape used when either end is morphing in or out of a group.
    pub const CURVED: EdgeShape = EdgeShape {
        straight: false,
        source_last_in_row: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeWeight {
    pub line_width: f32,
    pub brightness: f32,
}

impl Default for EdgeWeight {
    fn default() -> Self {
        Self {
            line_width: 1.0,
            brightness: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEdge {
    pub key: String,
    pub from: OpId,
    pub to: OpId,
    pub shape: EdgeShape,
    pub points: Vec<Point>,
    pub weight: EdgeWeight,
}

/// Flow range of the edges currently drawn, in square-root space, with the
/// outer percentiles clipped off.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowScale {
    pub low: f32,
    pub high: f32,
}

impl FlowScale {
    pub fn from_flows(flows: impl IntoIterator<Item = f32>, percentile: f32) -> Self {
        let mut values: Vec<f32> = flows.into_iter().map(|flow| flow.max(0.0).sqrt()).collect();
        if values.is_empty() {
            return Self::default();
        }
        values.sort_by(f32::total_cmp);
        let clip = ((values.len() as f32 * percentile) as usize).min((values.len() - 1) / 2);
        Self {
            low: values[clip],
            high: values[values.len() - clip - 1],
        }
    }

    /// Position of a flow within the range, clamped to `[0, 1]`. A range with
    /// no spread maps everything to the middle.
    pub fn normalize(&self, flow: f32) -> f32 {
        let spread = self.high - self.low;
        if spread <= f32::EPSILON {
            return 0.5;
        }
        ((flow.max(0.0).sqrt() - self.low) / spread).clamp(0.0, 1.0)
    }

    pub fn weight(&self, flow: Option<f32>, style: &EdgeStyleConfig) -> EdgeWeight {
        let Some(flow) = flow else {
            return EdgeWeight::default();
        };
        let t = self.normalize(flow);
        EdgeWeight {
            line_width: lerp(style.min_line_width, style.max_line_width, t),
            brightness: lerp(style.min_flow_brightness, style.max_flow_brightness, t),
        }
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Routed edges in discovery order, indexed by edge key.
#[derive(Debug, Clone, Default)]
pub struct EdgeSet {
    edges: Vec<RoutedEdge>,
    by_key: BTreeMap<String, usize>,
    pub flow: FlowScale,
}

impl EdgeSet {
    pub fn new(edges: Vec<RoutedEdge>, flow: FlowScale) -> Self {
        let by_key = edges
            .iter()
            .enumerate()
            .map(|(idx, edge)| (edge.key.clone(), idx))
            .collect();
        Self { edges, by_key, flow }
    }

    pub fn get(&self, key: &str) -> Option<&RoutedEdge> {
        self.by_key.get(key).map(|idx| &self.edges[*idx])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RoutedEdge> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl<'a> IntoIterator for &'a EdgeSet {
    type Item = &'a RoutedEdge;
    type IntoIter = std::slice::Iter<'a, RoutedEdge>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.iter()
    }
}

pub fn edge_key(tree: &OpTree, from: OpId, to: OpId) -> String {
    format!("{}{}", tree.get(from).key, tree.get(to).key)
}

/// Flow carried by an edge: the source's, or else the target's.
pub fn edge_flow(tree: &OpTree, from: OpId, to: OpId) -> Option<f32> {
    tree.get(from).flow.or(tree.get(to).flow)
}

/// Samples a chordal Catmull-Rom spline through four control points.
/// Returns `samples + 1` points, first and last on the end controls.
pub fn catmull_rom(controls: &[Point; 4], samples: usize) -> Vec<Point> {
    let samples = samples.max(1);
    (0..=samples)
        .map(|idx| sample_catmull_rom(controls, idx as f32 / samples as f32))
        .collect()
}

fn sample_catmull_rom(pts: &[Point; 4], t: f32) -> Point {
    let last = pts.len() - 1;
    let p = last as f32 * t;
    let mut segment = p.floor() as usize;
    let mut weight = p - segment as f32;
    if segment >= last {
        segment = last - 1;
        weight = 1.0;
    }

    let extrapolate = |anchor: Point, away: Point| Point::new(2.0 * anchor.x - away.x, 2.0 * anchor.y - away.y);
    let p0 = if segment > 0 {
        pts[segment - 1]
    } else {
        extrapolate(pts[0], pts[1])
    };
    let p1 = pts[segment];
    let p2 = pts[segment + 1];
    let p3 = if segment + 2 <= last {
        pts[segment + 2]
    } else {
        extrapolate(pts[last], pts[last - 1])
    };

    let knot = |a: Point, b: Point| {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        (dx * dx + dy * dy).powf(CHORDAL_EXPONENT)
    };
    let mut dt1 = knot(p1, p2);
    let mut dt0 = knot(p0, p1);
    let mut dt2 = knot(p2, p3);
    if dt1 < MIN_KNOT_SPACING {
        dt1 = 1.0;
    }
    if dt0 < MIN_KNOT_SPACING {
        dt0 = dt1;
    }
    if dt2 < MIN_KNOT_SPACING {
        dt2 = dt1;
    }

    let axis = |x0: f32, x1: f32, x2: f32, x3: f32| {
        let t1 = ((x1 - x0) / dt0 - (x2 - x0) / (dt0 + dt1) + (x2 - x1) / dt1) * dt1;
        let t2 = ((x2 - x1) / dt1 - (x3 - x1) / (dt1 + dt2) + (x3 - x2) / dt2) * dt1;
        let c2 = -3.0 * x1 + 3.0 * x2 - 2.0 * t1 - t2;
        let c3 = 2.0 * x1 - 2.0 * x2 + t1 + t2;
        x1 + weight * (t1 + weight * (c2 + weight * c3))
    };
    Point::new(
        axis(p0.x, p1.x, p2.x, p3.x),
        axis(p0.y, p1.y, p2.y, p3.y),
    )
}

/// A gentle S-curve from `from` to `to` with `samples + 1` points.
pub fn curve_points(from: Point, to: Point, samples: usize) -> Vec<Point> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let controls = [
        from,
        Point::new(from.x + dx * CONTROL_X_INSET, from.y + dy * CONTROL_Y_INSET),
        Point::new(to.x - dx * CONTROL_X_INSET, to.y - dy * CONTROL_Y_INSET),
        to,
    ];
    catmull_rom(&controls, samples)
}

/// Point path for one edge. Straight edges get two points; every other edge
/// gets `curve_points + 1` so it can morph into any other bent shape.
pub fn route_points(from: Point, to: Point, shape: EdgeShape, style: &EdgeStyleConfig) -> Vec<Point> {
    let samples = style.curve_points;
    if from.y == to.y {
        return if shape.straight {
            vec![from, to]
        } else {
            curve_points(from, to, samples)
        };
    }
    if to.x - from.x > style.elbow_min_gap {
        let short = samples.saturating_sub(2).max(1);
        if shape.source_last_in_row {
            let elbow = Point::new(to.x - style.elbow_offset, from.y);
            let mut points = vec![from, elbow];
            points.extend(curve_points(elbow, to, short));
            points
        } else {
            let elbow = Point::new(from.x + style.elbow_offset, to.y);
            let mut points = curve_points(from, elbow, short);
            points.extend([elbow, to]);
            points
        }
    } else {
        curve_points(from, to, samples)
    }
}

/// Resolves and routes every dataflow edge between visible nodes.
///
/// Edges are discovered depth-first from visible nodes with no predecessor,
/// taken left to right. Each edge is emitted once; edges whose endpoints
/// coincide are skipped.
pub fn route_edges(tree: &OpTree, config: &LayoutConfig) -> EdgeSet {
    let visible_nodes = tree.visible_nodes();
    let visible: HashSet<OpId> = visible_nodes.iter().copied().collect();

    let mut starts: Vec<OpId> = visible_nodes
        .into_iter()
        .filter(|id| tree.get(*id).uns.is_empty())
        .collect();
    starts.sort_by(|a, b| {
        let (a, b) = (tree.get(*a), tree.get(*b));
        a.layout
            .x
            .total_cmp(&b.layout.x)
            .then(a.input_priority.total_cmp(&b.input_priority))
    });

    let mut seen: HashSet<String> = HashSet::new();
    let mut pairs: Vec<(OpId, OpId, String)> = Vec::new();
    for start in starts {
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            for &dn in &tree.get(current).dns {
                if !visible.contains(&dn) {
                    continue;
                }
                let key = edge_key(tree, current, dn);
                if !seen.insert(key.clone()) {
                    continue;
                }
                if tree.get(current).layout.position() != tree.get(dn).layout.position() {
                    pairs.push((current, dn, key));
                }
                stack.push(dn);
            }
        }
    }

    let flow = FlowScale::from_flows(
        pairs.iter().filter_map(|(from, to, _)| edge_flow(tree, *from, *to)),
        config.edges.flow_percentile,
    );
    let edges = pairs
        .into_iter()
        .map(|(from, to, key)| {
            let shape = EdgeShape::between(tree, from, to);
            let points = route_points(
                tree.get(from).layout.position(),
                tree.get(to).layout.position(),
                shape,
                &config.edges,
            );
            RoutedEdge {
                key,
                from,
                to,
                shape,
                points,
                weight: flow.weight(edge_flow(tree, from, to), &config.edges),
            }
        })
        .collect();
    EdgeSet::new(edges, flow)
}
