use std::collections::BTreeMap;
use std::path::Path;

use nn_layout_engine::config::LayoutConfig;
use nn_layout_engine::ir::{OpId, OpTree};
use nn_layout_engine::layout::{Point, compute_layout, route_edges};
use nn_layout_engine::session::LayoutSession;
use nn_layout_engine::transition::{
    RecordingBackend, SceneCommand, TransitionPlan, TweenValue, Visibility, VisualRegistry,
    reconcile,
};

const EPS: f32 = 1e-4;

fn load_fixture(name: &str) -> OpTree {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    OpTree::from_json(&input).expect("fixture parse failed")
}

fn laid_out(name: &str, config: &LayoutConfig) -> OpTree {
    let mut tree = load_fixture(name);
    compute_layout(&mut tree, config);
    tree
}

fn id(tree: &OpTree, key: &str) -> OpId {
    tree.resolve(key).expect("unknown key")
}

fn positions(tree: &OpTree) -> Vec<(f32, f32)> {
    tree.ids()
        .map(|op| (tree.get(op).layout.x, tree.get(op).layout.y))
        .collect()
}

struct RowBand {
    key: i64,
    start: f32,
    end: f32,
    y: f32,
    pad: f32,
    /// Claims above the row line: expanded boxes and volumes, as (from, until, top).
    claims: Vec<(f32, f32, f32)>,
    /// Volumes hanging below the row line, as (from, until, half height).
    hangs: Vec<(f32, f32, f32)>,
}

fn spans_overlap(a: (f32, f32), b: (f32, f32)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

fn row_bands(tree: &OpTree, parent: OpId, config: &LayoutConfig) -> Vec<RowBand> {
    let mut members: BTreeMap<i64, Vec<OpId>> = BTreeMap::new();
    for &child in &tree.get(parent).children {
        members.entry(tree.get(child).draw_order_row).or_default().push(child);
    }
    members
        .into_iter()
        .filter_map(|(key, mut ids)| {
            ids.sort_by(|a, b| {
                tree.get(*a)
                    .layout
                    .x_relative
                    .total_cmp(&tree.get(*b).layout.x_relative)
            });
            let (&first, &last) = (ids.first()?, ids.last()?);
            let last_layout = &tree.get(last).layout;
            let until = last_layout.x_relative + last_layout.w;
            let reach = tree
                .downstream_peers(last)
                .iter()
                .map(|dn| tree.get(*dn).layout.x_relative - config.row_reach_back)
                .fold(until, f32::max);
            let primary = ids.iter().any(|id| {
                let op = tree.get(*id);
                op.n_params.is_some_and(|n| n > 0)
                    || op.layout.is_volume
                    || config.primary_op_names.contains(&op.name)
                    || (config.respect_respath_rows && op.is_respath_row)
            });
            let y = tree.get(first).layout.y_relative;
            let mut claims = Vec::new();
            let mut hangs = Vec::new();
            for id in &ids {
                let op = tree.get(*id);
                let x = op.layout.x_relative;
                if !op.is_node() {
                    claims.push((x, x + op.layout.w, y + op.layout.h + config.expanded_box_clearance));
                } else if let Some(volume) = op.layout.active_volume() {
                    let from = (x - volume.x_span()).floor();
                    claims.push((from, x, y + volume.y_span_half()));
                    hangs.push((from, x, volume.y_span_half()));
                }
            }
            Some(RowBand {
                key,
                start: tree.get(first).layout.x_relative,
                end: reach,
                y,
                pad: config.row_pad(primary),
                claims,
                hangs,
            })
        })
        .collect()
}

fn assert_rows_do_not_overlap(tree: &OpTree, config: &LayoutConfig) {
    for parent in tree.visible_planes() {
        let bands = row_bands(tree, parent, config);
        let parent_key = &tree.get(parent).key;
        for (idx, low) in bands.iter().enumerate() {
            for high in &bands[idx + 1..] {
                let high_span = (high.start, high.end);
                let mut floor = f32::NEG_INFINITY;
                if spans_overlap((low.start, low.end), high_span) {
                    floor = floor.max(low.y + low.pad + high.pad);
                }
                for &(from, until, top) in &low.claims {
                    if spans_overlap((from, until), high_span) {
                        floor = floor.max(top + high.pad);
                    }
                    for &(hang_from, hang_until, half) in &high.hangs {
                        if spans_overlap((from, until), (hang_from, hang_until)) {
                            floor = floor.max(top + half);
                        }
                    }
                }
                for &(from, until, half) in &high.hangs {
                    if spans_overlap((low.start, low.end), (from, until)) {
                        floor = floor.max(low.y + low.pad + half);
                    }
                }
                assert!(
                    high.y >= floor - EPS,
                    "row {} of `{parent_key}` sits at {} but must clear {floor} above row {}",
                    high.key,
                    high.y,
                    low.key
                );
            }
        }
    }
}

fn assert_dataflow_is_monotone(tree: &OpTree, config: &LayoutConfig) {
    for parent in tree.visible_planes() {
        for &from in &tree.get(parent).children {
            for to in tree.downstream_peers(from) {
                let (a, b) = (&tree.get(from).layout, &tree.get(to).layout);
                assert!(
                    b.x_relative >= a.x_relative + a.w + config.same_row_step - EPS,
                    "{} -> {} runs backwards",
                    tree.get(from).key,
                    tree.get(to).key
                );
            }
        }
    }
}

fn assert_planes_contain_descendants(tree: &OpTree) {
    for parent in tree.visible_planes() {
        let plane = tree.get(parent).layout.plane;
        for descendant in tree.subtree(parent).into_iter().skip(1) {
            if !tree.is_reachable(descendant) {
                continue;
            }
            let inner = tree.get(descendant).layout.plane;
            assert!(
                plane.contains(&inner),
                "`{}` escapes `{}`",
                tree.get(descendant).key,
                tree.get(parent).key
            );
        }
    }
}

fn assert_invariants(tree: &OpTree, config: &LayoutConfig) {
    assert_rows_do_not_overlap(tree, config);
    assert_dataflow_is_monotone(tree, config);
    assert_planes_contain_descendants(tree);
}

#[test]
fn chain_advances_one_unit_per_edge() {
    let tree = laid_out("chain.json", &LayoutConfig::default());
    let xs: Vec<f32> = ["A", "B", "C"]
        .iter()
        .map(|key| tree.get(id(&tree, key)).layout.x_relative)
        .collect();
    assert_eq!(xs, vec![0.0, 1.0, 2.0]);
}

#[test]
fn second_row_clears_the_first_rows_band() {
    let tree = laid_out("stacked_rows.json", &LayoutConfig::default());
    let row0 = tree.get(id(&tree, "M.b")).layout.y_relative;
    let row1 = tree.get(id(&tree, "M.c")).layout.y_relative;
    assert_eq!(row0, 0.0);
    assert!(row1 >= 2.0, "row 1 sits at {row1}");
}

#[test]
fn layout_is_idempotent() {
    let config = LayoutConfig::default();
    let mut tree = laid_out("blocks.json", &config);
    let first = positions(&tree);
    compute_layout(&mut tree, &config);
    assert_eq!(first, positions(&tree));
}

#[test]
fn fixtures_satisfy_layout_invariants() {
    let config = LayoutConfig::default();
    for name in ["chain.json", "stacked_rows.json", "reveal.json", "blocks.json"] {
        let tree = laid_out(name, &config);
        assert_invariants(&tree, &config);
    }
}

#[test]
fn collapse_then_expand_round_trips() {
    let config = LayoutConfig::default();
    let mut tree = laid_out("blocks.json", &config);
    let b1 = id(&tree, "b1");
    tree.get_mut(b1).collapsed = true;
    compute_layout(&mut tree, &config);
    assert_invariants(&tree, &config);
    tree.get_mut(b1).collapsed = false;
    compute_layout(&mut tree, &config);
    assert_invariants(&tree, &config);

    let b2 = id(&tree, "b2");
    tree.get_mut(b2).collapsed = false;
    compute_layout(&mut tree, &config);
    assert_invariants(&tree, &config);
}

#[test]
fn expanded_children_start_at_the_module_position() {
    let config = LayoutConfig {
        primary_row_pad: 1.5,
        ..LayoutConfig::default()
    };
    let tree = load_fixture("reveal.json");
    let mut session = LayoutSession::new(tree, config, RecordingBackend::new()).unwrap();
    session.initial_pass().unwrap();
    session.collapse("M").unwrap();
    session.finish_animations();

    let module = session.tree().get(id(session.tree(), "M")).layout.position();
    assert_eq!(module, Point::new(5.0, 3.0));

    session.backend_mut().clear_log();
    session.expand("M").unwrap();
    for key in ["M.f", "M.g"] {
        let spawned = session.backend().log.iter().find_map(|command| match command {
            SceneCommand::Spawn {
                owner, transform, ..
            } if owner == key => Some(transform.position),
            _ => None,
        });
        assert_eq!(spawned, Some(Point::new(5.0, 3.0)), "{key}");
    }

    session.finish_animations();
    for key in ["M.f", "M.g"] {
        let target = session.tree().get(id(session.tree(), key)).layout.position();
        let node = session.backend().node_of(key).unwrap();
        assert_eq!(node.transform.position, target);
    }
    assert_eq!(
        session.backend().node_of("M.g").unwrap().transform.position,
        Point::new(6.0, 3.0)
    );
}

#[test]
fn edge_tweens_always_pair_equal_point_counts() {
    let config = LayoutConfig::default();
    let mut tree = load_fixture("blocks.json");
    let mut registry = VisualRegistry::new();
    let mut seen_points = 0;

    let steps: [(&str, bool); 5] = [
        ("b2", false),
        ("b1", true),
        ("b2", true),
        ("b1", false),
        ("b2", false),
    ];
    let pass = |tree: &mut OpTree, registry: &mut VisualRegistry| {
        let before = Visibility::capture(tree);
        compute_layout(tree, &config);
        let plan = TransitionPlan::between(tree, &before);
        let edges = route_edges(tree, &config);
        reconcile(tree, &edges, registry, &plan, &config).unwrap()
    };

    pass(&mut tree, &mut registry);
    for (key, collapsed) in steps {
        let op = id(&tree, key);
        tree.get_mut(op).collapsed = collapsed;
        let batch = pass(&mut tree, &mut registry);
        for tween in &batch.tweens {
            if let TweenValue::Points { from, to } = &tween.value {
                assert_eq!(from.len(), to.len());
                seen_points += 1;
            }
        }
    }
    assert!(seen_points > 0);
}

#[test]
fn flow_weights_follow_edge_flow() {
    let config = LayoutConfig::default();
    let tree = laid_out("blocks.json", &config);
    let edges = route_edges(&tree, &config);
    let heavy = edges.get("b1.addb2").unwrap().weight;
    let light = edges.get("heady").unwrap().weight;
    assert!(heavy.line_width > light.line_width);
    assert!(heavy.brightness < light.brightness);
}

fn commands_after_despawn(log: &[SceneCommand]) -> Vec<SceneCommand> {
    let mut dead = std::collections::BTreeSet::new();
    let mut late = Vec::new();
    for command in log {
        if dead.contains(&command.handle()) {
            late.push(command.clone());
        }
        if let SceneCommand::Despawn { handle } = command {
            dead.insert(*handle);
        }
    }
    late
}

#[test]
fn collapsing_a_moving_plane_leaves_no_late_commands() {
    let tree = load_fixture("blocks.json");
    let mut session =
        LayoutSession::new(tree, LayoutConfig::default(), RecordingBackend::new()).unwrap();
    session.initial_pass().unwrap();
    session.expand("b2").unwrap();
    session.finish_animations();

    // b2's plane starts sliding left, then folds away mid-slide.
    session.collapse("b1").unwrap();
    session.tick(100.0);
    session.backend_mut().clear_log();
    session.collapse("b2").unwrap();
    session.tick(100.0);
    session.finish_animations();

    let late = commands_after_despawn(&session.backend().log);
    assert!(late.is_empty(), "commands after despawn: {late:?}");
    assert!(session.backend().objects_of("b2.conv").next().is_none());
}
