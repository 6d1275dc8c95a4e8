use crate::ir::OpTree;
use crate::layout::{ActivationVolume, EdgeSet, LayoutStats, NodeVisualKind};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub root: String,
    pub stats: StatsDump,
    pub nodes: Vec<NodeDump>,
    pub planes: Vec<PlaneDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct StatsDump {
    pub visible_nodes: usize,
    pub visible_planes: usize,
    pub max_depth_visible: u32,
    pub max_n_params_visible: Option<u64>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub name: String,
    pub kind: &'static str,
    pub visual: NodeVisualKind,
    pub x: f32,
    pub y: f32,
    pub x_relative: f32,
    pub y_relative: f32,
    pub row: i64,
    pub drawn: bool,
    pub volume: Option<ActivationVolume>,
}

#[derive(Debug, Serialize)]
pub struct PlaneDump {
    pub id: String,
    pub name: String,
    pub depth: u32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub key: String,
    pub from: String,
    pub to: String,
    pub line_width: f32,
    pub brightness: f32,
    pub points: Vec<[f32; 2]>,
}

impl LayoutDump {
    pub fn from_layout(tree: &OpTree, edges: &EdgeSet, stats: &LayoutStats) -> Self {
        let nodes = tree
            .visible_nodes()
            .into_iter()
            .map(|id| {
                let op = tree.get(id);
                NodeDump {
                    id: op.key.clone(),
                    name: op.name.clone(),
                    kind: op.kind.tag(),
                    visual: op.layout.visual_kind(),
                    x: op.layout.x,
                    y: op.layout.y,
                    x_relative: op.layout.x_relative,
                    y_relative: op.layout.y_relative,
                    row: op.draw_order_row,
                    drawn: op.layout.should_draw,
                    volume: op.layout.active_volume(),
                }
            })
            .collect();

        let planes = tree
            .visible_planes()
            .into_iter()
            .map(|id| {
                let op = tree.get(id);
                let plane = op.layout.plane;
                PlaneDump {
                    id: op.key.clone(),
                    name: op.name.clone(),
                    depth: op.depth,
                    x: op.layout.x,
                    y: op.layout.y,
                    width: op.layout.w,
                    height: op.layout.h,
                    min_x: plane.min_x,
                    min_y: plane.min_y,
                    max_x: plane.max_x,
                    max_y: plane.max_y,
                }
            })
            .collect();

        let edges = edges
            .iter()
            .map(|edge| EdgeDump {
                key: edge.key.clone(),
                from: tree.get(edge.from).key.clone(),
                to: tree.get(edge.to).key.clone(),
                line_width: edge.weight.line_width,
                brightness: edge.weight.brightness,
                points: edge.points.iter().map(|point| [point.x, point.y]).collect(),
            })
            .collect();

        LayoutDump {
            root: tree.get(tree.root()).key.clone(),
            stats: StatsDump {
                visible_nodes: stats.visible_nodes,
                visible_planes: stats.visible_planes,
                max_depth_visible: stats.max_depth_visible,
                max_n_params_visible: stats.max_n_params_visible,
                warnings: stats.warnings.iter().map(|warning| warning.to_string()).collect(),
            },
            nodes,
            planes,
            edges,
        }
    }
}

pub fn write_layout_dump(
    path: &Path,
    tree: &OpTree,
    edges: &EdgeSet,
    stats: &LayoutStats,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(tree, edges, stats);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
