use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use crate::error::LayoutError;
use crate::layout::OpLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(pub usize);

/// What an op is, with the fields that only make sense for that kind.
#[derive(Debug, Clone, PartialEq)]
pub enum OpKind {
    Module,
    Function,
    Input { global: bool },
    Output { global: bool },
    ModIn,
    ModOut { from_module: Option<OpId> },
    FnOut { created_by_fn: Option<String> },
    Extension { pre_elbow: bool },
    Elbow { pre_elbow: bool },
}

impl OpKind {
    pub fn tag(&self) -> &'static str {
        match self {
            OpKind::Module => "module",
            OpKind::Function => "function",
            OpKind::Input { .. } => "input",
            OpKind::Output { .. } => "output",
            OpKind::ModIn => "mod_in",
            OpKind::ModOut { .. } => "mod_out",
            OpKind::FnOut { .. } => "fn_out",
            OpKind::Extension { .. } => "extension",
            OpKind::Elbow { .. } => "elbow",
        }
    }

    pub fn is_tensor_node(&self) -> bool {
        !matches!(self, OpKind::Module | OpKind::Function)
    }

    pub fn is_global_input(&self) -> bool {
        matches!(self, OpKind::Input { global: true })
    }

    pub fn is_global_output(&self) -> bool {
        matches!(self, OpKind::Output { global: true })
    }

    /// Synthetic output markers pinned to the right edge of their group.
    pub fn is_output_marker(&self) -> bool {
        matches!(self, OpKind::Output { .. })
    }

    /// Routing helpers that stay glued to their single neighbour.
    pub fn structural_offset(&self) -> Option<bool> {
        match self {
            OpKind::Extension { pre_elbow } | OpKind::Elbow { pre_elbow } => Some(*pre_elbow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimType {
    Features,
    Spatial,
    Batch,
    Unknown,
}

impl DimType {
    pub fn from_token(token: &str) -> Self {
        match token {
            "features" => Self::Features,
            "spatial" => Self::Spatial,
            "batch" => Self::Batch,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Op {
    pub key: String,
    pub name: String,
    pub kind: OpKind,
    pub parent: Option<OpId>,
    pub children: Vec<OpId>,
    pub collapsed: bool,
    pub depth: u32,
    pub draw_order: f32,
    pub draw_order_row: i64,
    pub uns: Vec<OpId>,
    pub dns: Vec<OpId>,
    pub shape: Option<Vec<f32>>,
    pub dim_types: Option<Vec<DimType>>,
    pub n_params: Option<u64>,
    pub input_priority: f32,
    pub is_respath_row: bool,
    pub flow: Option<f32>,
    pub seed_x: f32,
    pub seed_y: f32,
    pub layout: OpLayout,
}

impl Op {
    /// Rendered as a single node: collapsed, or nothing inside to expand.
    pub fn is_node(&self) -> bool {
        self.collapsed || self.children.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeTypeTag {
    Module,
    Function,
    Input,
    Output,
    ModIn,
    ModOut,
    FnOut,
    Extension,
    Elbow,
}

/// One node of the decompressed trace payload.
#[derive(Debug, Clone, Deserialize)]
pub struct OpPayload {
    pub node_id: String,
    pub name: String,
    pub node_type: NodeTypeTag,
    #[serde(default)]
    pub children: Vec<OpPayload>,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub draw_order: f32,
    #[serde(default)]
    pub draw_order_row: i64,
    #[serde(default)]
    pub uns: Vec<String>,
    #[serde(default)]
    pub dns: Vec<String>,
    #[serde(default, deserialize_with = "lenient_shape")]
    pub shape: Option<Vec<f32>>,
    #[serde(default, deserialize_with = "lenient_dim_types")]
    pub dim_types: Option<Vec<String>>,
    #[serde(default)]
    pub n_params: Option<u64>,
    #[serde(default)]
    pub collapsed: Option<bool>,
    #[serde(default)]
    pub input_priority: Option<f32>,
    #[serde(default)]
    pub is_global_input: bool,
    #[serde(default)]
    pub is_output_global: bool,
    #[serde(default)]
    pub is_respath_row: bool,
    #[serde(default)]
    pub sparkflow: Option<f32>,
    #[serde(default)]
    pub created_by_fn: Option<String>,
    #[serde(default)]
    pub from_module_nid: Option<String>,
    #[serde(default)]
    pub pre_elbow: bool,
    #[serde(default)]
    pub x_relative: Option<f32>,
    #[serde(default)]
    pub y_relative: Option<f32>,
}

// Shape metadata is sparse and sometimes malformed; anything that is not a
// flat list of numbers is treated as missing.
fn lenient_shape<'de, D>(deserializer: D) -> Result<Option<Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::Array(items)) = value else {
        return Ok(None);
    };
    Ok(items
        .iter()
        .map(|item| item.as_f64().map(|v| v as f32))
        .collect::<Option<Vec<f32>>>())
}

fn lenient_dim_types<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::Array(items)) = value else {
        return Ok(None);
    };
    Ok(items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect::<Option<Vec<String>>>())
}

/// Arena of ops. Children are owned by index; parents are plain indices.
#[derive(Debug, Clone)]
pub struct OpTree {
    ops: Vec<Op>,
    lookup: HashMap<String, OpId>,
    root: OpId,
}

impl OpTree {
    pub fn from_json(input: &str) -> Result<Self, LayoutError> {
        let payload: OpPayload =
            serde_json::from_str(input).map_err(|err| LayoutError::Payload(err.to_string()))?;
        Self::from_payload(&payload)
    }

    pub fn from_payload(payload: &OpPayload) -> Result<Self, LayoutError> {
        let mut tree = OpTree {
            ops: Vec::new(),
            lookup: HashMap::new(),
            root: OpId(0),
        };
        let mut raw: Vec<&OpPayload> = Vec::new();
        tree.push_payload(payload, None, &mut raw)?;

        // Second pass: dataflow ids resolve only once every op has an index.
        // References to ops missing from the payload are dropped.
        for (idx, node) in raw.iter().enumerate() {
            let resolve = |ids: &[String]| -> Vec<OpId> {
                ids.iter()
                    .filter_map(|key| tree.lookup.get(key).copied())
                    .collect()
            };
            let uns = resolve(&node.uns);
            let dns = resolve(&node.dns);
            let from_module = node
                .from_module_nid
                .as_ref()
                .and_then(|key| tree.lookup.get(key).copied());
            let op = &mut tree.ops[idx];
            op.uns = uns;
            op.dns = dns;
            if let OpKind::ModOut { from_module: slot } = &mut op.kind {
                *slot = from_module;
            }
        }
        Ok(tree)
    }

    fn push_payload<'a>(
        &mut self,
        payload: &'a OpPayload,
        parent: Option<OpId>,
        raw: &mut Vec<&'a OpPayload>,
    ) -> Result<OpId, LayoutError> {
        if self.lookup.contains_key(&payload.node_id) {
            return Err(LayoutError::DuplicateOp(payload.node_id.clone()));
        }
        let id = OpId(self.ops.len());
        let kind = match payload.node_type {
            NodeTypeTag::Module => OpKind::Module,
            NodeTypeTag::Function => OpKind::Function,
            NodeTypeTag::Input => OpKind::Input {
                global: payload.is_global_input,
            },
            NodeTypeTag::Output => OpKind::Output {
                global: payload.is_output_global,
            },
            NodeTypeTag::ModIn => OpKind::ModIn,
            NodeTypeTag::ModOut => OpKind::ModOut { from_module: None },
            NodeTypeTag::FnOut => OpKind::FnOut {
                created_by_fn: payload.created_by_fn.clone(),
            },
            NodeTypeTag::Extension => OpKind::Extension {
                pre_elbow: payload.pre_elbow,
            },
            NodeTypeTag::Elbow => OpKind::Elbow {
                pre_elbow: payload.pre_elbow,
            },
        };
        let seed_x = payload.x_relative.unwrap_or(payload.draw_order);
        let seed_y = payload.y_relative.unwrap_or(0.0);
        self.ops.push(Op {
            key: payload.node_id.clone(),
            name: payload.name.clone(),
            kind,
            parent,
            children: Vec::new(),
            collapsed: payload.collapsed.unwrap_or(parent.is_some()),
            depth: payload.depth,
            draw_order: payload.draw_order,
            draw_order_row: payload.draw_order_row,
            uns: Vec::new(),
            dns: Vec::new(),
            shape: payload.shape.clone(),
            dim_types: payload
                .dim_types
                .as_ref()
                .map(|dims| dims.iter().map(|d| DimType::from_token(d)).collect()),
            n_params: payload.n_params,
            input_priority: payload.input_priority.unwrap_or(payload.draw_order),
            is_respath_row: payload.is_respath_row,
            flow: payload.sparkflow,
            seed_x,
            seed_y,
            layout: OpLayout {
                x_relative: seed_x,
                y_relative: seed_y,
                ..OpLayout::default()
            },
        });
        self.lookup.insert(payload.node_id.clone(), id);
        raw.push(payload);

        for child in &payload.children {
            let child_id = self.push_payload(child, Some(id), raw)?;
            self.ops[id.0].children.push(child_id);
        }
        Ok(id)
    }

    pub fn root(&self) -> OpId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn get(&self, id: OpId) -> &Op {
        &self.ops[id.0]
    }

    pub fn get_mut(&mut self, id: OpId) -> &mut Op {
        &mut self.ops[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = OpId> + '_ {
        (0..self.ops.len()).map(OpId)
    }

    pub fn find(&self, key: &str) -> Option<OpId> {
        self.lookup.get(key).copied()
    }

    pub fn resolve(&self, key: &str) -> Result<OpId, LayoutError> {
        self.find(key)
            .ok_or_else(|| LayoutError::UnknownOp(key.to_string()))
    }

    /// The op and every op below it, pre-order.
    pub fn subtree(&self, id: OpId) -> Vec<OpId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.get(current).children.iter().rev().copied());
        }
        out
    }

    /// True when every ancestor is expanded.
    pub fn is_reachable(&self, id: OpId) -> bool {
        let mut current = self.get(id).parent;
        while let Some(parent) = current {
            if self.get(parent).is_node() {
                return false;
            }
            current = self.get(parent).parent;
        }
        true
    }

    pub fn is_visible_node(&self, id: OpId) -> bool {
        self.get(id).is_node() && self.is_reachable(id)
    }

    /// Collapsed (or leaf) ops reachable through expanded ancestors.
    pub fn visible_nodes(&self) -> Vec<OpId> {
        let mut out = Vec::new();
        self.walk_visible(self.root, &mut |id, is_node| {
            if is_node {
                out.push(id);
            }
        });
        out
    }

    /// Expanded ops reachable through expanded ancestors, root included.
    pub fn visible_planes(&self) -> Vec<OpId> {
        let mut out = Vec::new();
        self.walk_visible(self.root, &mut |id, is_node| {
            if !is_node {
                out.push(id);
            }
        });
        out
    }

    fn walk_visible(&self, start: OpId, visit: &mut dyn FnMut(OpId, bool)) {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let op = self.get(id);
            let is_node = op.is_node();
            visit(id, is_node);
            if !is_node {
                stack.extend(op.children.iter().rev().copied());
            }
        }
    }

    /// Nearest op at or above `id` that is currently drawn as a node.
    pub fn visible_ancestor(&self, id: OpId) -> Option<OpId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(op_id) = current {
            chain.push(op_id);
            current = self.get(op_id).parent;
        }
        // Walk down from the root and stop at the first collapsed op.
        chain
            .into_iter()
            .rev()
            .find(|op_id| self.get(*op_id).is_node())
    }

    /// Dataflow successors sharing this op's parent.
    pub fn downstream_peers(&self, id: OpId) -> Vec<OpId> {
        let op = self.get(id);
        op.dns
            .iter()
            .copied()
            .filter(|dn| self.get(*dn).parent == op.parent)
            .collect()
    }

    /// Dataflow predecessors sharing this op's parent.
    pub fn upstream_peers(&self, id: OpId) -> Vec<OpId> {
        let op = self.get(id);
        op.uns
            .iter()
            .copied()
            .filter(|un| self.get(*un).parent == op.parent)
            .collect()
    }

    /// Ops of `group` listed as predecessors of `id`.
    pub fn upstream_in(&self, id: OpId, group: &[OpId]) -> Vec<OpId> {
        let uns = &self.get(id).uns;
        group
            .iter()
            .copied()
            .filter(|candidate| uns.contains(candidate))
            .collect()
    }

    /// Ops of `group` listed as successors of `id`.
    pub fn downstream_in(&self, id: OpId, group: &[OpId]) -> Vec<OpId> {
        let dns = &self.get(id).dns;
        group
            .iter()
            .copied()
            .filter(|candidate| dns.contains(candidate))
            .collect()
    }

    pub fn max_depth(&self) -> u32 {
        self.ops.iter().map(|op| op.depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"{
        "node_id": "root", "name": "Root", "node_type": "module", "depth": 0,
        "children": [
            {"node_id": "a", "name": "x", "node_type": "input", "dns": ["m"], "is_global_input": true},
            {"node_id": "m", "name": "Block", "node_type": "module", "depth": 1, "uns": ["a"], "dns": ["gone"],
             "children": [
                {"node_id": "m.in", "name": "in", "node_type": "input", "depth": 2, "dns": ["m.f"]},
                {"node_id": "m.f", "name": "relu", "node_type": "function", "depth": 2, "uns": ["m.in"]}
             ]},
            {"node_id": "o", "name": "out", "node_type": "mod_out", "from_module_nid": "m",
             "shape": [1, "x"], "dim_types": ["batch", 3]}
        ]
    }"#;

    #[test]
    fn builds_arena_with_parent_indices() {
        let tree = OpTree::from_json(NESTED).unwrap();
        assert_eq!(tree.len(), 6);
        let m = tree.resolve("m").unwrap();
        let inner = tree.resolve("m.f").unwrap();
        assert_eq!(tree.get(inner).parent, Some(m));
        assert_eq!(tree.get(m).children.len(), 2);
        assert!(tree.get(tree.resolve("a").unwrap()).kind.is_global_input());
    }

    #[test]
    fn drops_dangling_dataflow_references() {
        let tree = OpTree::from_json(NESTED).unwrap();
        let m = tree.resolve("m").unwrap();
        assert!(tree.get(m).dns.is_empty());
        assert_eq!(tree.get(m).uns, vec![tree.resolve("a").unwrap()]);
    }

    #[test]
    fn malformed_shape_metadata_is_missing() {
        let tree = OpTree::from_json(NESTED).unwrap();
        let o = tree.get(tree.resolve("o").unwrap());
        assert!(o.shape.is_none());
        assert!(o.dim_types.is_none());
        assert_eq!(
            o.kind,
            OpKind::ModOut {
                from_module: tree.find("m")
            }
        );
    }

    #[test]
    fn nested_ops_start_collapsed() {
        let tree = OpTree::from_json(NESTED).unwrap();
        let visible: Vec<&str> = tree
            .visible_nodes()
            .into_iter()
            .map(|id| tree.get(id).key.as_str())
            .collect();
        assert_eq!(visible, vec!["a", "m", "o"]);
        assert_eq!(tree.visible_planes(), vec![tree.root()]);
        let inner = tree.resolve("m.f").unwrap();
        assert_eq!(tree.visible_ancestor(inner), tree.find("m"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = r#"{"node_id": "r", "name": "Root", "node_type": "module",
            "children": [{"node_id": "r", "name": "dup", "node_type": "function"}]}"#;
        assert_eq!(
            OpTree::from_json(json).unwrap_err(),
            LayoutError::DuplicateOp("r".to_string())
        );
    }
}
