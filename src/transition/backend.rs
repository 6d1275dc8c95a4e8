use std::collections::BTreeMap;

use serde::Serialize;

use crate::layout::{EdgeWeight, NodeVisualKind, Point};

pub type VisualHandle = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VisualKind {
    Node(NodeVisualKind),
    Plane,
    PlaneOutline,
    PlaneLabel,
    Edge,
}

/// Position plus a 2D scale. Nodes use a unit scale as "fully shown";
/// planes carry their width and height in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub position: Point,
    pub scale: Point,
}

impl Transform {
    pub const fn at(position: Point) -> Self {
        Self {
            position,
            scale: Point::new(1.0, 1.0),
        }
    }

    pub const fn hidden_at(position: Point) -> Self {
        Self {
            position,
            scale: Point::new(0.0, 0.0),
        }
    }
}

/// One instruction for the rendering backend. Commands are applied in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SceneCommand {
    Spawn {
        handle: VisualHandle,
        kind: VisualKind,
        owner: String,
        transform: Transform,
    },
    SpawnEdge {
        handle: VisualHandle,
        owner: String,
        points: Vec<Point>,
        weight: EdgeWeight,
    },
    Despawn {
        handle: VisualHandle,
    },
    SetPosition {
        handle: VisualHandle,
        position: Point,
    },
    SetScale {
        handle: VisualHandle,
        scale: Point,
    },
    SetPoints {
        handle: VisualHandle,
        points: Vec<Point>,
    },
    Restyle {
        handle: VisualHandle,
        weight: EdgeWeight,
    },
    AttachLabel {
        handle: VisualHandle,
        text: String,
        position: Point,
    },
}

impl SceneCommand {
    pub fn handle(&self) -> VisualHandle {
        match self {
            SceneCommand::Spawn { handle, .. }
            | SceneCommand::SpawnEdge { handle, .. }
            | SceneCommand::Despawn { handle }
            | SceneCommand::SetPosition { handle, .. }
            | SceneCommand::SetScale { handle, .. }
            | SceneCommand::SetPoints { handle, .. }
            | SceneCommand::Restyle { handle, .. }
            | SceneCommand::AttachLabel { handle, .. } => *handle,
        }
    }
}

/// Whatever materializes visuals: a GPU scene graph, a DOM, a test recorder.
pub trait SceneBackend {
    fn apply(&mut self, command: &SceneCommand);
}

/// Snapshot of one visual as the recording backend last saw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneObject {
    pub kind: VisualKind,
    pub owner: String,
    pub transform: Transform,
    pub points: Vec<Point>,
    pub weight: EdgeWeight,
    pub label: Option<String>,
}

/// Backend that keeps every command plus the resulting scene in memory.
/// Used by the CLI snapshot and by tests.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub log: Vec<SceneCommand>,
    pub objects: BTreeMap<VisualHandle, SceneObject>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects_of(&self, owner: &str) -> impl Iterator<Item = (&VisualHandle, &SceneObject)> {
        self.objects.iter().filter(move |(_, object)| object.owner == owner)
    }

    pub fn node_of(&self, owner: &str) -> Option<&SceneObject> {
        self.objects_of(owner)
            .map(|(_, object)| object)
            .find(|object| matches!(object.kind, VisualKind::Node(_)))
    }

    pub fn edge_of(&self, key: &str) -> Option<&SceneObject> {
        self.objects_of(key)
            .map(|(_, object)| object)
            .find(|object| object.kind == VisualKind::Edge)
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

impl SceneBackend for RecordingBackend {
    fn apply(&mut self, command: &SceneCommand) {
        self.log.push(command.clone());
        match command {
            SceneCommand::Spawn {
                handle,
                kind,
                owner,
                transform,
            } => {
                self.objects.insert(
                    *handle,
                    SceneObject {
                        kind: *kind,
                        owner: owner.clone(),
                        transform: *transform,
                        points: Vec::new(),
                        weight: EdgeWeight::default(),
                        label: None,
                    },
                );
            }
            SceneCommand::SpawnEdge {
                handle,
                owner,
                points,
                weight,
            } => {
                self.objects.insert(
                    *handle,
                    SceneObject {
                        kind: VisualKind::Edge,
                        owner: owner.clone(),
                        transform: Transform::at(Point::default()),
                        points: points.clone(),
                        weight: *weight,
                        label: None,
                    },
                );
            }
            SceneCommand::Despawn { handle } => {
                self.objects.remove(handle);
            }
            SceneCommand::SetPosition { handle, position } => {
                if let Some(object) = self.objects.get_mut(handle) {
                    object.transform.position = *position;
                }
            }
            SceneCommand::SetScale { handle, scale } => {
                if let Some(object) = self.objects.get_mut(handle) {
                    object.transform.scale = *scale;
                }
            }
            SceneCommand::SetPoints { handle, points } => {
                if let Some(object) = self.objects.get_mut(handle) {
                    object.points = points.clone();
                }
            }
            SceneCommand::Restyle { handle, weight } => {
                if let Some(object) = self.objects.get_mut(handle) {
                    object.weight = *weight;
                }
            }
            SceneCommand::AttachLabel {
                handle,
                text,
                position,
            } => {
                if let Some(object) = self.objects.get_mut(handle) {
                    object.label = Some(text.clone());
                    object.transform.position = *position;
                }
            }
        }
    }
}
