use std::collections::BTreeMap;

use crate::ir::OpId;
use crate::layout::{EdgeWeight, NodeVisualKind, PlaneInfo, Point};

use super::backend::VisualHandle;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeVisual {
    pub handle: VisualHandle,
    pub kind: NodeVisualKind,
    /// Position the visual is at, or heading to.
    pub position: Point,
}

/// The three visuals making up an expanded group.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneVisual {
    pub plane: VisualHandle,
    pub outline: VisualHandle,
    pub label: VisualHandle,
    pub bounds: PlaneInfo,
}

impl PlaneVisual {
    pub fn handles(&self) -> [VisualHandle; 3] {
        [self.plane, self.outline, self.label]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeVisual {
    pub handle: VisualHandle,
    pub from: OpId,
    pub to: OpId,
    pub points: Vec<Point>,
    pub weight: EdgeWeight,
    pub still_exists: bool,
    /// Taken over from an edge whose endpoint folded into a collapsed op.
    pub recycled: bool,
}

/// Every visual the backend currently holds, keyed by what it depicts.
/// Entries always describe the target state of the latest pass.
#[derive(Debug, Default)]
pub struct VisualRegistry {
    pub nodes: BTreeMap<OpId, NodeVisual>,
    pub planes: BTreeMap<OpId, PlaneVisual>,
    pub edges: BTreeMap<String, EdgeVisual>,
    next_handle: VisualHandle,
}

impl VisualRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> VisualHandle {
        self.next_handle += 1;
        self.next_handle
    }

    pub fn node(&self, id: OpId) -> Option<&NodeVisual> {
        self.nodes.get(&id)
    }

    pub fn plane(&self, id: OpId) -> Option<&PlaneVisual> {
        self.planes.get(&id)
    }

    pub fn edge(&self, key: &str) -> Option<&EdgeVisual> {
        self.edges.get(key)
    }

    pub fn visual_count(&self) -> usize {
        self.nodes.len() + self.planes.len() * 3 + self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.planes.is_empty() && self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_and_nonzero() {
        let mut registry = VisualRegistry::new();
        let first = registry.allocate();
        let second = registry.allocate();
        assert_eq!(first, 1);
        assert_ne!(first, second);
    }

    #[test]
    fn planes_count_three_visuals() {
        let mut registry = VisualRegistry::new();
        let plane = PlaneVisual {
            plane: registry.allocate(),
            outline: registry.allocate(),
            label: registry.allocate(),
            bounds: PlaneInfo::default(),
        };
        registry.planes.insert(OpId(0), plane);
        assert_eq!(registry.visual_count(), 3);
        assert!(!registry.is_empty());
    }
}
