use serde::Serialize;

use crate::error::LayoutWarning;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn lerp(self, to: Point, t: f32) -> Point {
        Point {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }
}

/// Axis-aligned bounds used to size the background rectangle of an expanded op.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PlaneInfo {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl PlaneInfo {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.min_x + self.width() / 2.0,
            self.min_y + self.height() / 2.0,
        )
    }

    pub fn contains(&self, other: &PlaneInfo) -> bool {
        self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_y <= other.min_y
            && self.max_y >= other.max_y
    }
}

/// Footprint of a tensor node drawn as a feature x spatial box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActivationVolume {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    /// Depth cut off by the clamp; the renderer flags it, layout ignores it.
    pub depth_overflow: f32,
}

impl ActivationVolume {
    /// Horizontal room the box needs before its anchor point.
    pub fn x_span(&self) -> f32 {
        self.depth + self.width * 0.15
    }

    pub fn y_span_half(&self) -> f32 {
        self.height * 0.5 + self.width * 0.15
    }

    pub fn same_dims(&self, other: &ActivationVolume) -> bool {
        self.width == other.width && self.height == other.height && self.depth == other.depth
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeVisualKind {
    Plain,
    ActivationVolume,
}

/// Per-op geometry owned by the layout engine. Reset and recomputed on every pass.
#[derive(Debug, Clone, Default)]
pub struct OpLayout {
    pub x_relative: f32,
    pub y_relative: f32,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub prev_pos: Point,
    pub plane: PlaneInfo,
    pub volume: Option<ActivationVolume>,
    pub is_volume: bool,
    pub is_last_in_row: bool,
    pub should_draw: bool,
    pub extraneous_io: bool,
}

impl OpLayout {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Volume footprint, if the node is still drawn as a volume after pruning.
    pub fn active_volume(&self) -> Option<ActivationVolume> {
        self.volume.filter(|_| self.is_volume)
    }

    pub fn visual_kind(&self) -> NodeVisualKind {
        if self.is_volume {
            NodeVisualKind::ActivationVolume
        } else {
            NodeVisualKind::Plain
        }
    }
}

/// Summary of one layout pass.
#[derive(Debug, Clone, Default)]
pub struct LayoutStats {
    pub visible_nodes: usize,
    pub visible_planes: usize,
    pub max_depth_visible: u32,
    /// 95th percentile of visible `n_params`, so outliers do not flatten the scale.
    pub max_n_params_visible: Option<u64>,
    pub warnings: Vec<LayoutWarning>,
}
