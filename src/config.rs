use crate::error::LayoutError;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

const VOLUME_FNS: [&str; 10] = [
    "conv2d",
    "conv_transpose2d",
    "linear",
    "max_pool2d",
    "cat",
    "mean",
    "interpolate",
    "avg_pool2d",
    "adaptive_avg_pool2d",
    "adaptive_avg_pool1d",
];

const VOLUME_FNS_IF_RESHAPED: [&str; 5] = ["__getitem__", "chunk", "split", "unfold", "stack"];

const PRIMARY_OP_NAMES: [&str; 11] = [
    "conv2d",
    "linear",
    "max_pool2d",
    "cat",
    "mean",
    "interpolate",
    "avg_pool2d",
    "adaptive_avg_pool2d",
    "adaptive_avg_pool1d",
    "matmul",
    "bmm",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub enabled: bool,
    pub channel_scalar: f32,
    pub spatial_scalar: f32,
    pub min_spatial: f32,
    pub max_spatial: f32,
    pub max_depth: f32,
    /// Neighbouring identical volumes closer than this in draw order are
    /// rendered as plain nodes.
    pub prune_window: f32,
    pub always_fns: Vec<String>,
    pub reshape_fns: Vec<String>,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_scalar: 0.01,
            spatial_scalar: 0.01,
            min_spatial: 0.04,
            max_spatial: 5.0,
            max_depth: 10.0,
            prune_window: 6.0,
            always_fns: VOLUME_FNS.iter().map(|value| value.to_string()).collect(),
            reshape_fns: VOLUME_FNS_IF_RESHAPED
                .iter()
                .map(|value| value.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneBuffer {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for PlaneBuffer {
    fn default() -> Self {
        Self {
            top: 0.1,
            bottom: 0.15,
            left: 0.1,
            right: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeStyleConfig {
    pub curve_points: usize,
    /// Horizontal distance above which a cross-row edge gets a flat run plus a bend.
    pub elbow_min_gap: f32,
    pub elbow_offset: f32,
    pub flow_percentile: f32,
    pub min_line_width: f32,
    pub max_line_width: f32,
    pub min_flow_brightness: f32,
    pub max_flow_brightness: f32,
}

impl Default for EdgeStyleConfig {
    fn default() -> Self {
        Self {
            curve_points: 20,
            elbow_min_gap: 2.0,
            elbow_offset: 1.0,
            flow_percentile: 0.05,
            min_line_width: 1.0,
            max_line_width: 4.0,
            min_flow_brightness: 4.0,
            max_flow_brightness: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub same_row_step: f32,
    pub cross_row_step: f32,
    /// Rows reserve space up to this far before their furthest successor.
    pub row_reach_back: f32,
    pub primary_row_pad: f32,
    pub secondary_row_pad: f32,
    pub expanded_box_clearance: f32,
    pub structural_offset: f32,
    pub global_input_seed: f32,
    pub max_nudge_visits: usize,
    pub primary_op_names: Vec<String>,
    pub respect_respath_rows: bool,
    pub show_structural_nodes: bool,
    pub plane_buffer: PlaneBuffer,
    pub plane_outline_width: f32,
    pub volume: VolumeConfig,
    pub edges: EdgeStyleConfig,
    pub tween_ms: f32,
    pub default_depth_node_budget: usize,
    pub min_default_depth: u32,
    pub initially_collapsed_names: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            same_row_step: 1.0,
            cross_row_step: 2.0,
            row_reach_back: 2.0,
            primary_row_pad: 1.0,
            secondary_row_pad: 0.2,
            expanded_box_clearance: 1.0,
            structural_offset: 1.0,
            global_input_seed: 1e6,
            max_nudge_visits: 200_000,
            primary_op_names: PRIMARY_OP_NAMES
                .iter()
                .map(|value| value.to_string())
                .collect(),
            respect_respath_rows: true,
            show_structural_nodes: true,
            plane_buffer: PlaneBuffer::default(),
            plane_outline_width: 0.02,
            volume: VolumeConfig::default(),
            edges: EdgeStyleConfig::default(),
            tween_ms: 600.0,
            default_depth_node_budget: 1600,
            min_default_depth: 2,
            initially_collapsed_names: vec!["reshape*".to_string()],
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.same_row_step <= 0.0 || self.cross_row_step <= 0.0 {
            return Err(LayoutError::InvalidConfig(
                "row steps must be positive".to_string(),
            ));
        }
        if self.edges.curve_points < 3 {
            return Err(LayoutError::InvalidConfig(format!(
                "curve_points must be at least 3, got {}",
                self.edges.curve_points
            )));
        }
        if !(0.0..0.5).contains(&self.edges.flow_percentile) {
            return Err(LayoutError::InvalidConfig(format!(
                "flow_percentile must be in [0, 0.5), got {}",
                self.edges.flow_percentile
            )));
        }
        if self.tween_ms < 0.0 {
            return Err(LayoutError::InvalidConfig(
                "tween_ms must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn row_pad(&self, primary: bool) -> f32 {
        if primary {
            self.primary_row_pad
        } else {
            self.secondary_row_pad
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Scene units to SVG pixels.
    pub scale: f32,
    pub margin: f32,
    pub node_radius: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: 40.0,
            margin: 20.0,
            node_radius: 0.16,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub theme: Theme,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path)?;
    let config: Config = match serde_json::from_str(&contents) {
        Ok(config) => config,
        Err(strict_err) => json5::from_str(&contents).map_err(|lenient_err| {
            anyhow::anyhow!(
                "failed to parse {}: {strict_err} (json5: {lenient_err})",
                path.display()
            )
        })?,
    };
    config.layout.validate()?;
    Ok(config)
}
