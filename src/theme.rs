use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub background: String,
    pub node_color: String,
    pub tensor_node_color: String,
    pub plane_color: String,
    pub plane_color_darker: String,
    pub plane_outline_color: String,
    /// Base edge color; flow brightness multiplies each channel.
    pub edge_rgb: [u8; 3],
}

impl Theme {
    pub fn light() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 11.0,
            background: "#F8F9FA".to_string(),
            node_color: "#16425B".to_string(),
            tensor_node_color: "#808080".to_string(),
            plane_color: "#F8F9FA".to_string(),
            plane_color_darker: "#E4E5E6".to_string(),
            plane_outline_color: "#3A7CA5".to_string(),
            edge_rgb: [33, 37, 41],
        }
    }

    /// Edge color scaled by a brightness factor, clamped per channel.
    pub fn edge_color(&self, brightness: f32) -> String {
        let scale = |channel: u8| -> u8 {
            (channel as f32 * brightness).round().clamp(0.0, 255.0) as u8
        };
        format!(
            "#{:02X}{:02X}{:02X}",
            scale(self.edge_rgb[0]),
            scale(self.edge_rgb[1]),
            scale(self.edge_rgb[2])
        )
    }

    /// Planes get darker with nesting depth, alternating so siblings stay readable.
    pub fn plane_fill(&self, depth: u32) -> &str {
        if depth % 2 == 0 {
            &self.plane_color
        } else {
            &self.plane_color_darker
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_color_scales_and_clamps() {
        let theme = Theme::light();
        assert_eq!(theme.edge_color(1.0), "#212529");
        assert_eq!(theme.edge_color(0.0), "#000000");
        assert_eq!(theme.edge_color(100.0), "#FFFFFF");
    }
}
