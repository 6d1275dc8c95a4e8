use crate::config::RenderConfig;
use crate::ir::OpTree;
use crate::layout::{EdgeSet, Point};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

/// Maps scene units (y up) onto SVG pixels (y down).
struct Viewport {
    min_x: f32,
    max_y: f32,
    scale: f32,
    margin: f32,
}

impl Viewport {
    fn x(&self, x: f32) -> f32 {
        (x - self.min_x) * self.scale + self.margin
    }

    fn y(&self, y: f32) -> f32 {
        (self.max_y - y) * self.scale + self.margin
    }

    fn len(&self, value: f32) -> f32 {
        value * self.scale
    }
}

/// Static snapshot of the current layout: planes, then edges, then nodes.
pub fn render_svg(tree: &OpTree, edges: &EdgeSet, theme: &Theme, config: &RenderConfig) -> String {
    let root = tree.get(tree.root());
    let bounds = root.layout.plane;
    let view = Viewport {
        min_x: bounds.min_x,
        max_y: bounds.max_y,
        scale: config.scale,
        margin: config.margin,
    };
    let width = view.len(bounds.width()) + 2.0 * config.margin;
    let height = view.len(bounds.height()) + 2.0 * config.margin;

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    for id in tree.visible_planes() {
        if id == tree.root() {
            continue;
        }
        let op = tree.get(id);
        let plane = op.layout.plane;
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
            view.x(plane.min_x),
            view.y(plane.max_y),
            view.len(plane.width()),
            view.len(plane.height()),
            theme.plane_fill(op.depth),
            theme.plane_outline_color,
            view.len(0.02).max(1.0)
        ));
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            view.x(plane.max_x),
            view.y(plane.max_y) - 4.0,
            theme.font_family,
            theme.font_size,
            theme.plane_outline_color,
            escape_xml(&op.name)
        ));
    }

    for edge in edges {
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
            points_to_path(&edge.points, &view),
            theme.edge_color(edge.weight.brightness),
            edge.weight.line_width
        ));
    }

    for id in tree.visible_nodes() {
        let op = tree.get(id);
        if !op.layout.should_draw {
            continue;
        }
        let x = view.x(op.layout.x);
        let y = view.y(op.layout.y);
        let fill = if op.kind.is_tensor_node() {
            &theme.tensor_node_color
        } else {
            &theme.node_color
        };
        match op.layout.active_volume() {
            Some(volume) => {
                let w = view.len(volume.x_span());
                let h = view.len(volume.height);
                svg.push_str(&format!(
                    "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" fill=\"{fill}\" fill-opacity=\"0.6\"/>",
                    x - w,
                    y - h / 2.0
                ));
            }
            None => {
                svg.push_str(&format!(
                    "<circle cx=\"{x:.2}\" cy=\"{y:.2}\" r=\"{:.2}\" fill=\"{fill}\"/>",
                    view.len(config.node_radius)
                ));
            }
        }
        svg.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            y + view.len(config.node_radius) + theme.font_size,
            theme.font_family,
            theme.font_size,
            theme.node_color,
            escape_xml(&op.name)
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn points_to_path(points: &[Point], view: &Viewport) -> String {
    let mut d = String::new();
    for (idx, point) in points.iter().enumerate() {
        let command = if idx == 0 { "M" } else { " L" };
        d.push_str(&format!("{command} {:.2} {:.2}", view.x(point.x), view.y(point.y)));
    }
    d
}

/// Writes text output to `output`, or to stdout when no path is given.
pub fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
        }
        None => {
            print!("{}", text);
        }
    }
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::{compute_layout, route_edges};

    #[test]
    fn render_svg_draws_planes_edges_and_nodes() {
        let json = r#"{"node_id": "root", "name": "Root", "node_type": "module", "collapsed": false, "children": [
            {"node_id": "a", "name": "embed", "node_type": "function", "dns": ["m", "m.f"]},
            {"node_id": "m", "name": "Attn<Head>", "node_type": "module", "collapsed": false, "uns": ["a"],
             "children": [{"node_id": "m.f", "name": "softmax", "node_type": "function", "uns": ["a"]}]}
        ]}"#;
        let mut tree = OpTree::from_json(json).unwrap();
        let config = LayoutConfig::default();
        compute_layout(&mut tree, &config);
        let edges = route_edges(&tree, &config);
        let svg = render_svg(&tree, &edges, &Theme::default(), &RenderConfig::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Attn&lt;Head&gt;"));
        assert!(svg.contains("softmax"));
        assert_eq!(svg.matches("<path").count(), edges.len());
        assert_eq!(svg.matches("<circle").count(), 2);
    }
}
