// Drawable output of the waveform renderer
// A layered display list (grid, bars, axis, cursor) that hosts paint or export as SVG

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

pub const BAR_COLOR: Color = Color::rgb(0x03, 0xA3, 0x00);
pub const GRID_COLOR: Color = Color::rgb(0xD6, 0xE5, 0xD6);
pub const AXIS_COLOR: Color = Color::rgb(0x95, 0xA1, 0x7D);
pub const CURSOR_COLOR: Color = Color::rgb(0x80, 0x80, 0x80);

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        stroke: Color,
        width: f64,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        /// Corner radius
        radius: f64,
        fill: Color,
    },
    Polygon {
        points: Vec<(f64, f64)>,
        fill: Color,
    },
    /// Text centred horizontally on `x`
    Text {
        x: f64,
        y: f64,
        text: String,
        color: Color,
        size: f64,
    },
}

/// Visible region in surface coordinates (may start above y = 0 to fit the
/// cursor handle)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
    pub view_box: Option<ViewBox>,
    pub grid: Vec<Primitive>,
    pub bars: Vec<Primitive>,
    pub axis: Vec<Primitive>,
    pub cursor: Vec<Primitive>,
}

impl Surface {
    /// Surface with nothing to draw
    pub fn empty(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
            && self.bars.is_empty()
            && self.axis.is_empty()
            && self.cursor.is_empty()
    }

    /// All primitives in paint order
    pub fn primitives(&self) -> impl Iterator<Item = &Primitive> {
        self.grid
            .iter()
            .chain(self.bars.iter())
            .chain(self.axis.iter())
            .chain(self.cursor.iter())
    }

    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let vb = self.view_box.unwrap_or(ViewBox {
            x: 0.0,
            y: 0.0,
            width: self.width,
            height: self.height,
        });
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="{} {} {} {}" style="display:block">"#,
            self.width, self.height, vb.x, vb.y, vb.width, vb.height
        );
        for (name, layer) in [
            ("grid", &self.grid),
            ("bars", &self.bars),
            ("axis", &self.axis),
            ("cursor", &self.cursor),
        ] {
            if layer.is_empty() {
                continue;
            }
            let _ = write!(svg, r#"<g class="{}">"#, name);
            for primitive in layer {
                write_primitive(&mut svg, primitive);
            }
            svg.push_str("</g>");
        }
        svg.push_str("</svg>");
        svg
    }
}

fn write_primitive(svg: &mut String, primitive: &Primitive) {
    let _ = match primitive {
        Primitive::Line { x1, y1, x2, y2, stroke, width } => write!(
            svg,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}"/>"#,
            x1,
            y1,
            x2,
            y2,
            stroke.to_hex(),
            width
        ),
        Primitive::Rect { x, y, width, height, radius, fill } => write!(
            svg,
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}" ry="{}" fill="{}"/>"#,
            x,
            y,
            width,
            height,
            radius,
            radius,
            fill.to_hex()
        ),
        Primitive::Polygon { points, fill } => {
            let pts: Vec<String> = points.iter().map(|(x, y)| format!("{},{}", x, y)).collect();
            write!(svg, r#"<polygon points="{}" fill="{}"/>"#, pts.join(" "), fill.to_hex())
        }
        Primitive::Text { x, y, text, color, size } => write!(
            svg,
            r#"<text x="{}" y="{}" fill="{}" font-size="{}" text-anchor="middle">{}</text>"#,
            x,
            y,
            color.to_hex(),
            size,
            escape_text(text)
        ),
    };
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_surface_has_no_primitives() {
        let surface = Surface::empty(0.0, 0.0);
        assert!(surface.is_empty());
        assert_eq!(surface.primitives().count(), 0);
        assert_eq!(
            surface.to_svg(),
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="0" height="0" viewBox="0 0 0 0" style="display:block"></svg>"#
        );
    }

    #[test]
    fn test_svg_groups_layers_in_paint_order() {
        let mut surface = Surface::empty(100.0, 50.0);
        surface.bars.push(Primitive::Rect {
            x: 1.0,
            y: -2.0,
            width: 3.0,
            height: 4.0,
            radius: 1.5,
            fill: BAR_COLOR,
        });
        surface.cursor.push(Primitive::Polygon {
            points: vec![(0.0, -15.0), (20.0, -15.0), (10.0, -5.0)],
            fill: CURSOR_COLOR,
        });

        let svg = surface.to_svg();
        let bars = svg.find(r#"<g class="bars">"#).unwrap();
        let cursor = svg.find(r#"<g class="cursor">"#).unwrap();
        assert!(bars < cursor);
        assert!(svg.contains(r##"fill="#03A300""##));
        assert!(svg.contains(r#"points="0,-15 20,-15 10,-5""#));
        assert!(!svg.contains(r#"class="grid""#));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut surface = Surface::empty(10.0, 10.0);
        surface.axis.push(Primitive::Text {
            x: 5.0,
            y: 5.0,
            text: "<a&b>".into(),
            color: AXIS_COLOR,
            size: 11.0,
        });
        assert!(surface.to_svg().contains("&lt;a&amp;b&gt;"));
    }
}
