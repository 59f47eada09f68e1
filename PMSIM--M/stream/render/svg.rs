use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use super::{ChartFrame, ChartLayout, RenderError, Renderer};

const BACKGROUND: &str = "#051224";
const PANEL: &str = "#0a1a2f";
const GRID: &str = "#4c5663";
const LEGEND_EDGE: &str = "#2a4a6f";
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_TOP: f64 = 80.0;
const MARGIN_BOTTOM: f64 = 70.0;
const GRID_DIVISIONS: u32 = 5;

/// Writes the chart as a standalone SVG file, replacing it on every render.
#[derive(Debug, Clone)]
pub struct SvgChart {
    path: PathBuf,
    layout: ChartLayout,
}

impl SvgChart {
    /// Renders to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, layout: ChartLayout) -> Self {
        Self {
            path: path.into(),
            layout,
        }
    }

    /// Output file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Builds the SVG document for `frame`.
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn document(&self, frame: &ChartFrame<'_>) -> String {
        let w = f64::from(self.layout.svg_width.max(200));
        let h = f64::from(self.layout.svg_height.max(150));
        let plot = Plot {
            left: MARGIN_LEFT,
            top: MARGIN_TOP,
            width: w - MARGIN_LEFT - MARGIN_RIGHT,
            height: h - MARGIN_TOP - MARGIN_BOTTOM,
            samples: frame.len(),
            layout: self.layout,
        };
        let color = frame.status.palette().css;

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="{BACKGROUND}"/>"#);
        let _ = writeln!(
            svg,
            r#"<rect width="100%" height="100%" fill="{PANEL}" fill-opacity="0.6"/>"#
        );

        for step in 0..=GRID_DIVISIONS {
            let frac = f64::from(step) / f64::from(GRID_DIVISIONS);
            let value = self.layout.y_min + frac * (self.layout.y_max - self.layout.y_min);
            let y = plot.y(value);
            let _ = writeln!(
                svg,
                r#"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{GRID}" stroke-dasharray="1,3"/>"#,
                plot.left,
                plot.right()
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" fill="white" font-size="12" text-anchor="end">{value:.0}</text>"#,
                plot.left - 8.0,
                y + 4.0
            );
            let x = plot.left + frac * plot.width;
            let _ = writeln!(
                svg,
                r#"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="{GRID}" stroke-dasharray="1,3"/>"#,
                plot.top,
                plot.bottom()
            );
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::cast_precision_loss
            )]
            let tick = (frac * plot.samples.saturating_sub(1) as f64).round() as usize;
            let _ = writeln!(
                svg,
                r#"<text x="{x:.1}" y="{:.1}" fill="white" font-size="12" text-anchor="middle">{tick}</text>"#,
                plot.bottom() + 18.0
            );
        }

        let threshold_y = plot.y(frame.threshold);
        let _ = writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{threshold_y:.1}" x2="{:.1}" y2="{threshold_y:.1}" stroke="white" stroke-width="3" stroke-dasharray="10,6"/>"#,
            plot.left,
            plot.right()
        );
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="white" stroke-opacity="0.9" stroke-width="1.5" points="{}"/>"#,
            plot.points(frame.actual)
        );
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="{color}" stroke-width="1.5" points="{}"/>"#,
            plot.points(frame.predicted)
        );

        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="40" fill="white" font-size="24" font-weight="bold" text-anchor="middle">Live DNN PM Temperature Prediction</text>"#,
            w / 2.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" fill="white" font-size="16" font-weight="600" text-anchor="middle">Time (sample)</text>"#,
            plot.left + plot.width / 2.0,
            h - 20.0
        );
        let _ = writeln!(
            svg,
            r#"<text transform="translate(24 {:.1}) rotate(-90)" fill="white" font-size="16" font-weight="600" text-anchor="middle">PM Temperature (°C)</text>"#,
            plot.top + plot.height / 2.0
        );

        let _ = writeln!(
            svg,
            r#"<rect x="{:.1}" y="{:.1}" width="190" height="56" fill="white" fill-opacity="0.2" stroke="white" stroke-width="1.5"/>"#,
            plot.left + 10.0,
            plot.top + 10.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" fill="white" font-size="15" font-weight="bold">Status: {}</text>"#,
            plot.left + 20.0,
            plot.top + 32.0,
            frame.status.label()
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" fill="white" font-size="13" font-weight="bold">Temp: {:.1}°C</text>"#,
            plot.left + 20.0,
            plot.top + 54.0,
            frame.current()
        );

        let legend_x = plot.right() - 170.0;
        let legend_y = plot.top + 10.0;
        let _ = writeln!(
            svg,
            r#"<rect x="{legend_x:.1}" y="{legend_y:.1}" width="160" height="84" fill="{PANEL}" fill-opacity="0.97" stroke="{LEGEND_EDGE}"/>"#
        );
        for (row, (stroke, dash, label)) in [
            (color, "", "Predicted"),
            ("white", "", "Actual"),
            ("white", r#" stroke-dasharray="8,5""#, "Threshold"),
        ]
        .into_iter()
        .enumerate()
        {
            #[allow(clippy::cast_precision_loss)]
            let y = legend_y + 22.0 + 24.0 * row as f64;
            let _ = writeln!(
                svg,
                r#"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{stroke}" stroke-width="5"{dash}/>"#,
                legend_x + 12.0,
                legend_x + 48.0
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" fill="white" font-size="14">{label}</text>"#,
                legend_x + 58.0,
                y + 5.0
            );
        }

        svg.push_str("</svg>\n");
        svg
    }

    fn write_atomically(&self, body: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let staging = self.path.with_extension("svg.partial");
        fs::write(&staging, body)?;
        fs::rename(&staging, &self.path)
    }
}

impl Renderer for SvgChart {
    fn render(&mut self, frame: &ChartFrame<'_>) -> Result<(), RenderError> {
        let body = self.document(frame);
        self.write_atomically(&body)
            .map_err(|source| RenderError::Io {
                target: self.path.display().to_string(),
                source,
            })
    }
}

struct Plot {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    samples: usize,
    layout: ChartLayout,
}

impl Plot {
    fn right(&self) -> f64 {
        self.left + self.width
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }

    #[allow(clippy::cast_precision_loss)]
    fn x(&self, index: usize) -> f64 {
        let last = self.samples.saturating_sub(1).max(1) as f64;
        self.left + self.width * index as f64 / last
    }

    fn y(&self, value: f64) -> f64 {
        self.bottom() - self.height * self.layout.normalize(value)
    }

    fn points(&self, values: &[f64]) -> String {
        let mut out = String::with_capacity(values.len() * 12);
        for (idx, value) in values.iter().enumerate() {
            if idx > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{:.1},{:.1}", self.x(idx), self.y(*value));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Status;
    use tempfile::tempdir;

    fn frame<'a>(predicted: &'a [f64], actual: &'a [f64], status: Status) -> ChartFrame<'a> {
        ChartFrame {
            index: predicted.len().saturating_sub(1),
            predicted,
            actual,
            threshold: 80.0,
            status,
        }
    }

    #[test]
    fn document_colors_prediction_from_status() {
        let chart = SvgChart::new("unused.svg", ChartLayout::default());
        let normal = chart.document(&frame(&[70.0, 71.0], &[70.0, 70.5], Status::Normal));
        assert!(normal.contains(r#"stroke="lime""#));
        assert!(!normal.contains(r#"stroke="red""#));
        assert!(normal.contains("Status: NORMAL"));
        assert!(normal.contains("Temp: 71.0°C"));

        let alert = chart.document(&frame(&[90.0], &[85.0], Status::Alert));
        assert!(alert.contains(r#"stroke="red""#));
        assert!(alert.contains("Status: ALERT"));
    }

    #[test]
    fn polylines_span_plot_width() {
        let layout = ChartLayout {
            svg_width: 400,
            svg_height: 300,
            ..ChartLayout::default()
        };
        let chart = SvgChart::new("unused.svg", layout);
        let doc = chart.document(&frame(&[0.0, 100.0], &[0.0, 100.0], Status::Normal));
        // left margin 90, right edge 400 - 40; y from 300 - 70 down to 80.
        assert!(doc.contains(r#"points="90.0,230.0 360.0,80.0""#));
    }

    #[test]
    fn render_replaces_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("out/live.svg");
        let mut chart = SvgChart::new(&path, ChartLayout::default());
        chart
            .render(&frame(&[70.0], &[70.0], Status::Normal))
            .unwrap();
        chart
            .render(&frame(&[70.0, 95.0], &[70.0, 90.0], Status::Alert))
            .unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<svg"));
        assert!(written.contains("Status: ALERT"));
        assert!(!path.with_extension("svg.partial").exists());
    }
}
