use std::{
    fmt::Write as _,
    io::{self, Write},
};

use super::{ChartFrame, ChartLayout, RenderError, Renderer};

const CURSOR_HOME: &str = "\x1b[H";
const CLEAR_LINE: &str = "\x1b[2K";
const WHITE: &str = "\x1b[97m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

const PREDICTED_GLYPH: char = '●';
const ACTUAL_GLYPH: char = '·';
const THRESHOLD_GLYPH: char = '╌';
const TITLE: &str = "Live DNN PM Temperature Prediction";

/// Title, status box (2 rows), axis and legend around the plot area.
const CHROME_ROWS: usize = 5;

/// ANSI chart drawn over the top of the terminal on every render.
///
/// Shows the trailing `layout.width` samples; the full history stays with
/// the driver.
#[derive(Debug)]
pub struct TerminalChart<W: Write> {
    out: W,
    layout: ChartLayout,
    color: bool,
}

impl TerminalChart<io::Stdout> {
    /// Draws to stdout.
    #[must_use]
    pub fn stdout(layout: ChartLayout, color: bool) -> Self {
        Self::new(io::stdout(), layout, color)
    }
}

impl<W: Write> TerminalChart<W> {
    /// Draws to `out`.
    pub fn new(out: W, layout: ChartLayout, color: bool) -> Self {
        Self { out, layout, color }
    }

    /// Terminal rows one frame occupies.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.layout.height.max(2) + CHROME_ROWS
    }

    /// Consumes the chart, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Builds the frame text, one entry per terminal row.
    #[must_use]
    pub fn lines(&self, frame: &ChartFrame<'_>) -> Vec<String> {
        let height = self.layout.height.max(2);
        let width = self.layout.width.max(1);
        let start = frame.len().saturating_sub(width);
        let palette = frame.status.palette();
        let paint = |code: &str, text: &str| {
            if self.color {
                format!("{code}{text}{RESET}")
            } else {
                text.to_string()
            }
        };

        let mut lines = Vec::with_capacity(height + CHROME_ROWS);
        lines.push(paint(BOLD, TITLE));
        lines.push(format!(
            "[ Status: {} ]",
            paint(palette.ansi, frame.status.label())
        ));
        lines.push(format!("[ Temp: {:.1}°C ]", frame.current()));

        let threshold_row = self.row_of(frame.threshold, height);
        let mut grid = vec![vec![' '; width]; height];
        for col in (0..width).step_by(2) {
            grid[threshold_row][col] = THRESHOLD_GLYPH;
        }
        for (col, value) in frame.actual[start..].iter().enumerate() {
            grid[self.row_of(*value, height)][col] = ACTUAL_GLYPH;
        }
        for (col, value) in frame.predicted[start..].iter().enumerate() {
            grid[self.row_of(*value, height)][col] = PREDICTED_GLYPH;
        }

        for (row, cells) in grid.iter().enumerate() {
            let mut line = format!("{:>6} ┤", self.axis_label(row, height));
            for &cell in cells {
                let glyph = cell.to_string();
                match cell {
                    PREDICTED_GLYPH => line.push_str(&paint(palette.ansi, &glyph)),
                    ACTUAL_GLYPH => line.push_str(&paint(WHITE, &glyph)),
                    THRESHOLD_GLYPH => line.push_str(&paint(DIM, &glyph)),
                    _ => line.push(cell),
                }
            }
            lines.push(line);
        }

        let mut axis = format!("{:>6} └{}", "", "─".repeat(width));
        let _ = write!(
            axis,
            " samples {}..{}",
            start,
            frame.len().saturating_sub(1).max(start)
        );
        lines.push(axis);
        lines.push(format!(
            "{} Predicted  {} Actual  {} Threshold ({:.0}°C)",
            paint(palette.ansi, &PREDICTED_GLYPH.to_string()),
            paint(WHITE, &ACTUAL_GLYPH.to_string()),
            paint(DIM, &THRESHOLD_GLYPH.to_string()),
            frame.threshold
        ));
        lines
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn row_of(&self, value: f64, height: usize) -> usize {
        let from_top = 1.0 - self.layout.normalize(value);
        ((from_top * (height - 1) as f64).round() as usize).min(height - 1)
    }

    #[allow(clippy::cast_precision_loss)]
    fn axis_label(&self, row: usize, height: usize) -> String {
        if row % 4 != 0 && row != height - 1 {
            return String::new();
        }
        let span = self.layout.y_max - self.layout.y_min;
        let value = self.layout.y_max - span * row as f64 / (height - 1) as f64;
        format!("{value:.0}")
    }
}

impl<W: Write> Renderer for TerminalChart<W> {
    fn render(&mut self, frame: &ChartFrame<'_>) -> Result<(), RenderError> {
        let mut buf = String::from(CURSOR_HOME);
        for line in self.lines(frame) {
            buf.push_str(CLEAR_LINE);
            buf.push_str(&line);
            buf.push('\n');
        }
        self.out
            .write_all(buf.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|source| RenderError::Io {
                target: "terminal".into(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Status;

    fn layout(width: usize, height: usize) -> ChartLayout {
        ChartLayout {
            width,
            height,
            ..ChartLayout::default()
        }
    }

    fn frame<'a>(predicted: &'a [f64], actual: &'a [f64], status: Status) -> ChartFrame<'a> {
        ChartFrame {
            index: predicted.len() - 1,
            predicted,
            actual,
            threshold: 80.0,
            status,
        }
    }

    #[test]
    fn frame_has_fixed_row_count_and_status_box() {
        let chart = TerminalChart::new(Vec::new(), layout(10, 11), false);
        let lines = chart.lines(&frame(&[70.0, 72.5], &[71.0, 71.5], Status::Normal));
        assert_eq!(lines.len(), chart.rows());
        assert_eq!(lines[0], TITLE);
        assert!(lines[1].contains("Status: NORMAL"));
        assert!(lines[2].contains("Temp: 72.5°C"));
        assert!(lines.last().unwrap().contains("Threshold (80°C)"));
    }

    #[test]
    fn glyphs_land_on_value_rows() {
        // 11 rows over 0..100 puts one row every 10 degrees.
        let chart = TerminalChart::new(Vec::new(), layout(4, 11), false);
        let lines = chart.lines(&frame(&[90.0], &[10.0], Status::Alert));
        let plot = &lines[3..14];
        assert!(plot[1].contains(PREDICTED_GLYPH));
        assert!(plot[9].contains(ACTUAL_GLYPH));
        assert!(plot[2].contains(THRESHOLD_GLYPH));
        assert!(plot[0].trim_start().starts_with("100"));
    }

    #[test]
    fn shows_trailing_window_only() {
        let values: Vec<f64> = (0..30).map(f64::from).collect();
        let chart = TerminalChart::new(Vec::new(), layout(8, 6), false);
        let lines = chart.lines(&frame(&values, &values, Status::Normal));
        assert!(lines[lines.len() - 2].contains("samples 22..29"));
    }

    #[test]
    fn color_follows_status() {
        let chart = TerminalChart::new(Vec::new(), layout(4, 6), true);
        let alert = chart.lines(&frame(&[95.0], &[60.0], Status::Alert)).join("\n");
        assert!(alert.contains(Status::Alert.palette().ansi));
        assert!(!alert.contains(Status::Normal.palette().ansi));
    }

    #[test]
    fn render_writes_from_cursor_home() {
        let mut chart = TerminalChart::new(Vec::new(), layout(4, 4), false);
        chart
            .render(&frame(&[50.0], &[50.0], Status::Normal))
            .unwrap();
        let out = String::from_utf8(chart.into_inner()).unwrap();
        assert!(out.starts_with(CURSOR_HOME));
        assert_eq!(out.matches(CLEAR_LINE).count(), 4 + CHROME_ROWS);
    }
}
