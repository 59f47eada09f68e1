use std::fmt;

use serde::{Deserialize, Serialize};

/// Alert classification of the latest smoothed prediction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Prediction at or below the threshold.
    Normal,
    /// Prediction strictly above the threshold.
    Alert,
}

impl Status {
    /// Upper-case label shown to operators.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Alert => "ALERT",
        }
    }

    /// Predicted-line color for this status.
    #[must_use]
    pub const fn palette(self) -> StatusPalette {
        match self {
            Self::Normal => StatusPalette {
                css: "lime",
                ansi: "\x1b[92m",
            },
            Self::Alert => StatusPalette {
                css: "red",
                ansi: "\x1b[91m",
            },
        }
    }

    /// Whether this is [`Status::Alert`].
    #[must_use]
    pub const fn is_alert(self) -> bool {
        matches!(self, Self::Alert)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Colors keyed off [`Status`]; renderers never pick a line color on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPalette {
    /// SVG/CSS color name.
    pub css: &'static str,
    /// ANSI foreground escape.
    pub ansi: &'static str,
}

/// NORMAL iff `current_predicted <= threshold`.
#[must_use]
pub fn classify(current_predicted: f64, threshold: f64) -> Status {
    if current_predicted > threshold {
        Status::Alert
    } else {
        Status::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_is_normal() {
        assert_eq!(classify(80.0, 80.0), Status::Normal);
        assert_eq!(classify(80.000_001, 80.0), Status::Alert);
        assert_eq!(classify(-5.0, -5.0), Status::Normal);
    }

    #[test]
    fn classification_matches_comparison() {
        let values = [-100.0, -1.0, 0.0, 42.0, 79.9, 80.0, 80.1, 1e9];
        for v in values {
            for t in values {
                assert_eq!(classify(v, t) == Status::Normal, v <= t, "v={v} t={t}");
            }
        }
    }

    #[test]
    fn palette_follows_status() {
        assert_eq!(Status::Normal.palette().css, "lime");
        assert_eq!(Status::Alert.palette().css, "red");
        assert_eq!(Status::Alert.to_string(), "ALERT");
        assert!(!Status::Normal.is_alert());
    }
}
