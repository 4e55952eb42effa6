#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::element::Element;

/// Behavior knobs for a [`Diagram`](crate::Diagram).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct Settings {
    /// Move a loaded molecule into the working frame with unit bond length.
    pub normalize_coordinates: bool,
    /// Scale estimates below this fall back to 1.
    pub min_scale_length: f64,
    /// Multiplier from working coordinates to renderer coordinates.
    pub scale_factor: f64,
    /// Label for atoms added without one.
    pub default_label: Element,
    pub reject_duplicate_bonds: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            normalize_coordinates: true,
            min_scale_length: 1e-3,
            scale_factor: 1.0,
            default_label: Element::C,
            reject_duplicate_bonds: false,
        }
    }
}

impl Settings {
    pub fn with_normalize_coordinates(mut self, normalize: bool) -> Self {
        self.normalize_coordinates = normalize;
        self
    }

    pub fn with_min_scale_length(mut self, length: f64) -> Self {
        self.min_scale_length = length;
        self
    }

    pub fn with_scale_factor(mut self, factor: f64) -> Self {
        self.scale_factor = factor;
        self
    }

    pub fn with_default_label(mut self, label: Element) -> Self {
        self.default_label = label;
        self
    }

    pub fn with_reject_duplicate_bonds(mut self, reject: bool) -> Self {
        self.reject_duplicate_bonds = reject;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert!(s.normalize_coordinates);
        assert_eq!(s.min_scale_length, 1e-3);
        assert_eq!(s.scale_factor, 1.0);
        assert_eq!(s.default_label, Element::C);
        assert!(!s.reject_duplicate_bonds);
    }

    #[test]
    fn builder_chains() {
        let s = Settings::default()
            .with_normalize_coordinates(false)
            .with_scale_factor(40.0)
            .with_default_label(Element::N)
            .with_reject_duplicate_bonds(true)
            .with_min_scale_length(0.5);
        assert!(!s.normalize_coordinates);
        assert_eq!(s.scale_factor, 40.0);
        assert_eq!(s.default_label, Element::N);
        assert!(s.reject_duplicate_bonds);
        assert_eq!(s.min_scale_length, 0.5);
    }
}
