//! Simplification parameters

use serde::{Deserialize, Serialize};
use slabcrate_core::{Error, Result};

/// How a face's envelope planes are weighted when folded into sphere quadrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightingScheme {
    /// Every face contributes with weight 1.
    Uniform,
    /// Weight by the area of the center triangle.
    Area,
    /// Weight by `1 / cos²α`, α the steepest radius slope between the face's
    /// spheres, so faces joining very different radii resist merging.
    Hyperbolic,
    /// Area times the hyperbolic factor.
    #[default]
    AreaHyperbolic,
}

impl TryFrom<u8> for WeightingScheme {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::Uniform),
            1 => Ok(Self::Area),
            2 => Ok(Self::Hyperbolic),
            3 => Ok(Self::AreaHyperbolic),
            _ => Err(Error::invalid_param("weighting", code, "expected 0..=3")),
        }
    }
}

/// Treatment of spheres and edges on the skeleton's boundary curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoundaryMode {
    /// Boundary only raises the cost through the boundary penalty.
    #[default]
    Unconstrained,
    /// Boundary spheres are never collapsed away nor moved.
    Frozen,
    /// Merged spheres touching the boundary are projected back onto it.
    Projected,
}

impl TryFrom<u8> for BoundaryMode {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::Unconstrained),
            1 => Ok(Self::Frozen),
            2 => Ok(Self::Projected),
            _ => Err(Error::invalid_param("boundary_mode", code, "expected 0..=2")),
        }
    }
}

/// Parameters for slab-mesh simplification. Immutable for the length of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifyConfig {
    /// Weight `k` of the ball term `k·‖s − s₀‖²`. Smaller values let the
    /// envelope planes dominate. Default: 0.00001
    pub scale_factor: f64,

    /// Multiplier of the boundary penalty. Default: 1.0
    pub boundary_weight: f64,

    /// Per-face weighting of envelope planes. Default: `AreaHyperbolic`
    pub weighting: WeightingScheme,

    /// Default: `Unconstrained`
    pub boundary_mode: BoundaryMode,

    /// Reject collapses that flip an incident patch. Default: false
    pub prevent_inversion: bool,

    /// Measure envelope-to-surface deviation after the run (expensive). Default: false
    pub track_approximation_error: bool,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            scale_factor: 0.00001,
            boundary_weight: 1.0,
            weighting: WeightingScheme::default(),
            boundary_mode: BoundaryMode::default(),
            prevent_inversion: false,
            track_approximation_error: false,
        }
    }
}

impl SimplifyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_scale_factor(mut self, k: f64) -> Self {
        self.scale_factor = k;
        self
    }

    #[must_use]
    pub fn with_boundary_weight(mut self, weight: f64) -> Self {
        self.boundary_weight = weight;
        self
    }

    #[must_use]
    pub fn with_weighting(mut self, weighting: WeightingScheme) -> Self {
        self.weighting = weighting;
        self
    }

    #[must_use]
    pub fn with_boundary_mode(mut self, mode: BoundaryMode) -> Self {
        self.boundary_mode = mode;
        self
    }

    #[must_use]
    pub fn with_prevent_inversion(mut self, prevent: bool) -> Self {
        self.prevent_inversion = prevent;
        self
    }

    #[must_use]
    pub fn with_track_approximation_error(mut self, track: bool) -> Self {
        self.track_approximation_error = track;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(Error::invalid_param(
                "scale_factor",
                self.scale_factor,
                "must be a positive finite number",
            ));
        }
        if !self.boundary_weight.is_finite() || self.boundary_weight < 0.0 {
            return Err(Error::invalid_param(
                "boundary_weight",
                self.boundary_weight,
                "must be a non-negative finite number",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimplifyConfig::default();
        assert!((config.scale_factor - 0.00001).abs() < 1e-12);
        assert_eq!(config.weighting, WeightingScheme::AreaHyperbolic);
        assert_eq!(config.boundary_mode, BoundaryMode::Unconstrained);
        assert!(!config.prevent_inversion);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SimplifyConfig::new()
            .with_scale_factor(0.001)
            .with_boundary_mode(BoundaryMode::Frozen)
            .with_prevent_inversion(true);
        assert_eq!(config.scale_factor, 0.001);
        assert_eq!(config.boundary_mode, BoundaryMode::Frozen);
        assert!(config.prevent_inversion);
    }

    #[test]
    fn test_validation() {
        assert!(SimplifyConfig::new().with_scale_factor(0.0).validate().is_err());
        assert!(SimplifyConfig::new().with_scale_factor(f64::NAN).validate().is_err());
        assert!(SimplifyConfig::new().with_boundary_weight(-1.0).validate().is_err());
        assert!(SimplifyConfig::new().with_boundary_weight(0.0).validate().is_ok());
    }

    #[test]
    fn test_integer_codes() {
        assert_eq!(WeightingScheme::try_from(3).unwrap(), WeightingScheme::AreaHyperbolic);
        assert_eq!(WeightingScheme::try_from(0).unwrap(), WeightingScheme::Uniform);
        assert!(WeightingScheme::try_from(4).is_err());
        assert_eq!(BoundaryMode::try_from(2).unwrap(), BoundaryMode::Projected);
        assert!(BoundaryMode::try_from(9).is_err());
    }
}
