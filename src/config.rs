use std::path::Path;

use serde::{Deserialize, Serialize};

/// Ordering of the relaxation sweeps used by the pressure solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relaxation {
    /// Row-major sweep writing into the buffer it reads (Gauss-Seidel-like).
    #[default]
    InPlace,
    /// Every cell reads the previous iterate only.
    Jacobi,
}

/// Size of the world region the grid covers, in particle coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldExtent {
    pub width: f32,
    pub height: f32,
}

impl Default for WorldExtent {
    fn default() -> Self {
        Self {
            width: 480.0,
            height: 320.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub width: usize,
    pub height: usize,
    /// Relaxation sweeps per pressure solve.
    pub pressure_quality: usize,
    /// Relaxation sweeps per viscosity pass.
    pub viscosity_quality: usize,
    pub viscosity: f32,
    /// Outer-edge coefficient for the viscosity pass.
    pub border: f32,
    /// Coefficient applied when copying into obstacle cells.
    pub obstacle_border: f32,
    /// Route viscosity through the obstacle mask in [`crate::Flow::step`].
    pub use_obstacles: bool,
    pub relaxation: Relaxation,
    /// Multiplier on the pressure gradient subtracted from velocity. 1.0
    /// subtracts the raw central difference; 0.25 matches the gradient to
    /// the unscaled divergence used by the pressure solve.
    pub gradient_scale: f32,
    pub world: WorldExtent,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 48,
            pressure_quality: 20,
            viscosity_quality: 4,
            viscosity: 0.01,
            border: -1.0,
            obstacle_border: -1.0,
            use_obstacles: false,
            relaxation: Relaxation::InPlace,
            gradient_scale: 1.0,
            world: WorldExtent::default(),
        }
    }
}

impl FlowConfig {
    pub fn with_size(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::debug!("loaded flow config from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, Box<dyn std::error::Error>> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects parameters the solver cannot run with. The solver itself never
    /// checks them.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.width < 3 || self.height < 3 {
            return Err(format!("grid must be at least 3x3, got {}x{}", self.width, self.height).into());
        }
        if self.pressure_quality == 0 || self.viscosity_quality == 0 {
            return Err("quality settings must be at least 1".into());
        }
        if !(self.viscosity > 0.0 && self.viscosity.is_finite()) {
            return Err(format!("viscosity must be positive and finite, got {}", self.viscosity).into());
        }
        if !self.gradient_scale.is_finite() {
            return Err("gradient_scale must be finite".into());
        }
        if !(self.world.width > 0.0 && self.world.height > 0.0) {
            return Err("world extent must be positive".into());
        }
        Ok(())
    }
}
