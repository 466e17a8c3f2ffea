//! Per-cell update rules and ghost-cell policies consumed by the [`Field`]
//! convolution drivers.
//!
//! Both traits run once per cell on the hot path, so implementations must not
//! allocate. Plain closures implement them too, which keeps one-off stencils in
//! tests and tools short.

use crate::field::Field;

/// Computes a ghost cell value from its nearest interior neighbour.
pub trait Border {
    fn border(&self, neighbour: f32) -> f32;
}

impl<F> Border for F
where
    F: Fn(f32) -> f32,
{
    #[inline]
    fn border(&self, neighbour: f32) -> f32 {
        self(neighbour)
    }
}

/// `ghost = coefficient * neighbour`.
///
/// A coefficient of 1 reflects (zero normal gradient), 0 pins the edge to
/// zero and -1 gives a no-slip wall for velocity components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearBorder {
    pub coefficient: f32,
}

impl LinearBorder {
    pub const REFLECT: Self = Self { coefficient: 1.0 };
    pub const ZERO: Self = Self { coefficient: 0.0 };
    pub const NO_SLIP: Self = Self { coefficient: -1.0 };

    pub fn new(coefficient: f32) -> Self {
        Self { coefficient }
    }
}

impl Border for LinearBorder {
    #[inline]
    fn border(&self, neighbour: f32) -> f32 {
        self.coefficient * neighbour
    }
}

/// New value for `field(x, y, c)`, reading only the field being updated.
pub trait Stencil {
    fn stencil(&self, field: &Field, x: usize, y: usize, c: usize) -> f32;
}

impl<F> Stencil for F
where
    F: Fn(&Field, usize, usize, usize) -> f32,
{
    #[inline]
    fn stencil(&self, field: &Field, x: usize, y: usize, c: usize) -> f32 {
        self(field, x, y, c)
    }
}

/// New value for `field(x, y, c)` that also reads a second, read-only field
/// which may have a different channel count.
pub trait SupportStencil {
    fn stencil(&self, field: &Field, support: &Field, x: usize, y: usize, c: usize) -> f32;
}

impl<F> SupportStencil for F
where
    F: Fn(&Field, &Field, usize, usize, usize) -> f32,
{
    #[inline]
    fn stencil(&self, field: &Field, support: &Field, x: usize, y: usize, c: usize) -> f32 {
        self(field, support, x, y, c)
    }
}

/// One relaxation step of implicit diffusion:
/// `(old * alpha + sum of the 4 axis neighbours) * beta`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViscosityStencil {
    pub alpha: f32,
    pub beta: f32,
}

impl ViscosityStencil {
    pub fn new(alpha: f32, beta: f32) -> Self {
        Self { alpha, beta }
    }

    /// Coefficients for `quality` sweeps of a diffusion step.
    ///
    /// `viscosity == 0` gives an infinite `alpha`; nothing here guards it.
    pub fn from_params(viscosity: f32, timestep: f32, quality: usize) -> Self {
        let alpha = 1.0 / viscosity * timestep / quality as f32;
        let beta = 1.0 / (alpha + 4.0);
        Self { alpha, beta }
    }
}

impl Stencil for ViscosityStencil {
    #[inline]
    fn stencil(&self, f: &Field, x: usize, y: usize, c: usize) -> f32 {
        (f.at(x, y, c) * self.alpha
            + f.at(x + 1, y, c)
            + f.at(x - 1, y, c)
            + f.at(x, y + 1, c)
            + f.at(x, y - 1, c))
            * self.beta
    }
}

/// Poisson relaxation for pressure, with the velocity field as support.
///
/// `P = (P(x+1,y) + P(x-1,y) + P(x,y+1) + P(x,y-1) - div V) / 4` where the
/// divergence is an unscaled central difference.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PressureStencil;

impl PressureStencil {
    /// Central-difference divergence of a 2-channel field at an interior cell.
    #[inline]
    pub fn divergence(v: &Field, x: usize, y: usize) -> f32 {
        (v.at(x + 1, y, 0) - v.at(x - 1, y, 0)) + (v.at(x, y + 1, 1) - v.at(x, y - 1, 1))
    }
}

impl SupportStencil for PressureStencil {
    #[inline]
    fn stencil(&self, p: &Field, v: &Field, x: usize, y: usize, _c: usize) -> f32 {
        (p.at(x + 1, y, 0) + p.at(x - 1, y, 0) + p.at(x, y + 1, 0) + p.at(x, y - 1, 0)
            - Self::divergence(v, x, y))
            / 4.0
    }
}
