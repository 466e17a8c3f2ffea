use glam::Vec2;

use crate::config::{FlowConfig, Relaxation, WorldExtent};
use crate::field::Field;
use crate::particles::ParticleSystem;
use crate::stencil::{LinearBorder, PressureStencil, ViscosityStencil};

#[inline]
fn lerp(a: f32, v1: f32, v2: f32) -> f32 {
    (1.0 - a) * v1 + a * v2
}

/// Interpolates along x on both rows, then along y between the two results.
#[inline]
fn lerp2x2(dx: f32, dy: f32, v11: f32, v21: f32, v12: f32, v22: f32) -> f32 {
    lerp(dy, lerp(dx, v11, v21), lerp(dx, v12, v22))
}

/// Clamps a traced source coordinate so its floor is at most `extent - 2`.
#[inline]
fn clamp_source(s: f32, extent: usize) -> f32 {
    let mut s = s;
    if s < 0.0 {
        s = 0.0;
    }
    if s >= (extent - 1) as f32 {
        s = extent as f32 - 1.001;
    }
    s
}

/// Stable-fluids velocity solver on a fixed grid.
///
/// Per tick the passes must run in this order: [`Flow::advect`] (which swaps
/// the velocity buffers), then [`Flow::viscosity`] or
/// [`Flow::viscosity_masked`], then [`Flow::pressure`]. [`Flow::step`] runs
/// exactly that sequence. Particle coupling reads whatever is current.
#[derive(Debug, Clone)]
pub struct Flow {
    config: FlowConfig,
    velocity: [Field; 2],
    current: usize,
    pressure: Field,
    pressure_scratch: Field,
    density: Field,
    obstacles: Field,
}

impl Flow {
    pub fn new(config: FlowConfig) -> Self {
        let (w, h) = (config.width, config.height);
        log::debug!(
            "flow {}x{}: pressure quality {}, viscosity quality {}, {:?} relaxation",
            w,
            h,
            config.pressure_quality,
            config.viscosity_quality,
            config.relaxation
        );
        Self {
            velocity: [Field::new(w, h, 2), Field::new(w, h, 2)],
            current: 0,
            pressure: Field::new(w, h, 1),
            pressure_scratch: Field::new(w, h, 1),
            density: Field::new(w, h, 1),
            obstacles: Field::new(w, h, 1),
            config,
        }
    }

    pub fn width(&self) -> usize {
        self.config.width
    }

    pub fn height(&self) -> usize {
        self.config.height
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn set_world_extent(&mut self, world: WorldExtent) {
        self.config.world = world;
    }

    pub fn set_relaxation(&mut self, relaxation: Relaxation) {
        self.config.relaxation = relaxation;
    }

    pub fn set_gradient_scale(&mut self, scale: f32) {
        self.config.gradient_scale = scale;
    }

    pub fn current(&self) -> &Field {
        &self.velocity[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Field {
        &mut self.velocity[self.current]
    }

    pub fn other(&self) -> &Field {
        &self.velocity[1 - self.current]
    }

    /// Flips which velocity buffer is current.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    /// The settled velocity field, for instrumentation and rendering.
    pub fn velocity(&self) -> &Field {
        self.current()
    }

    pub fn pressure_field(&self) -> &Field {
        &self.pressure
    }

    pub fn density(&self) -> &Field {
        &self.density
    }

    pub fn density_mut(&mut self) -> &mut Field {
        &mut self.density
    }

    pub fn obstacles(&self) -> &Field {
        &self.obstacles
    }

    pub fn obstacles_mut(&mut self) -> &mut Field {
        &mut self.obstacles
    }

    pub fn set_obstacle(&mut self, x: usize, y: usize, solid: bool) {
        self.obstacles[(x, y, 0)] = if solid { 1.0 } else { 0.0 };
    }

    pub fn add_velocity(&mut self, x: usize, y: usize, velocity: Vec2) {
        if x < self.width() && y < self.height() {
            let v = self.current_mut();
            v[(x, y, 0)] += velocity.x;
            v[(x, y, 1)] += velocity.y;
        }
    }

    /// Adds `force` over a disc of `radius` cells with a quadratic falloff.
    pub fn add_force(&mut self, x: usize, y: usize, force: Vec2, radius: f32) {
        let (w, h) = (self.width() as i64, self.height() as i64);
        let r = radius.max(0.0);
        let r_sq = r * r;
        let reach = r as i64;
        let (x, y) = (x as i64, y as i64);
        // only offsets that land on the grid
        let (dx_lo, dx_hi) = ((-reach).max(-x), reach.min(w - 1 - x));
        let (dy_lo, dy_hi) = ((-reach).max(-y), reach.min(h - 1 - y));
        let v = &mut self.velocity[self.current];
        for dy in dy_lo..=dy_hi {
            for dx in dx_lo..=dx_hi {
                let px = x + dx;
                let py = y + dy;
                let dist_sq = (dx * dx + dy * dy) as f32;
                if dist_sq > r_sq {
                    continue;
                }
                let falloff = if r_sq > 0.0 { 1.0 - dist_sq / r_sq } else { 1.0 };
                v[(px as usize, py as usize, 0)] += force.x * falloff;
                v[(px as usize, py as usize, 1)] += force.y * falloff;
            }
        }
    }

    /// One tick: advection, viscosity, then pressure projection.
    pub fn step(&mut self, timestep: f32) {
        let viscosity = self.config.viscosity;
        self.advect(timestep);
        if self.config.use_obstacles {
            self.viscosity_masked(
                viscosity,
                timestep,
                self.config.border,
                self.config.obstacle_border,
            );
        } else {
            self.viscosity(viscosity, timestep, self.config.border);
        }
        self.pressure();
        log::trace!("flow step dt={timestep}");
    }

    /// Semi-Lagrangian advection of velocity by itself.
    ///
    /// Every cell, ghost ring included, traces back by `timestep * v` and
    /// samples the current buffer bilinearly into the other buffer; the
    /// buffers are then swapped. Zero velocity reproduces the field exactly.
    pub fn advect(&mut self, timestep: f32) {
        let (w, h) = (self.width(), self.height());
        let [a, b] = &mut self.velocity;
        let (src, dst) = if self.current == 0 { (&*a, b) } else { (&*b, a) };

        for y in 0..h {
            for x in 0..w {
                let dx = clamp_source(x as f32 - timestep * src.at(x, y, 0), w);
                let dy = clamp_source(y as f32 - timestep * src.at(x, y, 1), h);

                let ix = dx as usize;
                let iy = dy as usize;
                let sx = dx - ix as f32;
                let sy = dy - iy as f32;

                for c in 0..2 {
                    dst[(x, y, c)] = lerp2x2(
                        sx,
                        sy,
                        src.at(ix, iy, c),
                        src.at(ix + 1, iy, c),
                        src.at(ix, iy + 1, c),
                        src.at(ix + 1, iy + 1, c),
                    );
                }
            }
        }

        self.swap();
        self.debug_check_finite("advection");
    }

    /// Implicit diffusion of the current velocity, `viscosity_quality` sweeps.
    ///
    /// `viscosity` must be positive; zero divides by zero and fills the field
    /// with non-finite values (asserted in debug builds).
    pub fn viscosity(&mut self, viscosity: f32, timestep: f32, border: f32) {
        debug_assert!(viscosity > 0.0, "viscosity must be > 0, got {viscosity}");
        let quality = self.config.viscosity_quality;
        let kernel = ViscosityStencil::from_params(viscosity, timestep, quality);
        let b = LinearBorder::new(border);
        self.velocity[self.current].convolve(&kernel, &b, quality);
        self.debug_check_finite("viscosity");
    }

    /// [`Flow::viscosity`] that treats non-zero cells of the obstacle mask as
    /// solid. `outbound` applies on the domain edge, `inbound` when copying
    /// into an obstacle cell from open fluid.
    pub fn viscosity_masked(&mut self, viscosity: f32, timestep: f32, outbound: f32, inbound: f32) {
        debug_assert!(viscosity > 0.0, "viscosity must be > 0, got {viscosity}");
        let quality = self.config.viscosity_quality;
        let kernel = ViscosityStencil::from_params(viscosity, timestep, quality);
        let b_in = LinearBorder::new(inbound);
        let b_out = LinearBorder::new(outbound);
        self.velocity[self.current].convolve_masked(&kernel, &b_in, &b_out, &self.obstacles, quality);
        self.debug_check_finite("masked viscosity");
    }

    /// Pressure projection: relaxes a pressure field against the velocity
    /// divergence, then subtracts its central-difference gradient from every
    /// interior velocity cell. Velocity ghost cells are left as they were.
    ///
    /// Pressure is warm-started from the previous call.
    pub fn pressure(&mut self) {
        let quality = self.config.pressure_quality;
        let b = LinearBorder::REFLECT;
        let v = &self.velocity[self.current];
        match self.config.relaxation {
            Relaxation::InPlace => {
                self.pressure.convolve_with(v, &PressureStencil, &b, quality);
            }
            Relaxation::Jacobi => {
                self.pressure.convolve_with_jacobi(
                    v,
                    &PressureStencil,
                    &b,
                    quality,
                    &mut self.pressure_scratch,
                );
            }
        }

        let scale = self.config.gradient_scale;
        let p = &self.pressure;
        let v = &mut self.velocity[self.current];
        for y in 1..p.height() - 1 {
            for x in 1..p.width() - 1 {
                v[(x, y, 0)] -= scale * (p.at(x + 1, y, 0) - p.at(x - 1, y, 0));
                v[(x, y, 1)] -= scale * (p.at(x, y + 1, 0) - p.at(x, y - 1, 0));
            }
        }
        self.debug_check_finite("pressure");
    }

    /// Pushes particles with the velocity under them and, when
    /// `density_multiplier > 0`, rebuilds the density field from their sizes.
    ///
    /// Every slot up to capacity is visited, live or not. Positions map onto
    /// the grid through the configured world extent and snap to the nearest
    /// cell, clamped into the grid.
    pub fn update_particles(
        &mut self,
        particles: &mut ParticleSystem,
        velocity_multiplier: f32,
        density_multiplier: f32,
    ) {
        let (w, h) = (self.width(), self.height());
        let world = self.config.world;
        let deposit = density_multiplier > 0.0;
        if deposit {
            self.density.clear();
        }

        let v = &self.velocity[self.current];
        for p in particles.slots_mut() {
            let px = (w as f32 * p.pos.x / world.width + 0.5) as i64;
            let py = (h as f32 * p.pos.y / world.height + 0.5) as i64;
            let px = px.clamp(0, w as i64 - 1) as usize;
            let py = py.clamp(0, h as i64 - 1) as usize;

            p.velocity += Vec2::new(v.at(px, py, 0), v.at(px, py, 1)) * velocity_multiplier;
            if deposit {
                self.density[(px, py, 0)] += p.size * density_multiplier;
            }
        }
    }

    /// Maps a grid cell centre back to world coordinates.
    pub fn cell_to_world(&self, x: usize, y: usize) -> Vec2 {
        let world = self.config.world;
        Vec2::new(
            x as f32 * world.width / self.width() as f32,
            y as f32 * world.height / self.height() as f32,
        )
    }

    #[inline]
    fn debug_check_finite(&self, pass: &str) {
        debug_assert!(self.current().is_finite(), "{pass} left non-finite velocity");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp2x2_hits_corners() {
        assert_eq!(lerp2x2(0.0, 0.0, 1.0, 2.0, 3.0, 4.0), 1.0);
        assert_eq!(lerp2x2(1.0, 0.0, 1.0, 2.0, 3.0, 4.0), 2.0);
        assert_eq!(lerp2x2(0.0, 1.0, 1.0, 2.0, 3.0, 4.0), 3.0);
        assert_eq!(lerp2x2(1.0, 1.0, 1.0, 2.0, 3.0, 4.0), 4.0);
        assert_eq!(lerp2x2(0.5, 0.5, 1.0, 2.0, 3.0, 4.0), 2.5);
    }

    #[test]
    fn clamp_source_keeps_floor_addressable() {
        assert_eq!(clamp_source(-3.0, 10), 0.0);
        assert_eq!(clamp_source(4.5, 10), 4.5);
        let s = clamp_source(9.0, 10);
        assert!(s < 9.0 && s as usize == 8);
        assert_eq!(clamp_source(50.0, 10) as usize, 8);
    }

    #[test]
    fn swap_toggles_current_and_other() {
        let mut flow = Flow::new(FlowConfig::with_size(8, 8));
        flow.current_mut()[(3, 3, 0)] = 1.0;
        assert_eq!(flow.current().at(3, 3, 0), 1.0);
        flow.swap();
        assert_eq!(flow.other().at(3, 3, 0), 1.0);
        assert_eq!(flow.current().at(3, 3, 0), 0.0);
        flow.swap();
        assert_eq!(flow.current().at(3, 3, 0), 1.0);
    }

    #[test]
    fn add_force_falls_off_with_distance() {
        let mut flow = Flow::new(FlowConfig::with_size(16, 16));
        flow.add_force(8, 8, Vec2::new(4.0, 0.0), 2.0);
        let v = flow.current();
        assert_eq!(v.at(8, 8, 0), 4.0);
        assert_eq!(v.at(9, 8, 0), 3.0);
        assert_eq!(v.at(10, 8, 0), 0.0);
        assert_eq!(v.at(11, 8, 0), 0.0);
    }

    #[test]
    fn add_force_clips_at_grid_edge() {
        let mut flow = Flow::new(FlowConfig::with_size(8, 8));
        flow.add_force(0, 0, Vec2::new(0.0, 1.0), 3.0);
        assert_eq!(flow.current().at(0, 0, 1), 1.0);
    }

    #[test]
    fn add_force_with_huge_radius_only_visits_grid() {
        let mut flow = Flow::new(FlowConfig::with_size(16, 16));
        flow.add_force(8, 8, Vec2::new(2.0, 0.0), f32::INFINITY);
        assert!(flow.current().as_slice().chunks(2).all(|c| c == [2.0, 0.0]));

        let mut flow = Flow::new(FlowConfig::with_size(16, 16));
        flow.add_force(3, 12, Vec2::new(0.0, 1.0), 3000.0);
        let v = flow.current();
        assert!(v.at(0, 0, 1) > 0.99 && v.at(15, 15, 1) > 0.99);
    }

    #[test]
    fn add_force_off_grid_centre_is_ignored() {
        let mut flow = Flow::new(FlowConfig::with_size(8, 8));
        flow.add_force(20, 3, Vec2::new(1.0, 1.0), 2.0);
        assert!(flow.current().as_slice().iter().all(|&v| v == 0.0));
    }
}
