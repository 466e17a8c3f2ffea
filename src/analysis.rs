use rayon::prelude::*;

use crate::field::Field;
use crate::flow::Flow;
use crate::stencil::PressureStencil;

/// Sum of |central-difference divergence| over the interior of a 2-channel
/// field.
pub fn divergence_sum(v: &Field) -> f32 {
    let (w, h) = (v.width(), v.height());
    (1..h - 1)
        .into_par_iter()
        .map(|y| {
            (1..w - 1)
                .map(|x| PressureStencil::divergence(v, x, y).abs())
                .sum::<f32>()
        })
        .sum()
}

/// Sum of |neighbour differences| between interior cells, over all channels.
pub fn total_variation(f: &Field) -> f32 {
    let (w, h, channels) = (f.width(), f.height(), f.channels());
    (1..h - 1)
        .into_par_iter()
        .map(|y| {
            let mut tv = 0.0;
            for x in 1..w - 1 {
                for c in 0..channels {
                    let here = f.at(x, y, c);
                    if x + 1 < w - 1 {
                        tv += (f.at(x + 1, y, c) - here).abs();
                    }
                    if y + 1 < h - 1 {
                        tv += (f.at(x, y + 1, c) - here).abs();
                    }
                }
            }
            tv
        })
        .sum()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowMetrics {
    pub frame: usize,
    pub divergence: f32,
    pub vorticity: f32,
    pub kinetic_energy: f32,
    pub max_speed: f32,
    pub density_mass: f32,
    pub max_density: f32,
}

impl FlowMetrics {
    pub fn analyze(flow: &Flow, frame: usize) -> Self {
        let v = flow.velocity();
        let d = flow.density();
        let (w, h) = (v.width(), v.height());

        let (kinetic_energy, max_speed, vorticity) = (1..h - 1)
            .into_par_iter()
            .map(|y| {
                let mut energy = 0.0f32;
                let mut max_speed = 0.0f32;
                let mut curl = 0.0f32;
                for x in 1..w - 1 {
                    let (vx, vy) = (v.at(x, y, 0), v.at(x, y, 1));
                    let speed_sq = vx * vx + vy * vy;
                    energy += 0.5 * speed_sq;
                    max_speed = max_speed.max(speed_sq.sqrt());
                    curl += ((v.at(x + 1, y, 1) - v.at(x - 1, y, 1))
                        - (v.at(x, y + 1, 0) - v.at(x, y - 1, 0)))
                        .abs()
                        / 2.0;
                }
                (energy, max_speed, curl)
            })
            .reduce(
                || (0.0, 0.0, 0.0),
                |(e1, m1, c1), (e2, m2, c2)| (e1 + e2, m1.max(m2), c1 + c2),
            );

        let density_mass = d.as_slice().par_iter().sum::<f32>();
        let max_density = d.as_slice().iter().copied().fold(0.0f32, f32::max);

        Self {
            frame,
            divergence: divergence_sum(v),
            vorticity,
            kinetic_energy,
            max_speed,
            density_mass,
            max_density,
        }
    }

    pub fn log_summary(&self) {
        log::info!(
            "frame {}: divergence {:.6}, vorticity {:.6}, energy {:.6}, max speed {:.6}, density {:.3} (max {:.3})",
            self.frame,
            self.divergence,
            self.vorticity,
            self.kinetic_energy,
            self.max_speed,
            self.density_mass,
            self.max_density
        );
    }
}

#[derive(Debug, Default)]
pub struct AnalysisRecorder {
    pub metrics_history: Vec<FlowMetrics>,
}

impl AnalysisRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&mut self, flow: &Flow, frame: usize) -> &FlowMetrics {
        self.metrics_history.push(FlowMetrics::analyze(flow, frame));
        &self.metrics_history[self.metrics_history.len() - 1]
    }

    pub fn log_trends(&self) {
        let (Some(first), Some(last)) = (self.metrics_history.first(), self.metrics_history.last())
        else {
            return;
        };
        if self.metrics_history.len() < 2 {
            return;
        }
        log::info!(
            "energy {:.6} -> {:.6} ({:+.3}%)",
            first.kinetic_energy,
            last.kinetic_energy,
            (last.kinetic_energy - first.kinetic_energy) / first.kinetic_energy.max(0.001) * 100.0
        );
        log::info!(
            "divergence {:.6} -> {:.6}, density {:.3} -> {:.3}",
            first.divergence,
            last.divergence,
            first.density_mass,
            last.density_mass
        );
    }
}
