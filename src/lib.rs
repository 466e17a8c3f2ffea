//! Grid fluid solver for driving smoke and air currents in particle effects.

pub mod analysis;
pub mod config;
pub mod export;
pub mod field;
pub mod flow;
pub mod particles;
pub mod stencil;

pub use analysis::{AnalysisRecorder, FlowMetrics, divergence_sum, total_variation};
pub use config::{FlowConfig, Relaxation, WorldExtent};
pub use export::ImageExporter;
pub use field::Field;
pub use flow::Flow;
pub use particles::{Particle, ParticleSystem};
pub use stencil::{Border, LinearBorder, PressureStencil, Stencil, SupportStencil, ViscosityStencil};
