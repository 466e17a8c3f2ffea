use std::path::Path;

use image::{ImageBuffer, Rgb, RgbImage};

use crate::field::Field;
use crate::flow::Flow;

/// Writes PNG snapshots of flow fields for offline inspection.
pub struct ImageExporter {
    width: u32,
    height: u32,
    /// Density value drawn at full intensity.
    pub density_scale: f32,
    /// Speed drawn at full intensity.
    pub velocity_scale: f32,
}

impl ImageExporter {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            density_scale: 1.0,
            velocity_scale: 1.0,
        }
    }

    /// Nearest-cell upscale of a 1-channel field, dark blue to white.
    pub fn render_density(&self, density: &Field) -> RgbImage {
        let mut img = ImageBuffer::new(self.width, self.height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let (fx, fy) = self.to_field(density, x, y);
            let value = (density.at(fx, fy, 0) / self.density_scale).clamp(0.0, 1.0);
            let intensity = (value * 255.0) as u8;
            *pixel = Rgb([intensity, intensity, 255]);
        }
        img
    }

    /// Red for |vx|, green for |vy|.
    pub fn render_velocity(&self, velocity: &Field) -> RgbImage {
        let mut img = ImageBuffer::new(self.width, self.height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let (fx, fy) = self.to_field(velocity, x, y);
            let r = (velocity.at(fx, fy, 0).abs() / self.velocity_scale * 255.0).min(255.0) as u8;
            let g = (velocity.at(fx, fy, 1).abs() / self.velocity_scale * 255.0).min(255.0) as u8;
            *pixel = Rgb([r, g, 128]);
        }
        img
    }

    pub fn export_density_png(&self, flow: &Flow, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.render_density(flow.density()).save(path)?;
        Ok(())
    }

    pub fn export_velocity_png(&self, flow: &Flow, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.render_velocity(flow.velocity()).save(path)?;
        Ok(())
    }

    fn to_field(&self, field: &Field, x: u32, y: u32) -> (usize, usize) {
        let fx = (x as usize * field.width() / self.width as usize).min(field.width() - 1);
        let fy = (y as usize * field.height() / self.height as usize).min(field.height() - 1);
        (fx, fy)
    }
}
