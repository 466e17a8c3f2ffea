use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub velocity: Vec2,
    /// Ticks left to live; 0 means the slot is free.
    pub time: u32,
    pub size: f32,
    pub size_delta: f32,
    /// Tint passed through to whatever draws the particle.
    pub colour: [f32; 4],
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            velocity: Vec2::ZERO,
            time: 0,
            size: 0.0,
            size_delta: 0.0,
            colour: [1.0; 4],
        }
    }
}

impl Particle {
    pub fn is_active(&self) -> bool {
        self.time > 0
    }
}

/// Fixed-capacity particle ring. New particles overwrite the oldest slot once
/// the ring is full.
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    slots: Vec<Particle>,
    cursor: usize,
}

impl ParticleSystem {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            slots: vec![Particle::default(); capacity],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn emit(
        &mut self,
        pos: Vec2,
        velocity: Vec2,
        lifetime: u32,
        size: f32,
        size_delta: f32,
        colour: [f32; 4],
    ) {
        self.slots[self.cursor] = Particle {
            pos,
            velocity,
            time: lifetime,
            size,
            size_delta,
            colour,
        };
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// Ages every live particle by one tick and integrates its motion.
    /// `drag` scales velocity after the move (1.0 keeps it unchanged).
    pub fn update(&mut self, dt: f32, drag: f32) {
        for p in self.slots.iter_mut().filter(|p| p.is_active()) {
            p.time -= 1;
            p.size += p.size_delta;
            p.pos += p.velocity * dt;
            p.velocity *= drag;
        }
    }

    pub fn slots(&self) -> &[Particle] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [Particle] {
        &mut self.slots
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &Particle> {
        self.slots.iter().filter(|p| p.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.iter_active().count()
    }

    pub fn clear(&mut self) {
        self.slots.fill(Particle::default());
        self.cursor = 0;
    }
}
