use std::f32::consts::TAU;

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::compute::{
    AccumulationBuffer, ComputeBackend, ComputeError, ComputeSettings, EmitCursor, WORKGROUP_SIZE,
};

/// Primitive used when rasterizing a particle into the accumulation image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Reflect)]
pub enum ParticleShape {
    /// Disc with linear radial falloff.
    #[default]
    Circle,
    /// Solid box, no falloff.
    Square,
    /// Streak drawn forward along the velocity with a linear tail falloff.
    Spark,
}

/// Concrete, pixel-space parameters for one [`ParticlePool::emit`] call.
///
/// Angles are in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterSettings {
    /// Spawn center in pixels.
    pub position: Vec2,
    /// Central launch angle.
    pub direction: f32,
    /// Full width of the launch cone around `direction`.
    pub spread: f32,
    /// Initial speed in pixels per second.
    pub speed: f32,
    /// Particle size in pixels.
    pub size: f32,
    /// Radius of the spawn disc in pixels. Negative values spawn at `position`.
    pub emission_radius: f32,
    /// Linear RGB color.
    pub color: Vec3,
    /// Time to live in seconds.
    pub particle_life: f32,
    /// Rasterization primitive.
    pub shape: ParticleShape,
    /// Tail length in pixels for [`ParticleShape::Spark`].
    pub spark_length: f32,
    /// Wrap the emission cursor and overwrite old slots instead of dropping claims.
    pub endless: bool,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            direction: 0.0,
            spread: 0.0,
            speed: 0.0,
            size: 6.0,
            emission_radius: 0.0,
            color: Vec3::ONE,
            particle_life: 3.0,
            shape: ParticleShape::Circle,
            spark_length: 12.0,
            endless: false,
        }
    }
}

/// Snapshot of a single pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle {
    /// Position in pixels.
    pub position: Vec2,
    /// Velocity in pixels per second.
    pub velocity: Vec2,
    /// Linear RGB color.
    pub color: Vec3,
    /// Size in pixels.
    pub size: f32,
    /// Rasterization primitive.
    pub shape: ParticleShape,
    /// Spark tail length in pixels.
    pub spark_length: f32,
    /// Seconds since spawn.
    pub age: f32,
    /// Seconds the particle lives for.
    pub life: f32,
    /// Inactive slots hold stale data and are never aged or drawn.
    pub active: bool,
}

/// Accumulated RGBA output of one rasterization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major `[r, g, b, a]` pixels, unclamped.
    pub pixels: Vec<[f32; 4]>,
}

impl ParticleImage {
    /// Raw `[r, g, b, a]` at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get((y as usize) * (self.width as usize) + x as usize)
            .copied()
    }

    /// Alpha channel clamped to `[0, 1]`.
    pub fn mask(&self) -> Vec<f32> {
        self.pixels.iter().map(|p| p[3].clamp(0.0, 1.0)).collect()
    }

    /// Color channels clamped to `[0, 1]`.
    pub fn rgb(&self) -> Vec<Vec3> {
        self.pixels
            .iter()
            .map(|p| Vec3::new(p[0], p[1], p[2]).clamp(Vec3::ZERO, Vec3::ONE))
            .collect()
    }

    /// Raw little-endian RGBA32F bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

/// Fixed-capacity particle storage laid out as a structure of arrays.
///
/// Slots are assigned by a shared emission cursor. In bounded mode claims past the
/// capacity are dropped; in endless mode the cursor wraps and overwrites old slots.
pub struct ParticlePool {
    capacity: usize,
    width: u32,
    height: u32,
    seed: u32,

    position: Vec<Vec2>,
    velocity: Vec<Vec2>,
    color: Vec<Vec3>,
    size: Vec<f32>,
    shape: Vec<ParticleShape>,
    spark_length: Vec<f32>,
    age: Vec<f32>,
    life: Vec<f32>,
    active: Vec<bool>,

    cursor: EmitCursor,
    image: AccumulationBuffer,
    backend: ComputeBackend,
}

impl ParticlePool {
    /// Creates a pool of `capacity` slots (at least one) for a `width`×`height` canvas.
    pub fn new(capacity: usize, width: u32, height: u32, backend: ComputeBackend) -> Self {
        let capacity = capacity.max(1);
        debug!("allocating particle pool: {capacity} slots, {width}x{height} canvas");

        Self {
            capacity,
            width,
            height,
            seed: 0,
            position: vec![Vec2::ZERO; capacity],
            velocity: vec![Vec2::ZERO; capacity],
            color: vec![Vec3::ZERO; capacity],
            size: vec![0.0; capacity],
            shape: vec![ParticleShape::default(); capacity],
            spark_length: vec![0.0; capacity],
            age: vec![0.0; capacity],
            life: vec![0.0; capacity],
            active: vec![false; capacity],
            cursor: EmitCursor::default(),
            image: AccumulationBuffer::new(width as usize, height as usize),
            backend,
        }
    }

    /// Creates a pool together with its own compute backend.
    pub fn with_compute_settings(
        capacity: usize,
        width: u32,
        height: u32,
        settings: &ComputeSettings,
    ) -> Result<Self, ComputeError> {
        let backend = ComputeBackend::new(settings)?;
        Ok(Self::new(capacity, width, height, backend))
    }

    /// Number of particle slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Seed mixed into every emission draw.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Sets the seed that, together with the cursor value, determines every emission draw.
    pub fn set_seed(&mut self, seed: u32) {
        self.seed = seed;
    }

    /// Total number of cursor claims since the last reset, including dropped ones.
    pub fn emitted_count(&self) -> u64 {
        self.cursor.get()
    }

    /// Number of live particles.
    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|active| **active).count()
    }

    /// Copies slot `index` out of the pool, or `None` past the capacity.
    pub fn particle(&self, index: usize) -> Option<Particle> {
        if index >= self.capacity {
            return None;
        }
        Some(Particle {
            position: self.position[index],
            velocity: self.velocity[index],
            color: self.color[index],
            size: self.size[index],
            shape: self.shape[index],
            spark_length: self.spark_length[index],
            age: self.age[index],
            life: self.life[index],
            active: self.active[index],
        })
    }

    /// Zeroes every slot, the emission cursor and the image.
    pub fn reset(&mut self) {
        self.position.fill(Vec2::ZERO);
        self.velocity.fill(Vec2::ZERO);
        self.color.fill(Vec3::ZERO);
        self.size.fill(0.0);
        self.shape.fill(ParticleShape::default());
        self.spark_length.fill(0.0);
        self.age.fill(0.0);
        self.life.fill(0.0);
        self.active.fill(false);
        self.cursor.reset();
        self.clear_image();
    }

    /// Zeroes the accumulation image. Particles are untouched.
    pub fn clear_image(&mut self) {
        self.image.clear(&self.backend);
    }

    /// Spawns `count` particles from `settings`.
    ///
    /// The whole request claims one contiguous cursor range. Only claims that end up
    /// owning a slot are drawn: in bounded mode those below the capacity, in endless mode
    /// the latest `capacity` claims, since each of them overwrites the earlier ones on
    /// its slot. Memory use is bounded by the capacity, whatever `count` is.
    pub fn emit(&mut self, count: u32, settings: &EmitterSettings) {
        if count == 0 {
            return;
        }

        let capacity = self.capacity as u64;
        let claims = self.cursor.claim_range(count as u64);
        let live = if settings.endless {
            claims.end.saturating_sub(capacity).max(claims.start)..claims.end
        } else {
            claims.start.min(capacity)..claims.end.min(capacity)
        };

        let seed = self.seed;
        let bounds = self.bounds();
        let first = live.start;
        let spawned: Vec<(usize, Particle)> = self.backend.install(|| {
            (0..(live.end - live.start) as usize)
                .into_par_iter()
                .with_min_len(WORKGROUP_SIZE)
                .map(|offset| {
                    let claim = first + offset as u64;
                    ((claim % capacity) as usize, spawn(settings, seed, claim, bounds))
                })
                .collect()
        });

        for (index, particle) in spawned {
            self.write(index, particle);
        }
    }

    /// Advances every active particle by `dt` seconds under constant `gravity`.
    ///
    /// Velocity is integrated before position. Particles that expire or leave the
    /// canvas are deactivated.
    pub fn update(&mut self, dt: f32, gravity: Vec2) {
        let bounds = self.bounds();
        let Self {
            position,
            velocity,
            age,
            life,
            active,
            backend,
            ..
        } = self;

        backend.install(|| {
            position
                .par_iter_mut()
                .zip(velocity.par_iter_mut())
                .zip(age.par_iter_mut())
                .zip(life.par_iter())
                .zip(active.par_iter_mut())
                .with_min_len(WORKGROUP_SIZE)
                .for_each(|((((position, velocity), age), life), active)| {
                    if !*active {
                        return;
                    }
                    *age += dt;
                    if *age >= *life {
                        *active = false;
                        return;
                    }
                    *velocity += gravity * dt;
                    *position += *velocity * dt;
                    if !in_canvas(*position, bounds) {
                        *active = false;
                    }
                });
        });
    }

    /// Additively draws every active particle into the image.
    pub fn rasterize(&self) {
        self.backend.dispatch(self.capacity, |index| {
            if self.active[index] {
                self.rasterize_particle(index);
            }
        });
    }

    /// Accumulated image, unclamped.
    pub fn get_image(&self) -> ParticleImage {
        ParticleImage {
            width: self.width,
            height: self.height,
            pixels: self.image.read(),
        }
    }

    /// Alpha channel of the image clamped to `[0, 1]`.
    pub fn mask(&self) -> Vec<f32> {
        self.get_image().mask()
    }

    /// Raw RGBA32F bytes of the image.
    pub fn image_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.image.read()).to_vec()
    }

    fn bounds(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    fn write(&mut self, index: usize, particle: Particle) {
        self.position[index] = particle.position;
        self.velocity[index] = particle.velocity;
        self.color[index] = particle.color;
        self.size[index] = particle.size;
        self.shape[index] = particle.shape;
        self.spark_length[index] = particle.spark_length;
        self.age[index] = particle.age;
        self.life[index] = particle.life;
        self.active[index] = particle.active;
    }

    fn rasterize_particle(&self, index: usize) {
        let center = self.position[index];
        let x = center.x as i32;
        let y = center.y as i32;
        let (width, height) = (self.width as i32, self.height as i32);
        if x < 0 || x >= width || y < 0 || y >= height {
            return;
        }

        let color = self.color[index];
        let plot = |px: i32, py: i32, alpha: f32| {
            if px >= 0 && px < width && py >= 0 && py < height {
                self.image
                    .accumulate(px as usize, py as usize, (color * alpha).extend(alpha));
            }
        };

        let radius = ((self.size[index] * 0.5) as i32).max(1);
        match self.shape[index] {
            ParticleShape::Circle => {
                for oy in -radius..=radius {
                    for ox in -radius..=radius {
                        let dist = ((ox * ox + oy * oy) as f32).sqrt();
                        if dist <= radius as f32 {
                            let falloff = (1.0 - dist / radius as f32).clamp(0.0, 1.0);
                            plot(x + ox, y + oy, falloff);
                        }
                    }
                }
            }
            ParticleShape::Square => {
                for oy in -radius..=radius {
                    for ox in -radius..=radius {
                        plot(x + ox, y + oy, 1.0);
                    }
                }
            }
            ParticleShape::Spark => {
                let length = (self.spark_length[index] as i32).max(1);
                let velocity = self.velocity[index];
                let dir = velocity / (velocity.length() + 1e-6);
                for step in 0..=length {
                    let px = x + (dir.x * step as f32) as i32;
                    let py = y + (dir.y * step as f32) as i32;
                    let alpha = (1.0 - step as f32 / length as f32).min(1.0);
                    plot(px, py, alpha);
                }
            }
        }
    }
}

fn in_canvas(position: Vec2, bounds: Vec2) -> bool {
    position.x >= 0.0 && position.x < bounds.x && position.y >= 0.0 && position.y < bounds.y
}

fn draw_seed(seed: u32, claim: u64) -> u64 {
    ((seed as u64) << 32) ^ claim
}

fn spawn(settings: &EmitterSettings, seed: u32, claim: u64, bounds: Vec2) -> Particle {
    let mut rng = Pcg32::seed_from_u64(draw_seed(seed, claim));

    let angle = settings.direction + (rng.random::<f32>() - 0.5) * settings.spread;
    let radius = settings.emission_radius.max(0.0) * rng.random::<f32>().sqrt();
    let theta = rng.random::<f32>() * TAU;

    let position = settings.position + Vec2::new(theta.cos(), theta.sin()) * radius;

    Particle {
        position,
        velocity: Vec2::new(angle.cos(), angle.sin()) * settings.speed,
        color: settings.color,
        size: settings.size,
        shape: settings.shape,
        spark_length: settings.spark_length,
        age: 0.0,
        life: settings.particle_life,
        active: in_canvas(position, bounds),
    }
}
