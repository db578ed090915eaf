use std::collections::HashMap;

use bevy::prelude::*;

use crate::compute::{ComputeBackend, ComputeError, ComputeSettings};
use crate::pool::ParticlePool;

/// Keeps one [`ParticlePool`] per canvas size so repeated runs reuse their buffers.
///
/// A request for more capacity than the cached pool holds drops every cached pool and
/// allocates a new one. Smaller requests reuse the larger pool.
#[derive(Resource, Default)]
pub struct ParticleSystemCache {
    pools: HashMap<(u32, u32), ParticlePool>,
    backend: Option<ComputeBackend>,
    settings: ComputeSettings,
}

impl ParticleSystemCache {
    /// Creates an empty cache whose backend will be built from `settings`.
    pub fn new(settings: ComputeSettings) -> Self {
        Self {
            settings,
            ..default()
        }
    }

    /// Shared compute backend, created on first use.
    pub fn backend(&mut self) -> Result<ComputeBackend, ComputeError> {
        if let Some(backend) = &self.backend {
            return Ok(backend.clone());
        }
        let backend = ComputeBackend::new(&self.settings)?;
        self.backend = Some(backend.clone());
        Ok(backend)
    }

    /// Returns the pool for a `width`×`height` canvas holding at least `max_particles`.
    pub fn get_or_create(
        &mut self,
        width: u32,
        height: u32,
        max_particles: usize,
    ) -> Result<&mut ParticlePool, ComputeError> {
        let key = (width, height);
        let cached = self
            .pools
            .remove(&key)
            .filter(|pool| pool.capacity() >= max_particles.max(1));

        let pool = match cached {
            Some(pool) => pool,
            None => {
                let backend = self.backend()?;
                if !self.pools.is_empty() {
                    info!(
                        "dropping {} cached particle pools for {width}x{height} with {max_particles} particles",
                        self.pools.len()
                    );
                }
                self.pools.clear();
                ParticlePool::new(max_particles, width, height, backend)
            }
        };

        Ok(self.pools.entry(key).or_insert(pool))
    }

    /// The cached pool for a `width`×`height` canvas, if any.
    pub fn get(&self, width: u32, height: u32) -> Option<&ParticlePool> {
        self.pools.get(&(width, height))
    }

    /// Number of cached pools.
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Returns `true` when no pool is cached.
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Drops every cached pool. The compute backend is kept.
    pub fn reset(&mut self) {
        self.pools.clear();
    }
}
