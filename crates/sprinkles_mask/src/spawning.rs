use bevy::prelude::*;

use crate::{
    asset::ParticleMaskAsset,
    cache::ParticleSystemCache,
    pool::ParticlePool,
    runtime::{ParticleMask, ParticleMaskFrame, ParticleMaskRuntime},
};

pub fn setup_particle_masks(
    mut commands: Commands,
    mut cache: ResMut<ParticleSystemCache>,
    assets: Res<Assets<ParticleMaskAsset>>,
    query: Query<(Entity, &ParticleMask), Without<ParticleMaskRuntime>>,
) {
    for (entity, mask) in query.iter() {
        let Some(asset) = assets.get(&mask.handle) else {
            continue;
        };

        if mask.width == 0 || mask.height == 0 {
            warn!(
                "particle mask \"{}\" has an empty canvas ({}x{}), skipping",
                asset.name, mask.width, mask.height
            );
            continue;
        }

        let backend = match cache.backend() {
            Ok(backend) => backend,
            Err(err) => {
                error!("particle mask \"{}\": {err}", asset.name);
                continue;
            }
        };

        let pool = ParticlePool::new(
            asset.settings.particle_count,
            mask.width,
            mask.height,
            backend,
        );
        commands
            .entity(entity)
            .insert(ParticleMaskRuntime::new(asset, mask, pool));
    }
}

pub fn step_particle_masks(
    mut commands: Commands,
    assets: Res<Assets<ParticleMaskAsset>>,
    mut query: Query<(Entity, &ParticleMask, &mut ParticleMaskRuntime)>,
) {
    for (entity, mask, mut runtime) in query.iter_mut() {
        let Some(asset) = assets.get(&mask.handle) else {
            continue;
        };

        let index = runtime.frame;
        let Some(frame) = runtime.step(asset) else {
            continue;
        };

        if runtime.finished {
            debug!("particle mask \"{}\" finished after {} frames", asset.name, index + 1);
        }

        commands
            .entity(entity)
            .insert(ParticleMaskFrame { index, frame });
    }
}

pub fn restart_modified_particle_masks(
    mut events: MessageReader<AssetEvent<ParticleMaskAsset>>,
    mut commands: Commands,
    query: Query<(Entity, &ParticleMask), With<ParticleMaskRuntime>>,
) {
    for event in events.read() {
        let AssetEvent::Modified { id } = event else {
            continue;
        };
        for (entity, mask) in query.iter() {
            if mask.handle.id() == *id {
                commands.entity(entity).remove::<ParticleMaskRuntime>();
            }
        }
    }
}

pub fn cleanup_particle_masks(
    mut commands: Commands,
    mut removed: RemovedComponents<ParticleMask>,
    query: Query<(), With<ParticleMaskRuntime>>,
) {
    for entity in removed.read() {
        if query.contains(entity) {
            commands
                .entity(entity)
                .remove::<(ParticleMaskRuntime, ParticleMaskFrame)>();
        }
    }
}
