#[path = "../helpers/mod.rs"]
mod helpers;

mod emitter_runtime;
mod mask_runtime;
mod pool;
mod trajectory;
mod versioning;
