use super::helpers::*;

use sprinkles_mask::runtime::EmitterRuntime;

#[test]
fn new_emitter_runtime_starts_empty() {
    let runtime = EmitterRuntime::new(3);

    assert_eq!(runtime.emitter_index, 3);
    assert_eq!(runtime.accumulator, 0.0);
    assert_eq!(runtime.burst.previous, 0.0);
    assert_eq!(runtime.path_progress.progress, 0.0);
    assert_eq!(runtime.path_progress.direction, 1.0);
}

#[test]
fn accumulate_carries_the_remainder() {
    let mut runtime = EmitterRuntime::new(0);

    assert_eq!(runtime.accumulate(2.5, 1.0), 2);
    assert_approx(runtime.accumulator, 0.5, "carried fraction");
    assert_eq!(runtime.accumulate(2.5, 1.0), 3);
    assert_approx(runtime.accumulator, 0.0, "no remainder");
}

#[test]
fn negative_rates_emit_nothing() {
    let mut runtime = EmitterRuntime::new(0);
    runtime.accumulator = 0.4;

    assert_eq!(runtime.accumulate(-50.0, 1.0), 0);
    assert_approx(runtime.accumulator, 0.4, "accumulator unchanged");
}

#[test]
fn reset_clears_carried_state() {
    let mut runtime = EmitterRuntime::new(1);
    runtime.accumulator = 0.7;
    runtime.burst.previous = 0.9;
    runtime.path_progress.progress = 0.4;
    runtime.path_progress.direction = -1.0;

    runtime.reset();

    assert_eq!(runtime, EmitterRuntime::new(1));
}
