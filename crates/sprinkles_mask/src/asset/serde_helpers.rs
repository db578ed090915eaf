use bevy::prelude::*;

pub(crate) fn is_zero_f32(value: &f32) -> bool {
    *value == 0.0
}

pub(crate) fn is_zero_u32(value: &u32) -> bool {
    *value == 0
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

pub(crate) fn is_true(value: &bool) -> bool {
    *value
}

pub(crate) fn is_one_vec3(value: &Vec3) -> bool {
    *value == Vec3::ONE
}
