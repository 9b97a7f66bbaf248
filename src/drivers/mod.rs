//! Actuator and input drivers over `embedded-hal` traits.

pub mod button;
pub mod pump;
pub mod valve;
