//! Position constraints relaxed once per iteration.

pub mod fabric;
pub mod motion;
pub mod tether;
