//! External forces applied to particle positions.

pub mod wind;
