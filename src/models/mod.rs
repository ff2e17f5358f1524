// src/models/mod.rs
pub mod curve;
pub mod swaption;
