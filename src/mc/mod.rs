// src/mc/mod.rs
pub mod accumulator;
pub mod aggregator;
pub mod engine;
pub mod executor;
pub mod path_sim;
pub mod payoffs;
