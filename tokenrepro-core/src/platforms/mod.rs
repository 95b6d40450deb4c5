// File: src/platforms/mod.rs

pub mod clerk;
