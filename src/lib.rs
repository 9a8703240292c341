#![doc = include_str!("RUSTDOC.md")]

pub mod logger;
pub mod metricalp;
pub mod platform;
