// Library exports for testing
pub mod accumulator;
pub mod capture;
pub mod config;
pub mod constants;
pub mod microphone;
pub mod revealer;
pub mod transport;
