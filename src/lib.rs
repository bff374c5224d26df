pub mod color;
pub mod configstate;
pub mod error;
pub mod form;
pub mod imagesource;
pub mod input;
pub mod interpolator;
pub mod output;
pub mod painter;
pub mod scheduler;
pub mod settings;
pub mod strip;
pub mod telemetry;

#[cfg(test)]
mod testing;
