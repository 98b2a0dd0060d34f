pub mod align;
pub mod apertium;
pub mod config;
pub mod progress;
pub mod report;
pub mod stream;
