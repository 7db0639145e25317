//! Library side of the `numeval` command: suite loading, configuration
//! resolution, and console rendering.

pub mod console;
pub mod settings;
pub mod suite;
