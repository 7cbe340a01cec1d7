//! Stereoscopic media output: a threaded native window layer with a
//! master/slave window pair, and an interlaced stereo renderer with
//! monitor-aware pixel parity and shutter-glasses signalling.

pub mod geometry;
pub mod monitor;
pub mod output;
pub mod settings;
pub mod window;

pub use output::{Eye, InstanceRegistry, OutputError, StereoOutput};
pub use window::{Window, WindowError};
