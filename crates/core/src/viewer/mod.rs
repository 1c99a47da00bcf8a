//! Interactive replay: cursor navigation and timed autoplay

mod autoplay;
mod navigator;

pub use autoplay::GameViewer;
pub use navigator::{BoardView, Navigator, Orientation};
