pub mod app;
pub mod controls;
pub mod transport;
pub mod visualizer;
