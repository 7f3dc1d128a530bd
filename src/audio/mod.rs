pub mod graph;
pub mod media;
pub mod microphone;
