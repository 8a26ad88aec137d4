pub mod camera;
pub mod config;
pub mod error;
pub mod pickup;
pub mod state;
