pub mod controller;
pub mod mime;
