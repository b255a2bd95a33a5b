pub mod core;
pub mod courses;
pub mod divisions;
pub mod upload;
