pub mod file;
pub mod models;
