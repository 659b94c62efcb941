pub mod compression;
pub mod constants;
pub mod container;
pub mod error;
pub mod format;
