pub mod config;
pub mod error;
pub mod importer;
pub mod model;
pub mod notion;
pub mod opengraph;
