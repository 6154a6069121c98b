//! Import/export layers for the supported file formats

pub mod dbc;
pub mod yaml;
