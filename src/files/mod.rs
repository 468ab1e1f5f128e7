//! # Archivos estáticos
//! src/files/mod.rs
//!
//! - `path`: traducción segura de URLs a rutas bajo el document root
//! - `serve`: lógica de GET/HEAD sobre esas rutas

pub mod path;
pub mod serve;

pub use serve::serve;
