// EveTranslator - platform/mod.rs
//
// Platform abstraction layer: directories, file encoding, OS window list and
// network providers.
// Dependencies: util, core types and traits.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
pub mod providers;
pub mod window;
