// EveTranslator - core/mod.rs
//
// Core business logic layer.
// Dependencies: util, plus pure-logic crates (regex, chrono, whatlang).
// Must NOT depend on: platform, app, or any network crate.

pub mod detector;
pub mod discovery;
pub mod export;
pub mod glossary;
pub mod model;
pub mod parser;
pub mod tokenizer;
pub mod translate;
