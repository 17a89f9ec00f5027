// EveTranslator - app/mod.rs
//
// Application layer: tailing, discovery scans, sessions, the shared
// pipeline worker and the manager that ties them together.
// Dependencies: core, platform, util.

pub mod dir_watcher;
pub mod discovery;
pub mod manager;
pub mod pipeline;
pub mod session;
pub mod state_store;
pub mod tail;
pub mod translator;
