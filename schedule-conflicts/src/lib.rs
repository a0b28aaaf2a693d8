//! Detects overlapping appointments per person and reports them.
//!
//! `conflicts` holds the detector itself and depends on nothing else in the
//! crate. `config`, `parser`, `display`, `export` and `web` turn CSV exports
//! into people/appointment snapshots and present the resulting report.

pub mod config;
pub mod conflicts;
pub mod display;
pub mod export;
pub mod parser;
pub mod web;

pub use config::{ConfigError, Settings, ViewFilter};
pub use conflicts::{detect, Appointment, ConflictGroup, Person};
pub use parser::{load_snapshot, ParseError, Snapshot};
