//! Commands Module
//!
//! Operations the app's UI (or the CLI) invokes

pub mod backup;
