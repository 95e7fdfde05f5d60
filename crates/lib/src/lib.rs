//! Parley core library — configuration, REST transport, socket lifecycle,
//! client state, and the active session controller used by both the CLI and
//! desktop applications.

pub mod api;
pub mod config;
pub mod controller;
pub mod models;
pub mod protocol;
pub mod socket;
pub mod state;
