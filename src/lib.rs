//! pollroom gateway library
//!
//! Core functionality for the pollroom live classroom polling gateway:
//! the poll data model and result aggregation, the session room engine,
//! the WebSocket wire protocol, and the client-side session state model.

pub mod cli;
pub mod config;
pub mod logging;
pub mod poll;
pub mod protocol;
pub mod room;
pub mod server;
pub mod state;
