//! # ferrodb-server
//!
//! The TCP front end over [`ferrodb_core`]'s expiring store and named cache
//! manager: a declarative command spec registry, a validator, a per-line
//! dispatcher, verb handlers, and the listener that ties them to a bound
//! socket. Exposed as a library primarily so integration tests can drive a
//! real [`server::Server`] without shelling out to the compiled binary.

pub mod command_spec;
pub mod config;
pub mod dispatcher;
pub mod error_handling;
pub mod handlers;
pub mod server;
pub mod validator;

pub use config::ServerConfig;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use server::Server;
