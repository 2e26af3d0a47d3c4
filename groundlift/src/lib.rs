//! Facade crate: wires the socket, codec, discovery, and transport layers
//! into the `Client` a front-end drives, and owns the process-wide ambient
//! concerns (logging setup, the configuration snapshot) those layers
//! consume but don't own themselves.

pub mod client;
pub mod config;
pub mod logging;
pub mod paths;

pub use client::{Client, ListenHandle, SendHandle};
pub use config::Config;
