//! S7 PLC simulation core.
//!
//! This module contains the data-block memory engine, the bit-exact type
//! codec for the supported S7 data types, the configuration model and
//! validator, the background synchronizer that bridges internal buffers
//! with the externally served image, and the script execution engine.
//!
//! Start with [`config::Config`] to load a DB layout, then
//! [`simulator::Simulator::start`] to bring the PLC up.

pub mod codec;
pub mod config;
pub mod files;
pub mod script;
pub mod server;
pub mod simulator;
pub mod store;
pub mod sync;
pub mod types;
pub mod value;
