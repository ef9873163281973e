pub mod banner;
pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod consts;
pub mod engine;
pub mod entry;
pub mod error;
pub mod events;
pub mod registry;
pub mod trigger;
