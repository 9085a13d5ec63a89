//! Domain layer for deskview-client.
//!
//! Holds plain configuration types.  Nothing here performs I/O: the
//! infrastructure layer fills these structs from the CLI and the config file.

pub mod config;

pub use config::ViewerConfig;
