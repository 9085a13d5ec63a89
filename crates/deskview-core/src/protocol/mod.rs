//! Control-channel protocol: message types and the JSON text-frame codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_control, encode_control, ProtocolError};
pub use messages::*;
