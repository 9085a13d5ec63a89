//! Domain entities for the viewer.
//!
//! Pure data and arithmetic with no I/O: this layer can be compiled and tested
//! on any platform without a network or a WebRTC stack.

/// Remote screen / local canvas dimensions and coordinate mapping.
pub mod resolution;
