//! # Communications interface crate.
//!
//! Provides the serial message protocol shared by the chassis and the boards it talks to, along
//! with the channel abstraction the protocol runs over.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Byte channels (serial links or their host stand-ins) that frames are carried on
pub mod channel;

/// Message definitions exchanged with peer equipment (main board, remote controller)
pub mod eqpt;

/// Message framing, validation and dispatch
pub mod msg;
