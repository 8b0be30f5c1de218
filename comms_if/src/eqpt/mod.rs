//! # Equipment Interface
//!
//! This module defines the messages exchanged with the chassis' peers: the main board and the
//! remote controller.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod chassis;
pub mod remote;
