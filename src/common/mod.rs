//! Common types used throughout the DRAM simulator.
//!
//! This module provides the fundamental data carriers shared across the
//! scheduler core: device addresses, DRAM commands, and host transactions.

/// Address types and the configurable bit-sliced address mapper.
pub mod addr;

/// DRAM command and host transaction definitions.
pub mod cmd;

pub use addr::{Address, AddressMap};
pub use cmd::{Command, CommandType, Transaction, NUM_COMMAND_TYPES};
