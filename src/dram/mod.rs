//! DRAM Command Scheduler Core.
//!
//! The pieces that together decide what command a channel issues each
//! cycle: the frozen protocol timing table, the per-bank state machines,
//! the channel state that couples them, the refresh generator, the
//! command queue arbiter, and the controller tick that drives them all.

pub mod bank_state;
pub mod channel_state;
pub mod command_queue;
pub mod controller;
pub mod refresh;
pub mod timing;

pub use bank_state::{BankState, BankStateTag};
pub use channel_state::ChannelState;
pub use command_queue::{CommandClass, CommandQueue};
pub use controller::Controller;
pub use refresh::Refresh;
pub use timing::TimingTable;
