//! DRAM Command and Host Transaction Types.
//!
//! A `Transaction` is what the host sees: a linear address plus a
//! read/write flag. A `Command` is what the DRAM device sees: one of the
//! protocol command types applied to a decoded `Address`. The controller
//! turns transactions into column commands; the channel state machine
//! generates the row commands (ACTIVATE, PRECHARGE, refresh, self-refresh)
//! needed to make them issuable.

use super::addr::Address;

/// Number of distinct command types, used to size per-bank timing tables.
pub const NUM_COMMAND_TYPES: usize = 10;

/// DRAM device command types.
///
/// `ReadPrecharge` and `WritePrecharge` are the auto-precharge variants
/// that implicitly close the row after the column access completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandType {
    Read,
    ReadPrecharge,
    Write,
    WritePrecharge,
    Activate,
    Precharge,
    Refresh,
    RefreshBank,
    SrefEnter,
    SrefExit,
}

impl CommandType {
    /// Index into per-bank timing tables.
    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A DRAM command: a command type applied to a decoded address.
///
/// `issue_cycle` is zero until the controller issues the command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    pub cmd_type: CommandType,
    pub addr: Address,
    pub issue_cycle: u64,
}

impl Command {
    pub fn new(cmd_type: CommandType, addr: Address) -> Self {
        Self {
            cmd_type,
            addr,
            issue_cycle: 0,
        }
    }

    /// True for READ and READ with auto-precharge.
    pub fn is_read(&self) -> bool {
        matches!(
            self.cmd_type,
            CommandType::Read | CommandType::ReadPrecharge
        )
    }

    /// True for WRITE and WRITE with auto-precharge.
    pub fn is_write(&self) -> bool {
        matches!(
            self.cmd_type,
            CommandType::Write | CommandType::WritePrecharge
        )
    }

    /// True for any column command (the commands that occupy the data bus).
    pub fn is_read_write(&self) -> bool {
        self.is_read() || self.is_write()
    }

    /// True for rank-level and bank-level refresh.
    pub fn is_refresh(&self) -> bool {
        matches!(
            self.cmd_type,
            CommandType::Refresh | CommandType::RefreshBank
        )
    }

    /// True for commands that apply to every bank in a rank.
    pub fn is_rank_wide(&self) -> bool {
        matches!(
            self.cmd_type,
            CommandType::Refresh | CommandType::SrefEnter | CommandType::SrefExit
        )
    }
}

/// A host memory transaction.
///
/// The address is carried pre-decoded; equality of two transactions'
/// targets is equality of `addr.hex`.
#[derive(Clone, Copy, Debug)]
pub struct Transaction {
    pub addr: Address,
    pub is_write: bool,
    /// Cycle the transaction entered the controller.
    pub added_cycle: u64,
    /// Cycle the data transfer completes. Zero while still in flight.
    pub complete_cycle: u64,
}

impl Transaction {
    pub fn new(addr: Address, is_write: bool, added_cycle: u64) -> Self {
        Self {
            addr,
            is_write,
            added_cycle,
            complete_cycle: 0,
        }
    }
}
