//! Per-Bank State Machine.
//!
//! Each bank tracks which row (if any) is open, the earliest cycle at
//! which each command type may issue, a row-hit counter used by the
//! precharge arbiter, and a latch marking that a refresh request is
//! pending on this bank. Refresh itself is transient: the bank is back
//! in `Closed` the moment the command issues, with tRFC enforced purely
//! through the earliest-issue table.

use crate::common::cmd::{Command, CommandType, NUM_COMMAND_TYPES};

/// Observable bank state between commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BankStateTag {
    Closed,
    Open { row: u64 },
    SelfRefresh,
}

pub struct BankState {
    state: BankStateTag,
    /// Earliest cycle each command type may issue on this bank. Entries
    /// only ever grow: updates take the max with the new constraint.
    cmd_timing: [u64; NUM_COMMAND_TYPES],
    row_hit_count: u32,
    need_refresh: bool,
}

impl Default for BankState {
    fn default() -> Self {
        Self::new()
    }
}

impl BankState {
    pub fn new() -> Self {
        Self {
            state: BankStateTag::Closed,
            cmd_timing: [0; NUM_COMMAND_TYPES],
            row_hit_count: 0,
            need_refresh: false,
        }
    }

    /// Resolves a candidate command against this bank.
    ///
    /// Returns the candidate itself when the state admits it, the
    /// precursor command that must issue first when it does not (an
    /// ACTIVATE for a closed bank, a PRECHARGE for a row conflict, an
    /// SREF_EXIT for a sleeping bank), or `None` when the required
    /// command is still timing-blocked at `clk`.
    pub fn get_ready_command(&self, cmd: &Command, clk: u64) -> Option<Command> {
        use CommandType::*;
        let required = match self.state {
            BankStateTag::Closed => match cmd.cmd_type {
                Read | ReadPrecharge | Write | WritePrecharge => Activate,
                Refresh | RefreshBank | SrefEnter => cmd.cmd_type,
                _ => unreachable!("{:?} candidate on a closed bank", cmd.cmd_type),
            },
            BankStateTag::Open { row } => match cmd.cmd_type {
                Read | ReadPrecharge | Write | WritePrecharge => {
                    if cmd.addr.row == row {
                        cmd.cmd_type
                    } else {
                        Precharge
                    }
                }
                Precharge | Refresh | RefreshBank | SrefEnter => Precharge,
                _ => unreachable!("{:?} candidate on an open bank", cmd.cmd_type),
            },
            BankStateTag::SelfRefresh => match cmd.cmd_type {
                Read | ReadPrecharge | Write | WritePrecharge | SrefExit => SrefExit,
                _ => unreachable!("{:?} candidate on a self-refreshing bank", cmd.cmd_type),
            },
        };

        if clk >= self.cmd_timing[required.index()] {
            Some(Command::new(required, cmd.addr))
        } else {
            None
        }
    }

    /// Applies an issued command to the state machine.
    ///
    /// The command must have been produced by `get_ready_command`; a
    /// command incompatible with the current state is an invariant
    /// violation.
    pub fn update_state(&mut self, cmd: &Command) {
        use CommandType::*;
        match self.state {
            BankStateTag::Closed => match cmd.cmd_type {
                Activate => {
                    self.state = BankStateTag::Open { row: cmd.addr.row };
                    self.row_hit_count = 0;
                }
                Refresh | RefreshBank => {
                    // The recharge completes within tRFC; the bank is
                    // observably Closed again once the command issues.
                    self.row_hit_count = 0;
                    self.need_refresh = false;
                }
                SrefEnter => self.state = BankStateTag::SelfRefresh,
                _ => panic!("{:?} issued to a closed bank", cmd.cmd_type),
            },
            BankStateTag::Open { row } => match cmd.cmd_type {
                Read | Write => {
                    debug_assert_eq!(cmd.addr.row, row);
                    self.row_hit_count += 1;
                }
                ReadPrecharge | WritePrecharge | Precharge => {
                    self.state = BankStateTag::Closed;
                    self.row_hit_count = 0;
                }
                _ => panic!("{:?} issued to an open bank", cmd.cmd_type),
            },
            BankStateTag::SelfRefresh => match cmd.cmd_type {
                SrefExit => self.state = BankStateTag::Closed,
                _ => panic!("{:?} issued to a self-refreshing bank", cmd.cmd_type),
            },
        }
    }

    /// Pushes out the earliest issue cycle for one command type.
    pub fn update_timing(&mut self, cmd_type: CommandType, earliest: u64) {
        let slot = &mut self.cmd_timing[cmd_type.index()];
        *slot = (*slot).max(earliest);
    }

    pub fn state(&self) -> BankStateTag {
        self.state
    }

    pub fn is_row_open(&self) -> bool {
        matches!(self.state, BankStateTag::Open { .. })
    }

    pub fn open_row(&self) -> Option<u64> {
        match self.state {
            BankStateTag::Open { row } => Some(row),
            _ => None,
        }
    }

    pub fn row_hit_count(&self) -> u32 {
        self.row_hit_count
    }

    pub fn need_refresh(&self) -> bool {
        self.need_refresh
    }

    pub fn set_need_refresh(&mut self, need: bool) {
        self.need_refresh = need;
    }
}
