//! Command Queue and Arbiter.
//!
//! Pending column commands sit in one FIFO per bank (PER_BANK) or per
//! rank (PER_RANK). Each cycle the arbiter rotates round-robin over the
//! queues, walks the first unblocked queue in insertion order, and asks
//! the channel state what each entry needs. The first answer that
//! survives precharge arbitration and the write-after-read check wins.
//! Issued READ/WRITE commands leave their queue; precursors (ACTIVATE,
//! PRECHARGE, refresh, SREF_EXIT) do not, so the entry that demanded
//! them is retried on a later cycle.

use std::collections::HashSet;

use crate::common::cmd::{Command, CommandType};
use crate::config::{Config, QueueStructure};

use super::channel_state::ChannelState;

/// A row this many hits deep may be closed even with row-hits pending,
/// so conflicting rows cannot be starved.
const ROW_HIT_CAP: u32 = 4;

/// Restricts what the arbiter may hand back; used by the HBM dual
/// command path to pair a row command with a column command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandClass {
    Row,
    Column,
}

pub struct CommandQueue {
    queues: Vec<Vec<Command>>,
    queue_size: usize,
    queue_structure: QueueStructure,
    banks: usize,
    banks_per_group: usize,
    queue_idx: usize,
    in_ref: bool,
    ref_blocked: HashSet<usize>,
}

impl CommandQueue {
    pub fn new(config: &Config) -> Self {
        let num_queues = match config.system.queue_structure {
            QueueStructure::PerBank => config.dram.ranks * config.banks(),
            QueueStructure::PerRank => config.dram.ranks,
        };
        Self {
            queues: vec![Vec::with_capacity(config.system.cmd_queue_size); num_queues],
            queue_size: config.system.cmd_queue_size,
            queue_structure: config.system.queue_structure,
            banks: config.banks(),
            banks_per_group: config.dram.banks_per_group,
            queue_idx: 0,
            in_ref: false,
            ref_blocked: HashSet::new(),
        }
    }

    /// Whether the queue for this bank can take one more command.
    pub fn will_accept(&self, rank: usize, bankgroup: usize, bank: usize) -> bool {
        self.queues[self.queue_index(rank, bankgroup, bank)].len() < self.queue_size
    }

    /// Appends a column command. Returns false when the queue is full so
    /// the ingress layer can apply backpressure.
    pub fn add_command(&mut self, cmd: Command) -> bool {
        let idx = self.queue_index(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank);
        if self.queues[idx].len() < self.queue_size {
            self.queues[idx].push(cmd);
            true
        } else {
            false
        }
    }

    /// Picks the next issuable command, rotating round-robin over the
    /// queues. Queues covered by an in-progress refresh are skipped.
    pub fn get_command_to_issue(
        &mut self,
        channel_state: &ChannelState,
        clk: u64,
    ) -> Option<Command> {
        self.next_command(channel_state, clk, None)
    }

    /// Like `get_command_to_issue`, restricted to one command class.
    pub fn get_command_of_class(
        &mut self,
        channel_state: &ChannelState,
        clk: u64,
        class: CommandClass,
    ) -> Option<Command> {
        self.next_command(channel_state, clk, Some(class))
    }

    fn next_command(
        &mut self,
        channel_state: &ChannelState,
        clk: u64,
        class: Option<CommandClass>,
    ) -> Option<Command> {
        for _ in 0..self.queues.len() {
            self.queue_idx = (self.queue_idx + 1) % self.queues.len();
            if self.in_ref && self.ref_blocked.contains(&self.queue_idx) {
                continue;
            }
            if let Some(cmd) = self.first_ready_in_queue(self.queue_idx, channel_state, clk, class)
            {
                if cmd.is_read_write() {
                    self.erase_queued_command(&cmd);
                }
                return Some(cmd);
            }
        }
        None
    }

    /// Walks one queue in insertion order and returns the first entry
    /// whose resolved command passes every check.
    fn first_ready_in_queue(
        &self,
        idx: usize,
        channel_state: &ChannelState,
        clk: u64,
        class: Option<CommandClass>,
    ) -> Option<Command> {
        let queue = &self.queues[idx];
        for (pos, queued) in queue.iter().enumerate() {
            let Some(cmd) = channel_state.get_ready_command(queued, clk) else {
                continue;
            };
            match class {
                Some(CommandClass::Column) if !cmd.is_read_write() => continue,
                Some(CommandClass::Row) if cmd.is_read_write() => continue,
                _ => {}
            }
            if cmd.cmd_type == CommandType::Precharge
                && !self.arbitrate_precharge(queue, pos, &cmd, channel_state)
            {
                continue;
            }
            if cmd.is_write() && self.has_write_after_read_hazard(queue, pos) {
                continue;
            }
            return Some(cmd);
        }
        None
    }

    /// Decides whether an on-demand precharge may close the row.
    ///
    /// An earlier entry for the same bank gets to drive its own
    /// precharge instead. Pending row-hits keep the row open until the
    /// hit counter reaches the cap.
    fn arbitrate_precharge(
        &self,
        queue: &[Command],
        pos: usize,
        pre: &Command,
        channel_state: &ChannelState,
    ) -> bool {
        let addr = pre.addr;
        for earlier in &queue[..pos] {
            if earlier.addr.rank == addr.rank
                && earlier.addr.bankgroup == addr.bankgroup
                && earlier.addr.bank == addr.bank
            {
                return false;
            }
        }

        let open_row = channel_state.open_row(addr.rank, addr.bankgroup, addr.bank);
        let pending_row_hits = queue[pos..].iter().any(|later| {
            Some(later.addr.row) == open_row
                && later.addr.rank == addr.rank
                && later.addr.bankgroup == addr.bankgroup
                && later.addr.bank == addr.bank
        });
        let hit_limit_reached =
            channel_state.row_hit_count(addr.rank, addr.bankgroup, addr.bank) >= ROW_HIT_CAP;

        !pending_row_hits || hit_limit_reached
    }

    /// A write may not pass an earlier read to the same column.
    fn has_write_after_read_hazard(&self, queue: &[Command], pos: usize) -> bool {
        let write = &queue[pos];
        queue[..pos].iter().any(|earlier| {
            earlier.is_read()
                && earlier.addr.row == write.addr.row
                && earlier.addr.column == write.addr.column
                && earlier.addr.bank == write.addr.bank
                && earlier.addr.bankgroup == write.addr.bankgroup
        })
    }

    /// Drives the pending refresh forward. On first entry the covered
    /// queues are blocked; each call then yields either a PRECHARGE for
    /// a bank still holding a row open, the refresh itself once every
    /// covered bank has quiesced, or nothing while timing blocks it.
    /// Issuing the refresh unblocks the queues.
    pub fn finish_refresh(&mut self, channel_state: &ChannelState, clk: u64) -> Option<Command> {
        let ref_cmd = *channel_state.pending_ref_command();
        if !self.in_ref {
            self.ref_blocked = self.refresh_queue_indices(&ref_cmd);
            self.in_ref = true;
        }
        let cmd = channel_state.get_ready_command(&ref_cmd, clk)?;
        if cmd.is_refresh() {
            self.ref_blocked.clear();
            self.in_ref = false;
        }
        Some(cmd)
    }

    fn refresh_queue_indices(&self, ref_cmd: &Command) -> HashSet<usize> {
        let mut indices = HashSet::new();
        match ref_cmd.cmd_type {
            CommandType::Refresh => match self.queue_structure {
                QueueStructure::PerBank => {
                    for i in 0..self.queues.len() {
                        if i / self.banks == ref_cmd.addr.rank {
                            indices.insert(i);
                        }
                    }
                }
                QueueStructure::PerRank => {
                    indices.insert(ref_cmd.addr.rank);
                }
            },
            CommandType::RefreshBank => {
                indices.insert(self.queue_index(
                    ref_cmd.addr.rank,
                    ref_cmd.addr.bankgroup,
                    ref_cmd.addr.bank,
                ));
            }
            _ => unreachable!("non-refresh command in the refresh queue"),
        }
        indices
    }

    /// Removes an issued READ/WRITE from its queue, matching on linear
    /// address and command type. The command must be present.
    fn erase_queued_command(&mut self, cmd: &Command) {
        let idx = self.queue_index(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank);
        let queue = &mut self.queues[idx];
        let pos = queue
            .iter()
            .position(|c| c.addr.hex == cmd.addr.hex && c.cmd_type == cmd.cmd_type)
            .expect("issued command missing from its queue");
        queue.remove(pos);
    }

    fn queue_index(&self, rank: usize, bankgroup: usize, bank: usize) -> usize {
        match self.queue_structure {
            QueueStructure::PerRank => rank,
            QueueStructure::PerBank => {
                rank * self.banks + bankgroup * self.banks_per_group + bank
            }
        }
    }

    /// True when no entry targets the given bank.
    pub fn no_commands_for_bank(&self, rank: usize, bankgroup: usize, bank: usize) -> bool {
        let idx = self.queue_index(rank, bankgroup, bank);
        self.queues[idx].iter().all(|c| {
            c.addr.rank != rank || c.addr.bankgroup != bankgroup || c.addr.bank != bank
        })
    }

    /// True when every queue of the rank is empty.
    pub fn rank_queues_empty(&self, rank: usize) -> bool {
        match self.queue_structure {
            QueueStructure::PerRank => self.queues[rank].is_empty(),
            QueueStructure::PerBank => (0..self.banks)
                .all(|b| self.queues[rank * self.banks + b].is_empty()),
        }
    }

    /// Total number of queued commands.
    pub fn queue_usage(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }
}
