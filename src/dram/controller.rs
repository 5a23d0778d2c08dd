//! Channel Controller.
//!
//! The per-cycle entry point for one channel. Each tick: completed data
//! transfers drain, the refresh generator runs, one pending transaction
//! is scheduled into the command queue, and the arbiter picks at most
//! one command (two on HBM with dual command enabled) which is then
//! applied to the channel state.

use std::collections::{HashMap, VecDeque};

use crate::common::addr::Address;
use crate::common::cmd::{Command, CommandType, Transaction};
use crate::config::{Config, RowBufPolicy};
use crate::stats::Stats;

use super::channel_state::ChannelState;
use super::command_queue::{CommandClass, CommandQueue};
use super::refresh::Refresh;

pub struct Controller {
    channel: usize,
    clk: u64,
    ranks: usize,

    row_buf_policy: RowBufPolicy,
    read_latency: u64,
    trans_queue_size: usize,
    enable_self_refresh: bool,
    sref_threshold: u64,
    aggressive_precharging: bool,
    hbm_dual_cmd: bool,

    channel_state: ChannelState,
    cmd_queue: CommandQueue,
    refresh: Refresh,

    transaction_queue: VecDeque<Transaction>,
    /// In-flight reads keyed by linear address. Only the first read to
    /// an address puts a command in the queue; duplicates piggyback on
    /// its completion.
    pending_reads: HashMap<u64, Vec<Transaction>>,
    /// Transactions with a known completion cycle, drained by `tick`.
    return_queue: Vec<Transaction>,

    pub stats: Stats,
}

impl Controller {
    pub fn new(channel: usize, config: &Config) -> Self {
        Self {
            channel,
            clk: 0,
            ranks: config.dram.ranks,
            row_buf_policy: config.system.row_buf_policy,
            read_latency: config.read_delay(),
            trans_queue_size: config.system.trans_queue_size,
            enable_self_refresh: config.system.enable_self_refresh,
            sref_threshold: config.system.sref_threshold,
            aggressive_precharging: config.system.aggressive_precharging_enabled,
            hbm_dual_cmd: config.is_hbm() && config.system.enable_hbm_dual_cmd,
            channel_state: ChannelState::new(channel, config),
            cmd_queue: CommandQueue::new(config),
            refresh: Refresh::new(config),
            transaction_queue: VecDeque::new(),
            pending_reads: HashMap::new(),
            return_queue: Vec::new(),
            stats: Stats::default(),
        }
    }

    pub fn will_accept_transaction(&self) -> bool {
        self.transaction_queue.len() < self.trans_queue_size
    }

    /// Accepts one host transaction, or reports backpressure.
    pub fn add_transaction(&mut self, addr: Address, is_write: bool) -> bool {
        if !self.will_accept_transaction() {
            self.stats.trans_rejected += 1;
            return false;
        }
        self.transaction_queue
            .push_back(Transaction::new(addr, is_write, self.clk));
        true
    }

    /// Advances the channel by one cycle.
    pub fn tick(&mut self) {
        self.drain_completed();

        for rank in 0..self.ranks {
            if self.channel_state.is_all_bank_idle_in_rank(rank) {
                self.channel_state.rank_idle_cycles[rank] += 1;
                self.stats.rank_idle_cycles += 1;
            } else {
                self.channel_state.rank_idle_cycles[rank] = 0;
            }
        }

        self.refresh.tick(&mut self.channel_state);
        self.schedule_transaction();

        let mut cmd = None;
        let mut from_arbiter = false;
        if self.channel_state.is_refresh_waiting() {
            cmd = self.cmd_queue.finish_refresh(&self.channel_state, self.clk);
        }
        if cmd.is_none() {
            cmd = self.cmd_queue.get_command_to_issue(&self.channel_state, self.clk);
            from_arbiter = true;
        }

        match cmd {
            Some(first) => {
                self.issue_command(first, from_arbiter);
                if self.hbm_dual_cmd {
                    // HBM splits the command bus: one row command and one
                    // column command may issue in the same cycle.
                    let class = if first.is_read_write() {
                        CommandClass::Row
                    } else {
                        CommandClass::Column
                    };
                    if let Some(second) =
                        self.cmd_queue
                            .get_command_of_class(&self.channel_state, self.clk, class)
                    {
                        self.issue_command(second, true);
                        self.stats.dual_commands += 1;
                    }
                }
            }
            None => self.idle_cycle_maintenance(),
        }

        self.clk += 1;
        self.stats.cycles += 1;
    }

    pub fn queue_usage(&self) -> usize {
        self.cmd_queue.queue_usage()
    }

    pub fn channel_state(&self) -> &ChannelState {
        &self.channel_state
    }

    /// Returns completed transactions to the host side and counts them.
    fn drain_completed(&mut self) {
        let clk = self.clk;
        let stats = &mut self.stats;
        self.return_queue.retain(|t| {
            if t.complete_cycle <= clk {
                if t.is_write {
                    stats.writes_done += 1;
                } else {
                    stats.reads_done += 1;
                    stats.read_latency_sum += t.complete_cycle - t.added_cycle;
                }
                false
            } else {
                true
            }
        });
    }

    /// Moves at most one transaction into the command queue per cycle.
    /// Banks covered by a pending refresh are held back so the refresh
    /// can drain first.
    fn schedule_transaction(&mut self) {
        for i in 0..self.transaction_queue.len() {
            let trans = self.transaction_queue[i];
            let cmd = self.trans_to_command(&trans);
            if self.channel_state.is_rw_pending_on_ref(&cmd) {
                continue;
            }
            if !self
                .cmd_queue
                .will_accept(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank)
            {
                continue;
            }

            if trans.is_write {
                // Write data is latched on acceptance; the host sees the
                // write complete next cycle while the column command
                // drains in the background.
                let mut done = trans;
                done.complete_cycle = self.clk + 1;
                self.return_queue.push(done);
                let accepted = self.cmd_queue.add_command(cmd);
                assert!(accepted, "queue refused a command it agreed to accept");
            } else {
                let pending = self.pending_reads.entry(trans.addr.hex).or_default();
                pending.push(trans);
                if pending.len() == 1 {
                    let accepted = self.cmd_queue.add_command(cmd);
                    assert!(accepted, "queue refused a command it agreed to accept");
                }
            }
            let _ = self.transaction_queue.remove(i);
            break;
        }
    }

    fn trans_to_command(&self, trans: &Transaction) -> Command {
        let cmd_type = match (self.row_buf_policy, trans.is_write) {
            (RowBufPolicy::OpenPage, false) => CommandType::Read,
            (RowBufPolicy::OpenPage, true) => CommandType::Write,
            (RowBufPolicy::ClosePage, false) => CommandType::ReadPrecharge,
            (RowBufPolicy::ClosePage, true) => CommandType::WritePrecharge,
        };
        Command::new(cmd_type, trans.addr)
    }

    fn issue_command(&mut self, mut cmd: Command, from_arbiter: bool) {
        cmd.issue_cycle = self.clk;

        if cmd.is_read_write() {
            // A nonzero hit counter means the row was already serving
            // column traffic when this command arrived; a fresh counter
            // means an activate (or precharge + activate) paid for it.
            if self
                .channel_state
                .row_hit_count(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank)
                > 0
            {
                self.stats.num_row_hits += 1;
            } else {
                self.stats.num_row_misses += 1;
            }
        }
        if from_arbiter && cmd.cmd_type == CommandType::Precharge {
            self.stats.num_ondemand_precharges += 1;
        }
        self.stats.record_command(&cmd);

        self.channel_state.update_timing_and_states(&cmd, self.clk);

        if cmd.is_read() {
            if let Some(pending) = self.pending_reads.remove(&cmd.addr.hex) {
                for mut trans in pending {
                    trans.complete_cycle = self.clk + self.read_latency;
                    self.return_queue.push(trans);
                }
            }
        }
    }

    /// Housekeeping on cycles where the arbiter had nothing to issue:
    /// aggressively close idle open rows, then consider self-refresh
    /// entry for long-idle ranks.
    fn idle_cycle_maintenance(&mut self) {
        if self.aggressive_precharging {
            if let Some(pre) = self.find_aggressive_precharge() {
                self.issue_command(pre, false);
                self.stats.num_aggressive_precharges += 1;
                return;
            }
        }
        if self.enable_self_refresh {
            if let Some(sref) = self.find_sref_entry() {
                self.issue_command(sref, false);
            }
        }
    }

    /// An open row with no queued work behind it can be closed early so
    /// the next access to the bank skips the precharge.
    fn find_aggressive_precharge(&self) -> Option<Command> {
        for rank in 0..self.ranks {
            for bg in 0..self.channel_state.bankgroups() {
                for bank in 0..self.channel_state.banks_per_group() {
                    if !self.channel_state.is_row_open(rank, bg, bank) {
                        continue;
                    }
                    if !self.cmd_queue.no_commands_for_bank(rank, bg, bank) {
                        continue;
                    }
                    let pre = Command::new(
                        CommandType::Precharge,
                        Address::bank_of(self.channel, rank, bg, bank),
                    );
                    if let Some(ready) = self.channel_state.get_ready_command(&pre, self.clk) {
                        if ready.cmd_type == CommandType::Precharge {
                            return Some(ready);
                        }
                    }
                }
            }
        }
        None
    }

    /// A rank that has been idle past the threshold, with nothing queued
    /// and no refresh pending, may enter self-refresh.
    fn find_sref_entry(&self) -> Option<Command> {
        for rank in 0..self.ranks {
            if self.channel_state.is_rank_self_refreshing(rank) {
                continue;
            }
            if self.channel_state.rank_idle_cycles[rank] < self.sref_threshold {
                continue;
            }
            if !self.cmd_queue.rank_queues_empty(rank) {
                continue;
            }
            if self.channel_state.has_pending_refresh_for_rank(rank) {
                continue;
            }
            let sref = Command::new(
                CommandType::SrefEnter,
                Address::rank_of(self.channel, rank),
            );
            if let Some(ready) = self.channel_state.get_ready_command(&sref, self.clk) {
                if ready.cmd_type == CommandType::SrefEnter {
                    return Some(ready);
                }
            }
        }
        None
    }
}
