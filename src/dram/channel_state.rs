//! Channel State.
//!
//! Owns the rank x bankgroup x bank matrix of bank state machines for one
//! channel, together with everything that couples them: the frozen timing
//! table, the per-rank activation windows (tFAW, and t32AW on GDDR), the
//! self-refresh flags, and the refresh request queue.
//!
//! The two entry points mirror the two halves of scheduling. A candidate
//! command is projected through `get_ready_command`, which answers with
//! the candidate itself, a required precursor, or nothing. An issued
//! command is applied through `update_timing_and_states`, which advances
//! the addressed bank's state machine and pushes the command's timing
//! constraints out to every bank in scope.

use std::collections::VecDeque;

use crate::common::addr::Address;
use crate::common::cmd::{Command, CommandType};
use crate::config::Config;

use super::bank_state::BankState;
use super::timing::TimingTable;

/// At most four ACTIVATE / REFRESH_BANK per rank in a rolling tFAW.
const FAW_CAP: usize = 4;
/// GDDR additionally caps activations in a rolling t32AW.
const AW32_CAP: usize = 32;

pub struct ChannelState {
    channel: usize,
    ranks: usize,
    bankgroups: usize,
    banks_per_group: usize,
    t_faw: u64,
    t_32aw: u64,
    use_32aw: bool,

    timing: TimingTable,
    bank_states: Vec<Vec<Vec<BankState>>>,
    rank_is_sref: Vec<bool>,
    /// Pending REFRESH / REFRESH_BANK commands, oldest first.
    refresh_q: VecDeque<Command>,
    /// Expiry cycles of recent activations, per rank.
    four_aw: Vec<VecDeque<u64>>,
    thirty_two_aw: Vec<VecDeque<u64>>,

    /// Consecutive cycles each rank has had no open row. Maintained by
    /// the controller tick; consumed by the self-refresh entry policy.
    pub rank_idle_cycles: Vec<u64>,
}

impl ChannelState {
    pub fn new(channel: usize, config: &Config) -> Self {
        let ranks = config.dram.ranks;
        let bankgroups = config.dram.bankgroups;
        let banks_per_group = config.dram.banks_per_group;
        let bank_states = (0..ranks)
            .map(|_| {
                (0..bankgroups)
                    .map(|_| (0..banks_per_group).map(|_| BankState::new()).collect())
                    .collect()
            })
            .collect();
        Self {
            channel,
            ranks,
            bankgroups,
            banks_per_group,
            t_faw: config.timing.t_faw,
            t_32aw: config.timing.t_32aw,
            use_32aw: config.is_gddr(),
            timing: TimingTable::new(config),
            bank_states,
            rank_is_sref: vec![false; ranks],
            refresh_q: VecDeque::new(),
            four_aw: vec![VecDeque::new(); ranks],
            thirty_two_aw: vec![VecDeque::new(); ranks],
            rank_idle_cycles: vec![0; ranks],
        }
    }

    /// Projects a candidate command through the bank state machines.
    ///
    /// For a rank-wide candidate every bank of the rank must agree: the
    /// first bank that needs a precursor decides the answer, and the
    /// candidate itself is returned only once all banks admit it. For a
    /// bank candidate the pending-refresh latch is honored first, then
    /// the bank's own answer, then the activation window.
    pub fn get_ready_command(&self, cmd: &Command, clk: u64) -> Option<Command> {
        if cmd.is_rank_wide() {
            let rank = cmd.addr.rank;
            let mut num_ready = 0;
            for bg in 0..self.bankgroups {
                for b in 0..self.banks_per_group {
                    // A timing-blocked bank does not end the scan: a later
                    // bank may still be able to close its row meanwhile.
                    let Some(ready) = self.bank_states[rank][bg][b].get_ready_command(cmd, clk)
                    else {
                        continue;
                    };
                    if ready.cmd_type != cmd.cmd_type {
                        // A bank still holds a row open; close it first.
                        let mut precursor = ready;
                        precursor.addr = Address::bank_of(self.channel, rank, bg, b);
                        return Some(precursor);
                    }
                    num_ready += 1;
                }
            }
            if num_ready == self.bankgroups * self.banks_per_group {
                Some(*cmd)
            } else {
                None
            }
        } else {
            let bank = self.bank(cmd.addr);
            if bank.need_refresh() && !cmd.is_refresh() {
                // Refresh interlock: close the row so the refresh can
                // proceed, or surface the refresh itself.
                if bank.is_row_open() {
                    let pre = Command::new(CommandType::Precharge, cmd.addr);
                    return bank.get_ready_command(&pre, clk);
                }
                let pending = self.pending_ref_for_bank(cmd.addr)?;
                return self.get_ready_command(&pending, clk);
            }
            let ready = bank.get_ready_command(cmd, clk)?;
            if matches!(
                ready.cmd_type,
                CommandType::Activate | CommandType::RefreshBank
            ) && !self.activation_window_ok(cmd.addr.rank, clk)
            {
                return None;
            }
            Some(ready)
        }
    }

    /// Applies an issued command: state machine first, then timing.
    pub fn update_timing_and_states(&mut self, cmd: &Command, clk: u64) {
        self.update_state(cmd);
        self.update_timing(cmd, clk);
    }

    fn update_state(&mut self, cmd: &Command) {
        if cmd.is_rank_wide() {
            let rank = cmd.addr.rank;
            for bg in 0..self.bankgroups {
                for b in 0..self.banks_per_group {
                    self.bank_states[rank][bg][b].update_state(cmd);
                }
            }
            match cmd.cmd_type {
                CommandType::SrefEnter => self.rank_is_sref[rank] = true,
                CommandType::SrefExit => self.rank_is_sref[rank] = false,
                _ => {}
            }
        } else {
            self.bank_mut(cmd.addr).update_state(cmd);
        }

        match cmd.cmd_type {
            CommandType::Refresh => self.rank_need_refresh(cmd.addr.rank, false),
            CommandType::RefreshBank => {
                self.bank_need_refresh(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank, false)
            }
            _ => {}
        }
    }

    fn update_timing(&mut self, cmd: &Command, clk: u64) {
        let addr = cmd.addr;
        if matches!(
            cmd.cmd_type,
            CommandType::Activate | CommandType::RefreshBank
        ) {
            self.update_activation_times(addr.rank, clk);
        }

        if cmd.is_rank_wide() {
            for bg in 0..self.bankgroups {
                for b in 0..self.banks_per_group {
                    for &(t, delay) in self.timing.same_rank(cmd.cmd_type) {
                        self.bank_states[addr.rank][bg][b].update_timing(t, clk + delay);
                    }
                }
            }
            return;
        }

        // Addressed bank.
        for &(t, delay) in self.timing.same_bank(cmd.cmd_type) {
            self.bank_states[addr.rank][addr.bankgroup][addr.bank].update_timing(t, clk + delay);
        }
        // Sibling banks in the same bankgroup.
        for b in 0..self.banks_per_group {
            if b == addr.bank {
                continue;
            }
            for &(t, delay) in self.timing.other_banks_same_bankgroup(cmd.cmd_type) {
                self.bank_states[addr.rank][addr.bankgroup][b].update_timing(t, clk + delay);
            }
        }
        // Other bankgroups of the same rank.
        for bg in 0..self.bankgroups {
            if bg == addr.bankgroup {
                continue;
            }
            for b in 0..self.banks_per_group {
                for &(t, delay) in self.timing.other_bankgroups_same_rank(cmd.cmd_type) {
                    self.bank_states[addr.rank][bg][b].update_timing(t, clk + delay);
                }
            }
        }
        // Other ranks on the channel.
        for r in 0..self.ranks {
            if r == addr.rank {
                continue;
            }
            for bg in 0..self.bankgroups {
                for b in 0..self.banks_per_group {
                    for &(t, delay) in self.timing.other_ranks(cmd.cmd_type) {
                        self.bank_states[r][bg][b].update_timing(t, clk + delay);
                    }
                }
            }
        }
    }

    /// False while the rank has used up its activation budget.
    pub fn activation_window_ok(&self, rank: usize, clk: u64) -> bool {
        if !window_ok(&self.four_aw[rank], clk, FAW_CAP) {
            return false;
        }
        if self.use_32aw && !window_ok(&self.thirty_two_aw[rank], clk, AW32_CAP) {
            return false;
        }
        true
    }

    fn update_activation_times(&mut self, rank: usize, clk: u64) {
        push_window(&mut self.four_aw[rank], clk, self.t_faw);
        if self.use_32aw {
            push_window(&mut self.thirty_two_aw[rank], clk, self.t_32aw);
        }
    }

    pub fn bankgroups(&self) -> usize {
        self.bankgroups
    }

    pub fn banks_per_group(&self) -> usize {
        self.banks_per_group
    }

    pub fn is_row_open(&self, rank: usize, bankgroup: usize, bank: usize) -> bool {
        self.bank_states[rank][bankgroup][bank].is_row_open()
    }

    pub fn open_row(&self, rank: usize, bankgroup: usize, bank: usize) -> Option<u64> {
        self.bank_states[rank][bankgroup][bank].open_row()
    }

    pub fn row_hit_count(&self, rank: usize, bankgroup: usize, bank: usize) -> u32 {
        self.bank_states[rank][bankgroup][bank].row_hit_count()
    }

    /// A rank is idle once no bank in it holds a row open.
    pub fn is_all_bank_idle_in_rank(&self, rank: usize) -> bool {
        self.bank_states[rank]
            .iter()
            .flatten()
            .all(|b| !b.is_row_open())
    }

    pub fn is_rank_self_refreshing(&self, rank: usize) -> bool {
        self.rank_is_sref[rank]
    }

    pub fn is_refresh_waiting(&self) -> bool {
        !self.refresh_q.is_empty()
    }

    /// The oldest pending refresh request. Calling this with an empty
    /// queue is an invariant violation.
    pub fn pending_ref_command(&self) -> &Command {
        self.refresh_q
            .front()
            .expect("refresh queue consulted while empty")
    }

    /// True when a pending refresh covers the command's bank, meaning
    /// new column traffic for it should be held back.
    pub fn is_rw_pending_on_ref(&self, cmd: &Command) -> bool {
        self.refresh_covers(cmd.addr).is_some()
    }

    pub fn has_pending_refresh_for_rank(&self, rank: usize) -> bool {
        self.refresh_q.iter().any(|c| c.addr.rank == rank)
    }

    /// Adds or retires a rank-level refresh request.
    pub fn rank_need_refresh(&mut self, rank: usize, need: bool) {
        if need {
            let cmd = Command::new(CommandType::Refresh, Address::rank_of(self.channel, rank));
            self.refresh_q.push_back(cmd);
            self.apply_refresh_latches();
        } else {
            let pos = self
                .refresh_q
                .iter()
                .position(|c| c.cmd_type == CommandType::Refresh && c.addr.rank == rank)
                .expect("retiring a rank refresh that was never requested");
            let _ = self.refresh_q.remove(pos);
            self.rebuild_refresh_latches();
        }
    }

    /// Adds or retires a bank-level refresh request.
    pub fn bank_need_refresh(&mut self, rank: usize, bankgroup: usize, bank: usize, need: bool) {
        if need {
            let cmd = Command::new(
                CommandType::RefreshBank,
                Address::bank_of(self.channel, rank, bankgroup, bank),
            );
            self.refresh_q.push_back(cmd);
            self.apply_refresh_latches();
        } else {
            let pos = self
                .refresh_q
                .iter()
                .position(|c| {
                    c.cmd_type == CommandType::RefreshBank
                        && c.addr.rank == rank
                        && c.addr.bankgroup == bankgroup
                        && c.addr.bank == bank
                })
                .expect("retiring a bank refresh that was never requested");
            let _ = self.refresh_q.remove(pos);
            self.rebuild_refresh_latches();
        }
    }

    fn pending_ref_for_bank(&self, addr: Address) -> Option<Command> {
        self.refresh_covers(addr).copied()
    }

    fn refresh_covers(&self, addr: Address) -> Option<&Command> {
        self.refresh_q.iter().find(|c| match c.cmd_type {
            CommandType::Refresh => c.addr.rank == addr.rank,
            CommandType::RefreshBank => {
                c.addr.rank == addr.rank
                    && c.addr.bankgroup == addr.bankgroup
                    && c.addr.bank == addr.bank
            }
            _ => false,
        })
    }

    fn apply_refresh_latches(&mut self) {
        for i in 0..self.refresh_q.len() {
            let cmd = self.refresh_q[i];
            match cmd.cmd_type {
                CommandType::Refresh => {
                    for bg in 0..self.bankgroups {
                        for b in 0..self.banks_per_group {
                            self.bank_states[cmd.addr.rank][bg][b].set_need_refresh(true);
                        }
                    }
                }
                CommandType::RefreshBank => {
                    self.bank_mut(cmd.addr).set_need_refresh(true);
                }
                _ => unreachable!("non-refresh command in the refresh queue"),
            }
        }
    }

    fn rebuild_refresh_latches(&mut self) {
        for rank in self.bank_states.iter_mut() {
            for bg in rank.iter_mut() {
                for bank in bg.iter_mut() {
                    bank.set_need_refresh(false);
                }
            }
        }
        self.apply_refresh_latches();
    }

    fn bank(&self, addr: Address) -> &BankState {
        &self.bank_states[addr.rank][addr.bankgroup][addr.bank]
    }

    fn bank_mut(&mut self, addr: Address) -> &mut BankState {
        &mut self.bank_states[addr.rank][addr.bankgroup][addr.bank]
    }
}

/// One activation enters the window; the oldest leaves once expired.
fn push_window(window: &mut VecDeque<u64>, clk: u64, lifetime: u64) {
    if let Some(&front) = window.front() {
        if clk >= front {
            window.pop_front();
        }
    }
    window.push_back(clk + lifetime);
}

/// The window refuses a new activation only when full of live entries.
fn window_ok(window: &VecDeque<u64>, clk: u64, cap: usize) -> bool {
    match window.front() {
        Some(&front) => window.len() < cap || clk >= front,
        None => true,
    }
}
