//! Refresh Request Generation.
//!
//! Runs a per-channel cycle counter and enqueues refresh requests into
//! the channel state on the configured cadence. Rank-level policies post
//! REFRESH commands; the bank-level policy posts REFRESH_BANK commands,
//! rotating bankgroup-major so consecutive refreshes never land in the
//! same group. Self-refreshing ranks are skipped; they refresh themselves.

use crate::config::{Config, RefreshPolicy};

use super::channel_state::ChannelState;

pub struct Refresh {
    clk: u64,
    interval: u64,
    policy: RefreshPolicy,
    ranks: usize,
    bankgroups: usize,
    banks_per_group: usize,
    next_rank: usize,
    next_bankgroup: usize,
    next_bank: usize,
}

impl Refresh {
    pub fn new(config: &Config) -> Self {
        let ranks = config.dram.ranks;
        let policy = config.system.refresh_policy;
        // Staggered policies spread the per-rank (or per-bank) period
        // across all targets so each still sees its full tREFI / tREFIb.
        let interval = match policy {
            RefreshPolicy::RankLevelSimultaneous => config.timing.t_refi,
            RefreshPolicy::RankLevelStaggered => (config.timing.t_refi / ranks as u64).max(1),
            RefreshPolicy::BankLevelStaggered => {
                (config.timing.t_refib / (ranks * config.banks()) as u64).max(1)
            }
        };
        Self {
            clk: 0,
            interval,
            policy,
            ranks,
            bankgroups: config.dram.bankgroups,
            banks_per_group: config.dram.banks_per_group,
            next_rank: 0,
            next_bankgroup: 0,
            next_bank: 0,
        }
    }

    pub fn tick(&mut self, channel_state: &mut ChannelState) {
        self.clk += 1;
        if self.clk % self.interval == 0 {
            self.insert_refresh(channel_state);
        }
    }

    fn insert_refresh(&mut self, channel_state: &mut ChannelState) {
        match self.policy {
            RefreshPolicy::RankLevelSimultaneous => {
                for rank in 0..self.ranks {
                    if !channel_state.is_rank_self_refreshing(rank) {
                        channel_state.rank_need_refresh(rank, true);
                    }
                }
            }
            RefreshPolicy::RankLevelStaggered => {
                if !channel_state.is_rank_self_refreshing(self.next_rank) {
                    channel_state.rank_need_refresh(self.next_rank, true);
                }
                self.next_rank = (self.next_rank + 1) % self.ranks;
            }
            RefreshPolicy::BankLevelStaggered => {
                if !channel_state.is_rank_self_refreshing(self.next_rank) {
                    channel_state.bank_need_refresh(
                        self.next_rank,
                        self.next_bankgroup,
                        self.next_bank,
                        true,
                    );
                }
                self.iterate_next();
            }
        }
    }

    fn iterate_next(&mut self) {
        self.next_bankgroup = (self.next_bankgroup + 1) % self.bankgroups;
        if self.next_bankgroup == 0 {
            self.next_bank = (self.next_bank + 1) % self.banks_per_group;
            if self.next_bank == 0 {
                self.next_rank = (self.next_rank + 1) % self.ranks;
            }
        }
    }
}
