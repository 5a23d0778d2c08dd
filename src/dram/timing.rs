//! Protocol Timing Table.
//!
//! Built once from the configuration and frozen. For every command type
//! the table lists the `(affected command, delay)` pairs it imposes on
//! each of five scopes: the addressed bank, the other banks of the same
//! bankgroup, the other bankgroups of the same rank, the other ranks on
//! the channel, and (for rank-wide commands) every bank of the rank.
//! Where two constraints hit the same slot the larger delay governs,
//! because the per-bank tables take the max on update.

use crate::common::cmd::{CommandType, NUM_COMMAND_TYPES};
use crate::config::Config;

type ConstraintList = Vec<(CommandType, u64)>;

pub struct TimingTable {
    same_bank: Vec<ConstraintList>,
    other_banks_same_bankgroup: Vec<ConstraintList>,
    other_bankgroups_same_rank: Vec<ConstraintList>,
    other_ranks: Vec<ConstraintList>,
    same_rank: Vec<ConstraintList>,
}

impl TimingTable {
    pub fn new(config: &Config) -> Self {
        let t = &config.timing;
        let rl = config.rl();
        let wl = config.wl();
        let bc = config.burst_cycle();

        // Column-to-column gaps. tCCD applies long within a bankgroup,
        // short across bankgroups; cross-rank adds the bus turnaround.
        let read_to_read_l = bc.max(t.t_ccd_l);
        let read_to_read_s = bc.max(t.t_ccd_s);
        let read_to_read_o = bc + t.t_rtrs;
        let read_to_write = (rl + bc + t.t_rpre).saturating_sub(wl);
        let read_to_write_o = (rl + bc + t.t_rtrs).saturating_sub(wl);
        let write_to_write_l = bc.max(t.t_ccd_l);
        let write_to_write_s = bc.max(t.t_ccd_s);
        let write_to_write_o = bc + t.t_rtrs;
        let write_to_read_l = wl + bc + t.t_wtr_l;
        let write_to_read_s = wl + bc + t.t_wtr_s;
        let write_to_read_o = (wl + bc + t.t_rtrs).saturating_sub(rl);

        // Column-to-row gaps on the addressed bank.
        let read_to_precharge = t.al + t.t_rtp;
        let readp_to_activate = t.al + t.t_rtp + t.t_rp;
        let write_to_precharge = wl + bc + t.t_wr;
        let writep_to_activate = wl + bc + t.t_wr + t.t_rp;

        // Row commands.
        let (activate_to_read, activate_to_write) = if config.is_gddr() || config.is_hbm() {
            (t.t_rcdrd, t.t_rcdwr)
        } else {
            (t.t_rcd.saturating_sub(t.al), t.t_rcd.saturating_sub(t.al))
        };
        let activate_to_precharge = t.t_ras;
        let activate_to_activate = t.t_rc;
        let precharge_to_activate = t.t_rp;
        let sref_enter_to_exit = t.t_cke.max(t.t_ckesr);

        let mut same_bank = vec![ConstraintList::new(); NUM_COMMAND_TYPES];
        let mut other_banks_same_bankgroup = vec![ConstraintList::new(); NUM_COMMAND_TYPES];
        let mut other_bankgroups_same_rank = vec![ConstraintList::new(); NUM_COMMAND_TYPES];
        let mut other_ranks = vec![ConstraintList::new(); NUM_COMMAND_TYPES];
        let mut same_rank = vec![ConstraintList::new(); NUM_COMMAND_TYPES];

        use CommandType::*;

        // READ: column bus constraints everywhere, tRTP gate on its own
        // precharge.
        let read_columns_l: ConstraintList = vec![
            (Read, read_to_read_l),
            (ReadPrecharge, read_to_read_l),
            (Write, read_to_write),
            (WritePrecharge, read_to_write),
        ];
        let read_columns_s: ConstraintList = vec![
            (Read, read_to_read_s),
            (ReadPrecharge, read_to_read_s),
            (Write, read_to_write),
            (WritePrecharge, read_to_write),
        ];
        let read_other_ranks: ConstraintList = vec![
            (Read, read_to_read_o),
            (ReadPrecharge, read_to_read_o),
            (Write, read_to_write_o),
            (WritePrecharge, read_to_write_o),
        ];
        let mut read_same_bank = read_columns_l.clone();
        read_same_bank.push((Precharge, read_to_precharge));
        same_bank[Read.index()] = read_same_bank;
        other_banks_same_bankgroup[Read.index()] = read_columns_l.clone();
        other_bankgroups_same_rank[Read.index()] = read_columns_s.clone();
        other_ranks[Read.index()] = read_other_ranks.clone();

        // READ with auto-precharge: the implicit precharge gates the next
        // row operation on this bank; other scopes behave like READ.
        same_bank[ReadPrecharge.index()] = vec![
            (Activate, readp_to_activate),
            (Refresh, readp_to_activate),
            (RefreshBank, readp_to_activate),
            (SrefEnter, readp_to_activate),
        ];
        other_banks_same_bankgroup[ReadPrecharge.index()] = read_columns_l;
        other_bankgroups_same_rank[ReadPrecharge.index()] = read_columns_s;
        other_ranks[ReadPrecharge.index()] = read_other_ranks;

        // WRITE: write recovery gates the precharge, tWTR gates the
        // following reads.
        let write_columns_l: ConstraintList = vec![
            (Read, write_to_read_l),
            (ReadPrecharge, write_to_read_l),
            (Write, write_to_write_l),
            (WritePrecharge, write_to_write_l),
        ];
        let write_columns_s: ConstraintList = vec![
            (Read, write_to_read_s),
            (ReadPrecharge, write_to_read_s),
            (Write, write_to_write_s),
            (WritePrecharge, write_to_write_s),
        ];
        let write_other_ranks: ConstraintList = vec![
            (Read, write_to_read_o),
            (ReadPrecharge, write_to_read_o),
            (Write, write_to_write_o),
            (WritePrecharge, write_to_write_o),
        ];
        let mut write_same_bank = write_columns_l.clone();
        write_same_bank.push((Precharge, write_to_precharge));
        same_bank[Write.index()] = write_same_bank;
        other_banks_same_bankgroup[Write.index()] = write_columns_l.clone();
        other_bankgroups_same_rank[Write.index()] = write_columns_s.clone();
        other_ranks[Write.index()] = write_other_ranks.clone();

        // WRITE with auto-precharge.
        same_bank[WritePrecharge.index()] = vec![
            (Activate, writep_to_activate),
            (Refresh, writep_to_activate),
            (RefreshBank, writep_to_activate),
            (SrefEnter, writep_to_activate),
        ];
        other_banks_same_bankgroup[WritePrecharge.index()] = write_columns_l;
        other_bankgroups_same_rank[WritePrecharge.index()] = write_columns_s;
        other_ranks[WritePrecharge.index()] = write_other_ranks;

        // ACTIVATE: tRCD to its own columns, tRAS to its own precharge,
        // tRC to its own next activate, tRRD to activates elsewhere in
        // the rank.
        same_bank[Activate.index()] = vec![
            (Read, activate_to_read),
            (ReadPrecharge, activate_to_read),
            (Write, activate_to_write),
            (WritePrecharge, activate_to_write),
            (Precharge, activate_to_precharge),
            (Activate, activate_to_activate),
        ];
        other_banks_same_bankgroup[Activate.index()] = vec![
            (Activate, t.t_rrd_l),
            (RefreshBank, t.t_rrd_l),
        ];
        other_bankgroups_same_rank[Activate.index()] = vec![
            (Activate, t.t_rrd_s),
            (RefreshBank, t.t_rrd_s),
        ];

        // PRECHARGE: tRP before the bank can open or refresh again.
        let mut precharge_same_bank: ConstraintList = vec![
            (Activate, precharge_to_activate),
            (Refresh, precharge_to_activate),
            (RefreshBank, precharge_to_activate),
            (SrefEnter, precharge_to_activate),
        ];
        if t.t_ppd > 0 {
            // LPDDR4 and GDDR devices space out precharges rank-wide.
            precharge_same_bank.push((Precharge, t.t_ppd));
            other_banks_same_bankgroup[Precharge.index()].push((Precharge, t.t_ppd));
            other_bankgroups_same_rank[Precharge.index()].push((Precharge, t.t_ppd));
        }
        same_bank[Precharge.index()] = precharge_same_bank;

        // REFRESH_BANK: tRFCb occupies the bank, tRRD spaces it against
        // activates in the rest of the rank.
        same_bank[RefreshBank.index()] = vec![
            (Activate, t.t_rfcb),
            (Refresh, t.t_rfcb),
            (RefreshBank, t.t_rfcb),
            (SrefEnter, t.t_rfcb),
        ];
        other_banks_same_bankgroup[RefreshBank.index()] = vec![
            (Activate, t.t_rrd_l),
            (RefreshBank, t.t_rrd_l),
        ];
        other_bankgroups_same_rank[RefreshBank.index()] = vec![
            (Activate, t.t_rrd_s),
            (RefreshBank, t.t_rrd_s),
        ];

        // Rank-wide commands.
        same_rank[Refresh.index()] = vec![
            (Activate, t.t_rfc),
            (Refresh, t.t_rfc),
            (RefreshBank, t.t_rfc),
            (SrefEnter, t.t_rfc),
        ];
        same_rank[SrefEnter.index()] = vec![(SrefExit, sref_enter_to_exit)];
        same_rank[SrefExit.index()] = vec![
            (Activate, t.t_xs),
            (Refresh, t.t_xs),
            (RefreshBank, t.t_xs),
            (SrefEnter, t.t_xs),
        ];

        Self {
            same_bank,
            other_banks_same_bankgroup,
            other_bankgroups_same_rank,
            other_ranks,
            same_rank,
        }
    }

    pub fn same_bank(&self, cmd_type: CommandType) -> &[(CommandType, u64)] {
        &self.same_bank[cmd_type.index()]
    }

    pub fn other_banks_same_bankgroup(&self, cmd_type: CommandType) -> &[(CommandType, u64)] {
        &self.other_banks_same_bankgroup[cmd_type.index()]
    }

    pub fn other_bankgroups_same_rank(&self, cmd_type: CommandType) -> &[(CommandType, u64)] {
        &self.other_bankgroups_same_rank[cmd_type.index()]
    }

    pub fn other_ranks(&self, cmd_type: CommandType) -> &[(CommandType, u64)] {
        &self.other_ranks[cmd_type.index()]
    }

    pub fn same_rank(&self, cmd_type: CommandType) -> &[(CommandType, u64)] {
        &self.same_rank[cmd_type.index()]
    }
}
