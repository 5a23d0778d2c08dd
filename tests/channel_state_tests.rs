//! Integration tests for channel state: timing propagation scopes,
//! activation windows, and the refresh interlock.

use dramsim::common::addr::Address;
use dramsim::common::cmd::{Command, CommandType};
use dramsim::config::Config;
use dramsim::dram::ChannelState;

/// Creates a default DDR4 test configuration.
fn test_config() -> Config {
    toml::from_str("[dram]\n[timing]\n[system]\n").unwrap()
}

fn column_addr(rank: usize, bankgroup: usize, bank: usize, row: u64, column: u64) -> Address {
    let mut addr = Address::bank_of(0, rank, bankgroup, bank);
    addr.row = row;
    addr.column = column;
    addr.hex = (row << 20) | ((rank as u64) << 12) | ((bankgroup as u64) << 8) | ((bank as u64) << 4) | column;
    addr
}

fn read_cmd(rank: usize, bankgroup: usize, bank: usize, row: u64) -> Command {
    Command::new(CommandType::Read, column_addr(rank, bankgroup, bank, row, 0))
}

/// Tests that a read on a closed bank resolves to an ACTIVATE precursor.
#[test]
fn test_closed_bank_read_needs_activate() {
    let config = test_config();
    let cs = ChannelState::new(0, &config);

    let ready = cs.get_ready_command(&read_cmd(0, 0, 0, 5), 0).unwrap();
    assert_eq!(ready.cmd_type, CommandType::Activate);
    assert_eq!(ready.addr.row, 5);
}

/// Tests that the READ becomes issuable exactly at tRCD after ACTIVATE.
#[test]
fn test_activate_to_read_gate() {
    let config = test_config();
    let mut cs = ChannelState::new(0, &config);
    let read = read_cmd(0, 0, 0, 0);

    let act = Command::new(CommandType::Activate, read.addr);
    cs.update_timing_and_states(&act, 0);

    assert!(cs.get_ready_command(&read, 13).is_none());
    let ready = cs.get_ready_command(&read, 14).unwrap();
    assert_eq!(ready.cmd_type, CommandType::Read);
}

/// Tests tCCD_L versus tCCD_S: a read gates reads in its own bankgroup
/// longer than reads in a different bankgroup.
#[test]
fn test_column_gap_scopes() {
    let config = test_config();
    let mut cs = ChannelState::new(0, &config);

    // Open two banks of bankgroup 0 and one of bankgroup 1.
    let acts = [
        (Command::new(CommandType::Activate, column_addr(0, 0, 0, 0, 0)), 0),
        (Command::new(CommandType::Activate, column_addr(0, 1, 0, 0, 0)), 0),
        (Command::new(CommandType::Activate, column_addr(0, 0, 1, 0, 0)), 6),
    ];
    for (act, clk) in acts {
        cs.update_timing_and_states(&act, clk);
    }
    let read0 = read_cmd(0, 0, 0, 0);
    let issued = cs.get_ready_command(&read0, 14).unwrap();
    cs.update_timing_and_states(&issued, 14);

    // Same bankgroup sibling bank: blocked until tCCD_L = 6 later.
    let same_bg = read_cmd(0, 0, 1, 0);
    assert!(cs.get_ready_command(&same_bg, 19).is_none());
    let ready = cs.get_ready_command(&same_bg, 20).unwrap();
    assert_eq!(ready.cmd_type, CommandType::Read);

    // Different bankgroup: its read is free at tCCD_S = 4.
    let other_bg = read_cmd(0, 1, 0, 0);
    assert!(cs.get_ready_command(&other_bg, 17).is_none());
    let ready = cs.get_ready_command(&other_bg, 18).unwrap();
    assert_eq!(ready.cmd_type, CommandType::Read);
}

/// Tests cross-rank read-to-read separation (burst plus tRTRS).
#[test]
fn test_cross_rank_bus_turnaround() {
    let config = test_config();
    let mut cs = ChannelState::new(0, &config);

    for rank in 0..2 {
        let act = Command::new(CommandType::Activate, column_addr(rank, 0, 0, 0, 0));
        cs.update_timing_and_states(&act, 0);
    }
    let read0 = read_cmd(0, 0, 0, 0);
    let issued = cs.get_ready_command(&read0, 14).unwrap();
    cs.update_timing_and_states(&issued, 14);

    // burst_cycle 4 + tRTRS 2 = 6 cycles to the other rank.
    let other_rank = read_cmd(1, 0, 0, 0);
    assert!(cs.get_ready_command(&other_rank, 19).is_none());
    assert!(cs.get_ready_command(&other_rank, 20).is_some());
}

/// Tests the four-activate window: the fifth ACTIVATE waits for the
/// oldest entry to age out of tFAW.
#[test]
fn test_four_activate_window() {
    let config = test_config();
    let mut cs = ChannelState::new(0, &config);

    // Four activates to distinct bankgroups, spaced by tRRD_S.
    for (i, clk) in [0u64, 4, 8, 12].iter().enumerate() {
        let act = Command::new(CommandType::Activate, column_addr(0, i, 0, 0, 0));
        assert!(cs.activation_window_ok(0, *clk));
        cs.update_timing_and_states(&act, *clk);
    }

    // Budget spent: the window refuses until the first entry expires at
    // 0 + tFAW = 26.
    assert!(!cs.activation_window_ok(0, 16));
    assert!(!cs.activation_window_ok(0, 25));
    assert!(cs.activation_window_ok(0, 26));

    // The gate is enforced on the ACTIVATE precursor itself.
    let blocked = read_cmd(0, 0, 1, 0);
    assert!(cs.get_ready_command(&blocked, 16).is_none());
    let ready = cs.get_ready_command(&blocked, 26).unwrap();
    assert_eq!(ready.cmd_type, CommandType::Activate);

    // The other rank's window is untouched.
    assert!(cs.activation_window_ok(1, 16));
}

/// Tests that REFRESH_BANK consumes activation-window budget.
#[test]
fn test_bank_refresh_counts_against_faw() {
    let config = test_config();
    let mut cs = ChannelState::new(0, &config);

    for (i, clk) in [0u64, 4, 8].iter().enumerate() {
        let act = Command::new(CommandType::Activate, column_addr(0, i, 0, 0, 0));
        cs.update_timing_and_states(&act, *clk);
    }
    cs.bank_need_refresh(0, 3, 0, true);
    let refb = Command::new(CommandType::RefreshBank, Address::bank_of(0, 0, 3, 0));
    cs.update_timing_and_states(&refb, 12);

    assert!(!cs.activation_window_ok(0, 16));
    assert!(cs.activation_window_ok(0, 26));
}

/// Tests the GDDR 32-activate window count boundary.
#[test]
fn test_thirty_two_activate_window() {
    let mut config: Config = toml::from_str(
        "[dram]\nprotocol = \"GDDR5\"\nranks = 1\n[timing]\nt32AW = 100000\n[system]\n",
    )
    .unwrap();
    config.timing.t_faw = 26;

    let mut cs = ChannelState::new(0, &config);
    let mut clk = 0u64;
    for i in 0..31 {
        let bg = (i % 16) / 4;
        let bank = (i % 16) % 4;
        if i >= 16 {
            // Re-activating a bank needs its row closed first.
            let pre = Command::new(CommandType::Precharge, Address::bank_of(0, 0, bg, bank));
            cs.update_timing_and_states(&pre, clk);
        }
        let act = Command::new(CommandType::Activate, column_addr(0, bg, bank, 1, 0));
        cs.update_timing_and_states(&act, clk);
        clk += 8;
    }
    // 31 in the window: still allowed.
    assert!(cs.activation_window_ok(0, clk));

    let pre = Command::new(CommandType::Precharge, Address::bank_of(0, 0, 3, 3));
    cs.update_timing_and_states(&pre, clk);
    let act = Command::new(CommandType::Activate, column_addr(0, 3, 3, 1, 0));
    cs.update_timing_and_states(&act, clk);
    // 32 live entries: the window is closed.
    assert!(!cs.activation_window_ok(0, clk + 8));
}

/// Tests ACTIVATE then PRECHARGE returning the bank to Closed.
#[test]
fn test_activate_precharge_round_trip() {
    let config = test_config();
    let mut cs = ChannelState::new(0, &config);
    let addr = column_addr(0, 0, 0, 9, 0);

    cs.update_timing_and_states(&Command::new(CommandType::Activate, addr), 0);
    assert!(cs.is_row_open(0, 0, 0));
    assert_eq!(cs.open_row(0, 0, 0), Some(9));

    cs.update_timing_and_states(&Command::new(CommandType::Precharge, addr), 32);
    assert!(!cs.is_row_open(0, 0, 0));
    assert_eq!(cs.open_row(0, 0, 0), None);
}

/// Tests SREF_ENTER / SREF_EXIT over a whole rank.
#[test]
fn test_self_refresh_round_trip() {
    let config = test_config();
    let mut cs = ChannelState::new(0, &config);
    let rank_addr = Address::rank_of(0, 1);

    let sref = Command::new(CommandType::SrefEnter, rank_addr);
    let ready = cs.get_ready_command(&sref, 0).unwrap();
    assert_eq!(ready.cmd_type, CommandType::SrefEnter);
    cs.update_timing_and_states(&ready, 0);
    assert!(cs.is_rank_self_refreshing(1));

    // A read for the sleeping rank resolves to SREF_EXIT, gated by the
    // minimum residency time.
    let read = read_cmd(1, 0, 0, 0);
    assert!(cs.get_ready_command(&read, 5).is_none());
    let exit = cs.get_ready_command(&read, 7).unwrap();
    assert_eq!(exit.cmd_type, CommandType::SrefExit);

    cs.update_timing_and_states(&Command::new(CommandType::SrefExit, rank_addr), 7);
    assert!(!cs.is_rank_self_refreshing(1));
    assert!(cs.is_all_bank_idle_in_rank(1));
}

/// Tests that a pending rank refresh forces a precharge precursor on an
/// open bank and blocks new column work until it drains.
#[test]
fn test_refresh_latch_yields_precharge() {
    let config = test_config();
    let mut cs = ChannelState::new(0, &config);
    let read = read_cmd(0, 0, 0, 0);

    cs.update_timing_and_states(&Command::new(CommandType::Activate, read.addr), 0);
    let ready = cs.get_ready_command(&read, 14).unwrap();
    assert_eq!(ready.cmd_type, CommandType::Read);

    cs.rank_need_refresh(0, true);
    assert!(cs.is_refresh_waiting());

    // The same read now resolves to PRECHARGE (once tRAS permits).
    assert!(cs.get_ready_command(&read, 14).is_none());
    let ready = cs.get_ready_command(&read, 32).unwrap();
    assert_eq!(ready.cmd_type, CommandType::Precharge);
    cs.update_timing_and_states(&ready, 32);

    // With the bank closed the read surfaces the refresh itself.
    let ready = cs.get_ready_command(&read, 46).unwrap();
    assert_eq!(ready.cmd_type, CommandType::Refresh);
    cs.update_timing_and_states(&ready, 46);

    // Refresh retired: every bank closed, queue drained, and the read
    // path restarts with an ACTIVATE once tRFC expires.
    assert!(!cs.is_refresh_waiting());
    assert!(cs.is_all_bank_idle_in_rank(0));
    assert!(cs.get_ready_command(&read, 100).is_none());
    let ready = cs.get_ready_command(&read, 46 + 374).unwrap();
    assert_eq!(ready.cmd_type, CommandType::Activate);
}

/// Tests that retiring a refresh that was never requested is rejected.
#[test]
#[should_panic]
fn test_refresh_queue_underflow_panics() {
    let config = test_config();
    let mut cs = ChannelState::new(0, &config);
    cs.rank_need_refresh(0, false);
}
