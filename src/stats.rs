//! Simulation statistics collection and reporting.
//!
//! One counter block per channel. The controller reports every issued
//! command and completed transaction here; nothing in the scheduler core
//! reads these values back.

use std::time::Instant;

use crate::common::cmd::{Command, CommandType};

/// Per-channel statistics counters.
pub struct Stats {
    start_time: Instant,
    pub cycles: u64,

    pub num_reads: u64,
    pub num_writes: u64,
    pub num_activates: u64,
    pub num_precharges: u64,
    pub num_ondemand_precharges: u64,
    pub num_aggressive_precharges: u64,
    pub num_refreshes: u64,
    pub num_bank_refreshes: u64,
    pub num_sref_enters: u64,
    pub num_sref_exits: u64,

    pub num_row_hits: u64,
    pub num_row_misses: u64,

    pub reads_done: u64,
    pub writes_done: u64,
    pub read_latency_sum: u64,

    pub dual_commands: u64,
    pub rank_idle_cycles: u64,
    pub trans_rejected: u64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            num_reads: 0,
            num_writes: 0,
            num_activates: 0,
            num_precharges: 0,
            num_ondemand_precharges: 0,
            num_aggressive_precharges: 0,
            num_refreshes: 0,
            num_bank_refreshes: 0,
            num_sref_enters: 0,
            num_sref_exits: 0,
            num_row_hits: 0,
            num_row_misses: 0,
            reads_done: 0,
            writes_done: 0,
            read_latency_sum: 0,
            dual_commands: 0,
            rank_idle_cycles: 0,
            trans_rejected: 0,
        }
    }
}

impl Stats {
    /// Counts one issued command.
    pub fn record_command(&mut self, cmd: &Command) {
        match cmd.cmd_type {
            CommandType::Read | CommandType::ReadPrecharge => self.num_reads += 1,
            CommandType::Write | CommandType::WritePrecharge => self.num_writes += 1,
            CommandType::Activate => self.num_activates += 1,
            CommandType::Precharge => self.num_precharges += 1,
            CommandType::Refresh => self.num_refreshes += 1,
            CommandType::RefreshBank => self.num_bank_refreshes += 1,
            CommandType::SrefEnter => self.num_sref_enters += 1,
            CommandType::SrefExit => self.num_sref_exits += 1,
        }
    }

    /// Prints a formatted summary of the channel's counters.
    pub fn print(&self, channel: usize) {
        let seconds = self.start_time.elapsed().as_secs_f64();
        let cyc = if self.cycles == 0 { 1 } else { self.cycles };
        let columns = self.num_reads + self.num_writes;
        let hit_rate = if columns > 0 {
            (self.num_row_hits as f64 / columns as f64) * 100.0
        } else {
            0.0
        };
        let avg_read_latency = if self.reads_done > 0 {
            self.read_latency_sum as f64 / self.reads_done as f64
        } else {
            0.0
        };

        println!("\n==========================================================");
        println!("DRAM CHANNEL {} STATISTICS", channel);
        println!("==========================================================");
        println!("host_seconds             {:.4} s", seconds);
        println!("sim_cycles               {}", self.cycles);
        println!("----------------------------------------------------------");
        println!("COMMAND MIX");
        println!("  cmd.read               {}", self.num_reads);
        println!("  cmd.write              {}", self.num_writes);
        println!("  cmd.activate           {}", self.num_activates);
        println!("  cmd.precharge          {}", self.num_precharges);
        println!("    on_demand            {}", self.num_ondemand_precharges);
        println!("    aggressive           {}", self.num_aggressive_precharges);
        println!("  cmd.refresh            {}", self.num_refreshes);
        println!("  cmd.refresh_bank       {}", self.num_bank_refreshes);
        println!("  cmd.sref_enter         {}", self.num_sref_enters);
        println!("  cmd.sref_exit          {}", self.num_sref_exits);
        println!("  dual_issue             {}", self.dual_commands);
        println!("----------------------------------------------------------");
        println!("ROW BUFFER");
        println!("  row_hits               {} ({:.2}%)", self.num_row_hits, hit_rate);
        println!("  row_misses             {}", self.num_row_misses);
        println!("----------------------------------------------------------");
        println!("TRANSACTIONS");
        println!("  reads_done             {}", self.reads_done);
        println!("  writes_done            {}", self.writes_done);
        println!("  avg_read_latency       {:.2} cycles", avg_read_latency);
        println!("  rejected               {}", self.trans_rejected);
        println!(
            "  rank_idle              {} rank-cycles ({:.2}% of one rank)",
            self.rank_idle_cycles,
            (self.rank_idle_cycles as f64 / cyc as f64) * 100.0
        );
        println!("==========================================================");
    }
}
