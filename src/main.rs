//! DRAM Simulator CLI.
//!
//! Loads a TOML configuration, then drives the memory system either from
//! a trace file or from a synthetic request stream for a fixed number of
//! cycles, and prints per-channel statistics on exit.

use clap::Parser;
use std::{fs, process};

extern crate dramsim;

use dramsim::config::Config;
use dramsim::sim::trace::{self, RandomStream};
use dramsim::sim::MemorySystem;

/// Command-line arguments for the DRAM simulator.
#[derive(Parser, Debug)]
#[command(author, version, about = "Cycle-accurate DRAM subsystem simulator")]
struct Args {
    #[arg(short, long, default_value = "configs/ddr4.toml")]
    config: String,

    /// Trace file of '<addr> <READ|WRITE> <cycle>' lines.
    #[arg(short, long)]
    trace: Option<String>,

    /// Number of cycles to simulate.
    #[arg(long, default_value_t = 100_000)]
    cycles: u64,

    /// Seed for the synthetic stream used when no trace is given.
    #[arg(long, default_value_t = 0x2b7e_1516)]
    seed: u64,

    /// Issue one synthetic request every N cycles.
    #[arg(long, default_value_t = 4)]
    request_interval: u64,
}

fn main() {
    let args = Args::parse();
    let config_content = fs::read_to_string(&args.config).expect("Failed to read config");
    let config: Config = toml::from_str(&config_content).expect("Failed to parse config");
    if let Err(e) = config.validate() {
        eprintln!("\n[!] FATAL: invalid configuration: {}", e);
        process::exit(1);
    }

    println!("Global Configuration");
    println!("--------------------");
    println!("Protocol:             {:?}", config.dram.protocol);
    println!(
        "Topology:             {} ch x {} ra x {} bg x {} ba",
        config.dram.channels,
        config.dram.ranks,
        config.dram.bankgroups,
        config.dram.banks_per_group
    );
    println!(
        "Rows x Columns:       {} x {}",
        config.dram.rows, config.dram.columns
    );
    println!("Address Mapping:      {}", config.system.address_mapping);
    println!("Queue Structure:      {:?}", config.system.queue_structure);
    println!("Refresh Policy:       {:?}", config.system.refresh_policy);
    println!("Row Buffer Policy:    {:?}", config.system.row_buf_policy);
    println!(
        "Queues:               cmd {} / trans {}",
        config.system.cmd_queue_size, config.system.trans_queue_size
    );
    println!("--------------------");

    let mut mem = MemorySystem::new(&config);

    if let Some(ref trace_path) = args.trace {
        println!("[Sim] Trace Mode: {}", trace_path);
        run_trace(&mut mem, trace_path, args.cycles);
    } else {
        println!(
            "[Sim] Synthetic Mode: one request per {} cycles",
            args.request_interval
        );
        run_synthetic(&mut mem, &config, args.cycles, args.seed, args.request_interval);
    }

    mem.print_stats();
}

/// Feeds trace requests at their arrival cycles, retrying on
/// backpressure, then runs until the cycle budget is spent.
fn run_trace(mem: &mut MemorySystem, path: &str, cycles: u64) {
    let entries = trace::load_trace(path);
    let mut next = 0;
    for clk in 0..cycles {
        while next < entries.len() && entries[next].cycle <= clk {
            let e = &entries[next];
            if !mem.add_transaction(e.hex_addr, e.is_write) {
                break;
            }
            next += 1;
        }
        mem.tick();
    }
    if next < entries.len() {
        println!(
            "[Sim] Cycle budget exhausted with {} trace requests unsent",
            entries.len() - next
        );
    }
}

fn run_synthetic(
    mem: &mut MemorySystem,
    config: &Config,
    cycles: u64,
    seed: u64,
    request_interval: u64,
) {
    // Enough address bits to cover the whole configured device space.
    let addr_bits = 32u32.min(
        (config.dram.rows * config.dram.columns).trailing_zeros()
            + (config.dram.channels * config.dram.ranks * config.banks()).trailing_zeros()
            + 6,
    );
    let mut stream = RandomStream::new(seed, addr_bits);
    let mut pending: Option<(u64, bool)> = None;

    for clk in 0..cycles {
        if pending.is_none() && request_interval > 0 && clk % request_interval == 0 {
            pending = Some(stream.next_request());
        }
        if let Some((addr, is_write)) = pending {
            if mem.add_transaction(addr, is_write) {
                pending = None;
            }
        }
        mem.tick();
    }
}
