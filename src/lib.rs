//! Cycle-Accurate DRAM Subsystem Simulator.
//!
//! This crate models how a memory controller turns host transactions
//! into DRAM command sequences (ACTIVATE, READ, WRITE, PRECHARGE,
//! refresh, self-refresh) under a protocol's timing constraints, then
//! advances a cycle counter while honoring every per-bank, per-group,
//! per-rank, and per-channel timing contract.
//!
//! # Architecture
//!
//! * **Channel state**: per-bank state machines plus all pending timing
//!   constraints, coupled through a frozen protocol timing table.
//! * **Command queue**: per-bank or per-rank FIFOs of pending column
//!   commands and the round-robin arbiter that picks the next one.
//! * **Refresh**: periodic per-rank / per-bank request generation,
//!   interlocked with in-flight traffic.
//!
//! The engine carries addresses, not data payloads.
//!
//! # Modules
//!
//! * `common`: addresses, commands, and transactions.
//! * `config`: typed configuration loading and derived parameters.
//! * `dram`: the command scheduler core.
//! * `sim`: multi-channel front door and trace input.
//! * `stats`: per-channel counters and reporting.

/// Addresses, commands, transactions, and the address mapper.
pub mod common;

/// Configuration system for protocol, topology, timing, and policies.
///
/// Parses TOML configuration files into typed records and derives the
/// parameters the scheduler consumes (latencies, address field masks).
pub mod config;

/// The command scheduler core: bank state machines, timing propagation,
/// command queues, refresh, and the per-cycle controller tick.
pub mod dram;

/// Simulation harness: channel demultiplexing and trace-driven input.
pub mod sim;

/// Statistics collection and reporting.
pub mod stats;
