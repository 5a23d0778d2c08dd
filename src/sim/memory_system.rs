// src/sim/memory_system.rs

use crate::common::addr::AddressMap;
use crate::config::Config;
use crate::dram::Controller;

/// The host-facing front door: decodes linear addresses and routes
/// transactions to the owning channel's controller. Channels share no
/// state and tick independently.
pub struct MemorySystem {
    addr_map: AddressMap,
    controllers: Vec<Controller>,
    clk: u64,
}

impl MemorySystem {
    pub fn new(config: &Config) -> Self {
        if let Err(e) = config.validate() {
            panic!("[Config] invalid configuration: {}", e);
        }
        let addr_map = config
            .address_map()
            .unwrap_or_else(|e| panic!("[Config] {}", e));
        let controllers = (0..config.dram.channels)
            .map(|ch| Controller::new(ch, config))
            .collect();
        Self {
            addr_map,
            controllers,
            clk: 0,
        }
    }

    pub fn will_accept_transaction(&self, hex_addr: u64) -> bool {
        let addr = self.addr_map.map(hex_addr);
        self.controllers[addr.channel].will_accept_transaction()
    }

    /// Routes one transaction to its channel. Returns false on
    /// backpressure; the caller retries on a later cycle.
    pub fn add_transaction(&mut self, hex_addr: u64, is_write: bool) -> bool {
        let addr = self.addr_map.map(hex_addr);
        self.controllers[addr.channel].add_transaction(addr, is_write)
    }

    pub fn tick(&mut self) {
        for controller in &mut self.controllers {
            controller.tick();
        }
        self.clk += 1;
    }

    pub fn clk(&self) -> u64 {
        self.clk
    }

    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    pub fn print_stats(&self) {
        for (channel, controller) in self.controllers.iter().enumerate() {
            controller.stats.print(channel);
        }
    }
}
