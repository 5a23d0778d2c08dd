use serde::Deserialize;

use crate::common::addr::AddressMap;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DramProtocol {
    Ddr3,
    Ddr4,
    Gddr5,
    Gddr5x,
    Gddr6,
    Lpddr,
    Lpddr3,
    Lpddr4,
    Hbm,
    Hbm2,
    Hmc,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshPolicy {
    RankLevelSimultaneous,
    RankLevelStaggered,
    BankLevelStaggered,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStructure {
    PerBank,
    PerRank,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowBufPolicy {
    OpenPage,
    ClosePage,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub dram: DramConfig,
    pub timing: TimingConfig,
    pub system: SystemConfig,
}

/// DRAM physical structure.
#[derive(Debug, Deserialize, Clone)]
pub struct DramConfig {
    #[serde(default = "d_protocol")]
    pub protocol: DramProtocol,

    #[serde(default = "d_channels")]
    pub channels: usize,

    #[serde(default = "d_ranks")]
    pub ranks: usize,

    #[serde(default = "d_bankgroups")]
    pub bankgroups: usize,

    #[serde(default = "d_banks_per_group")]
    pub banks_per_group: usize,

    #[serde(default = "d_rows")]
    pub rows: u64,

    #[serde(default = "d_columns")]
    pub columns: u64,

    #[serde(default = "d_device_width")]
    pub device_width: u64,

    #[serde(default = "d_bus_width")]
    pub bus_width: u64,

    #[serde(rename = "BL", default = "d_bl")]
    pub bl: u64,
}

/// DRAM timing parameters, in device clock cycles except `tCK` (ns).
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    #[serde(rename = "tCK", default = "d_tck")]
    pub tck: f64,

    #[serde(rename = "AL", default = "d_al")]
    pub al: u64,

    #[serde(rename = "CL", default = "d_cl")]
    pub cl: u64,

    #[serde(rename = "CWL", default = "d_cwl")]
    pub cwl: u64,

    #[serde(rename = "tCCD_L", default = "d_t_ccd_l")]
    pub t_ccd_l: u64,

    #[serde(rename = "tCCD_S", default = "d_t_ccd_s")]
    pub t_ccd_s: u64,

    #[serde(rename = "tRTRS", default = "d_t_rtrs")]
    pub t_rtrs: u64,

    #[serde(rename = "tRTP", default = "d_t_rtp")]
    pub t_rtp: u64,

    #[serde(rename = "tWTR_L", default = "d_t_wtr_l")]
    pub t_wtr_l: u64,

    #[serde(rename = "tWTR_S", default = "d_t_wtr_s")]
    pub t_wtr_s: u64,

    #[serde(rename = "tWR", default = "d_t_wr")]
    pub t_wr: u64,

    #[serde(rename = "tRP", default = "d_t_rp")]
    pub t_rp: u64,

    #[serde(rename = "tRRD_L", default = "d_t_rrd_l")]
    pub t_rrd_l: u64,

    #[serde(rename = "tRRD_S", default = "d_t_rrd_s")]
    pub t_rrd_s: u64,

    #[serde(rename = "tRAS", default = "d_t_ras")]
    pub t_ras: u64,

    #[serde(rename = "tRCD", default = "d_t_rcd")]
    pub t_rcd: u64,

    #[serde(rename = "tRFC", default = "d_t_rfc")]
    pub t_rfc: u64,

    #[serde(rename = "tRC", default = "d_t_rc")]
    pub t_rc: u64,

    #[serde(rename = "tCKE", default = "d_t_cke")]
    pub t_cke: u64,

    #[serde(rename = "tCKESR", default = "d_t_ckesr")]
    pub t_ckesr: u64,

    #[serde(rename = "tXS", default = "d_t_xs")]
    pub t_xs: u64,

    #[serde(rename = "tXP", default = "d_t_xp")]
    pub t_xp: u64,

    #[serde(rename = "tRFCb", default = "d_t_rfcb")]
    pub t_rfcb: u64,

    #[serde(rename = "tREFI", default = "d_t_refi")]
    pub t_refi: u64,

    #[serde(rename = "tREFIb", default = "d_t_refib")]
    pub t_refib: u64,

    #[serde(rename = "tFAW", default = "d_t_faw")]
    pub t_faw: u64,

    #[serde(rename = "tRPRE", default = "d_t_rpre")]
    pub t_rpre: u64,

    #[serde(rename = "tWPRE", default = "d_t_wpre")]
    pub t_wpre: u64,

    #[serde(rename = "tPPD", default = "d_t_ppd")]
    pub t_ppd: u64,

    #[serde(rename = "t32AW", default = "d_t_32aw")]
    pub t_32aw: u64,

    #[serde(rename = "tRCDRD", default = "d_t_rcdrd")]
    pub t_rcdrd: u64,

    #[serde(rename = "tRCDWR", default = "d_t_rcdwr")]
    pub t_rcdwr: u64,
}

/// Scheduler and system-level policies.
#[derive(Debug, Deserialize, Clone)]
pub struct SystemConfig {
    #[serde(default = "d_address_mapping")]
    pub address_mapping: String,

    #[serde(default = "d_queue_structure")]
    pub queue_structure: QueueStructure,

    #[serde(default = "d_refresh_policy")]
    pub refresh_policy: RefreshPolicy,

    #[serde(default = "d_row_buf_policy")]
    pub row_buf_policy: RowBufPolicy,

    #[serde(default = "d_cmd_queue_size")]
    pub cmd_queue_size: usize,

    #[serde(default = "d_trans_queue_size")]
    pub trans_queue_size: usize,

    #[serde(default)]
    pub enable_self_refresh: bool,

    #[serde(default = "d_sref_threshold")]
    pub sref_threshold: u64,

    #[serde(default)]
    pub aggressive_precharging_enabled: bool,

    #[serde(default = "d_enable_hbm_dual_cmd")]
    pub enable_hbm_dual_cmd: bool,
}

impl Config {
    pub fn is_gddr(&self) -> bool {
        matches!(
            self.dram.protocol,
            DramProtocol::Gddr5 | DramProtocol::Gddr5x | DramProtocol::Gddr6
        )
    }

    pub fn is_hbm(&self) -> bool {
        matches!(self.dram.protocol, DramProtocol::Hbm | DramProtocol::Hbm2)
    }

    /// Banks per rank.
    pub fn banks(&self) -> usize {
        self.dram.bankgroups * self.dram.banks_per_group
    }

    /// Read latency: additive latency plus CAS latency.
    pub fn rl(&self) -> u64 {
        self.timing.al + self.timing.cl
    }

    /// Write latency: additive latency plus CAS write latency.
    pub fn wl(&self) -> u64 {
        self.timing.al + self.timing.cwl
    }

    /// Clock cycles one burst occupies the data bus. The data rate per
    /// clock differs across the GDDR generations, so this is not BL/2
    /// universally.
    pub fn burst_cycle(&self) -> u64 {
        let cycles = match self.dram.protocol {
            DramProtocol::Gddr5 => self.dram.bl / 4,
            DramProtocol::Gddr5x | DramProtocol::Gddr6 => self.dram.bl / 8,
            _ => self.dram.bl / 2,
        };
        cycles.max(1)
    }

    /// Cycles from READ issue to the end of the data burst.
    pub fn read_delay(&self) -> u64 {
        self.rl() + self.burst_cycle()
    }

    /// Cycles from WRITE issue to the end of the data burst.
    pub fn write_delay(&self) -> u64 {
        self.wl() + self.burst_cycle()
    }

    /// Builds the address mapper from the mapping string and topology.
    pub fn address_map(&self) -> Result<AddressMap, String> {
        let widths = [
            log2_exact("channels", self.dram.channels as u64)?,
            log2_exact("ranks", self.dram.ranks as u64)?,
            log2_exact("bankgroups", self.dram.bankgroups as u64)?,
            log2_exact("banks_per_group", self.dram.banks_per_group as u64)?,
            log2_exact("rows", self.dram.rows)?,
            log2_exact("columns / BL", self.dram.columns / self.dram.bl)?,
        ];
        // One request transfers bus_width/8 bytes per beat for BL beats.
        let request_bytes = self.dram.bus_width / 8 * self.dram.bl;
        let shift_bits = log2_exact("bus_width / 8 * BL", request_bytes)?;
        AddressMap::new(&self.system.address_mapping, widths, shift_bits)
    }

    /// Checks the configuration for internal consistency. Unknown
    /// protocols and policies are already rejected at parse time.
    pub fn validate(&self) -> Result<(), String> {
        let d = &self.dram;
        if d.bus_width < d.device_width || d.bus_width % d.device_width != 0 {
            return Err(format!(
                "bus_width {} is not a multiple of device_width {}",
                d.bus_width, d.device_width
            ));
        }
        if d.columns < d.bl {
            return Err(format!("columns {} smaller than BL {}", d.columns, d.bl));
        }
        if self.system.cmd_queue_size == 0 || self.system.trans_queue_size == 0 {
            return Err("queue sizes must be nonzero".to_string());
        }
        if self.timing.t_refi == 0 || self.timing.t_refib == 0 {
            return Err("tREFI and tREFIb must be nonzero".to_string());
        }
        if self.is_gddr() && self.timing.t_32aw == 0 {
            return Err("t32AW must be nonzero for GDDR protocols".to_string());
        }
        self.address_map()?;
        Ok(())
    }
}

fn log2_exact(name: &str, value: u64) -> Result<u32, String> {
    if value == 0 || !value.is_power_of_two() {
        return Err(format!("{} ({}) must be a nonzero power of two", name, value));
    }
    Ok(value.trailing_zeros())
}

fn d_protocol() -> DramProtocol {
    DramProtocol::Ddr4
}

fn d_channels() -> usize {
    1
}

fn d_ranks() -> usize {
    2
}

fn d_bankgroups() -> usize {
    4
}

fn d_banks_per_group() -> usize {
    4
}

fn d_rows() -> u64 {
    65536
}

fn d_columns() -> u64 {
    1024
}

fn d_device_width() -> u64 {
    8
}

fn d_bus_width() -> u64 {
    64
}

fn d_bl() -> u64 {
    8
}

fn d_tck() -> f64 {
    0.94
}

fn d_al() -> u64 {
    0
}

fn d_cl() -> u64 {
    14
}

fn d_cwl() -> u64 {
    10
}

fn d_t_ccd_l() -> u64 {
    6
}

fn d_t_ccd_s() -> u64 {
    4
}

fn d_t_rtrs() -> u64 {
    2
}

fn d_t_rtp() -> u64 {
    8
}

fn d_t_wtr_l() -> u64 {
    8
}

fn d_t_wtr_s() -> u64 {
    4
}

fn d_t_wr() -> u64 {
    16
}

fn d_t_rp() -> u64 {
    14
}

fn d_t_rrd_l() -> u64 {
    6
}

fn d_t_rrd_s() -> u64 {
    4
}

fn d_t_ras() -> u64 {
    32
}

fn d_t_rcd() -> u64 {
    14
}

fn d_t_rfc() -> u64 {
    374
}

fn d_t_rc() -> u64 {
    46
}

fn d_t_cke() -> u64 {
    6
}

fn d_t_ckesr() -> u64 {
    7
}

fn d_t_xs() -> u64 {
    384
}

fn d_t_xp() -> u64 {
    8
}

fn d_t_rfcb() -> u64 {
    160
}

fn d_t_refi() -> u64 {
    8320
}

fn d_t_refib() -> u64 {
    520
}

fn d_t_faw() -> u64 {
    26
}

fn d_t_rpre() -> u64 {
    1
}

fn d_t_wpre() -> u64 {
    1
}

fn d_t_ppd() -> u64 {
    0
}

fn d_t_32aw() -> u64 {
    240
}

fn d_t_rcdrd() -> u64 {
    18
}

fn d_t_rcdwr() -> u64 {
    14
}

fn d_address_mapping() -> String {
    "rochrababgco".to_string()
}

fn d_queue_structure() -> QueueStructure {
    QueueStructure::PerBank
}

fn d_refresh_policy() -> RefreshPolicy {
    RefreshPolicy::RankLevelStaggered
}

fn d_row_buf_policy() -> RowBufPolicy {
    RowBufPolicy::OpenPage
}

fn d_cmd_queue_size() -> usize {
    8
}

fn d_trans_queue_size() -> usize {
    32
}

fn d_sref_threshold() -> u64 {
    1000
}

fn d_enable_hbm_dual_cmd() -> bool {
    true
}
