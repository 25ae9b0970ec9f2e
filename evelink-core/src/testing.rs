//! Shared test fixtures

use evelink_drivers::sim::{SimDelay, SimDevice};
use evelink_protocol::RegisterMap;

use crate::config::Config;
use crate::eve::Eve;

pub(crate) type SimEve = Eve<SimDevice, SimDelay>;

/// Sentinel-framed map with a 16-byte ring that reports all 16 bytes free
/// when idle
pub(crate) fn map16() -> RegisterMap {
    let mut map = RegisterMap::BT82X;
    map.ring_capacity = 16;
    map.idle_space = 16;
    map
}

/// Session against a running simulated device
pub(crate) fn session(regs: RegisterMap) -> SimEve {
    session_with(regs, Config::default())
}

pub(crate) fn session_with(regs: RegisterMap, config: Config) -> SimEve {
    Eve::new(SimDevice::new(regs), SimDelay::new(), regs, config)
}
