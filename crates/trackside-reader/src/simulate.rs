//! Synthetic tag traffic for running without a reader.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use trackside_config::SimulationSettings;
use trackside_llrp_protocol::{Epc, TagReportData};

/// Leading bytes shared by every simulated tag; the last byte is the rider.
pub const SIMULATED_EPC_PREFIX: [u8; 5] = [0x20, 0x16, 0x00, 0x00, 0x00];

/// Produces tag report records on a pseudo-random schedule.
#[derive(Debug)]
pub struct Simulator {
    rng: StdRng,
    tag_count: u8,
    antenna_count: u16,
    max_interval_ms: u64,
}

impl Simulator {
    pub fn new(settings: &SimulationSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            tag_count: settings.tag_count.max(1),
            antenna_count: settings.antenna_count.max(1),
            max_interval_ms: settings.max_interval_ms,
        }
    }

    /// One record as the reader would report it, seen at `now_us`.
    pub fn next_record(&mut self, now_us: u64) -> TagReportData {
        let antenna_id = self.rng.random_range(1..=self.antenna_count);
        let rider = self.rng.random_range(1..=self.tag_count);
        let mut bytes = SIMULATED_EPC_PREFIX.to_vec();
        bytes.push(rider);
        TagReportData::sighting(Epc::from_bytes(&bytes), antenna_id, now_us)
    }

    /// Gap before the next record.
    pub fn next_interval(&mut self) -> Duration {
        Duration::from_millis(self.rng.random_range(0..=self.max_interval_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(seed: u64) -> SimulationSettings {
        SimulationSettings {
            seed: Some(seed),
            tag_count: 4,
            antenna_count: 2,
            max_interval_ms: 250,
        }
    }

    #[test]
    fn test_records_stay_in_range() {
        let mut simulator = Simulator::new(&settings(11));
        for i in 0..500u64 {
            let record = simulator.next_record(i);
            let antenna = record.antenna_id.unwrap_or(0);
            assert!((1..=2).contains(&antenna));
            let bytes = record.epc.as_ref().map(|e| e.canonical_bytes().to_vec());
            let bytes = bytes.unwrap_or_default();
            assert_eq!(bytes.get(..5), Some(&SIMULATED_EPC_PREFIX[..]));
            assert!(bytes.get(5).is_some_and(|b| (1..=4).contains(b)));
            assert_eq!(record.first_seen_utc, Some(i));
            assert!(simulator.next_interval() <= Duration::from_millis(250));
        }
    }

    #[test]
    fn test_same_seed_same_traffic() {
        let mut a = Simulator::new(&settings(99));
        let mut b = Simulator::new(&settings(99));
        for i in 0..50u64 {
            assert_eq!(a.next_record(i), b.next_record(i));
            assert_eq!(a.next_interval(), b.next_interval());
        }
    }
}
