use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::capture::buffer::CHANNEL_COUNT;
use crate::capture::{CaptureError, LineSource};

struct ChannelPattern {
    offset: f64,
    amplitude: f64,
    frequency_hz: f64,
}

// One drift pattern per SMA input so the channels stay visually distinct.
const PATTERNS: [ChannelPattern; CHANNEL_COUNT] = [
    ChannelPattern {
        offset: 100.0,
        amplitude: 50.0,
        frequency_hz: 0.1,
    },
    ChannelPattern {
        offset: -50.0,
        amplitude: 30.0,
        frequency_hz: 0.2,
    },
    ChannelPattern {
        offset: 0.0,
        amplitude: 80.0,
        frequency_hz: 0.05,
    },
    ChannelPattern {
        offset: 200.0,
        amplitude: 20.0,
        frequency_hz: 0.3,
    },
];

/// Synthetic instrument output for running without hardware.
///
/// Emits one measurement cycle (one line per channel) per interval: a slow
/// sine drift per channel plus noise and the occasional spike, in the exact
/// wire format. A status line is interleaved every 50 cycles to exercise
/// the unmatched-line path. Never closes.
pub struct DemoSource {
    rng: StdRng,
    started: Instant,
    next_cycle: Instant,
    interval: Duration,
    pending: VecDeque<String>,
    cycles: u64,
}

impl DemoSource {
    /// Five measurement cycles per second, matching the real instrument's
    /// typical output rate.
    pub fn new() -> Self {
        Self::with_interval(Duration::from_millis(200))
    }

    pub fn with_interval(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            rng: StdRng::from_entropy(),
            started: now,
            next_cycle: now,
            interval,
            pending: VecDeque::new(),
            cycles: 0,
        }
    }

    fn emit_cycle(&mut self) {
        let elapsed = self.started.elapsed().as_secs_f64();
        for (index, pattern) in PATTERNS.iter().enumerate() {
            let base =
                pattern.offset + pattern.amplitude * (TAU * pattern.frequency_hz * elapsed).sin();
            let mut noise = self.rng.gen_range(-5.0..5.0);
            if self.rng.gen_bool(0.02) {
                let spike = self.rng.gen_range(100..=300);
                noise += if self.rng.gen_bool(0.5) {
                    f64::from(spike)
                } else {
                    f64::from(-spike)
                };
            }
            let value = (base + noise) as i64;
            self.pending
                .push_back(format!("*****Measurement channel {}: {} ns", index + 1, value));
        }
        self.cycles += 1;
        if self.cycles % 50 == 0 {
            self.pending
                .push_back(format!("Generated {} measurement sets", self.cycles));
        }
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSource for DemoSource {
    fn try_read_line(&mut self) -> Result<Option<String>, CaptureError> {
        if self.pending.is_empty() && Instant::now() >= self.next_cycle {
            self.emit_cycle();
            self.next_cycle += self.interval;
        }
        Ok(self.pending.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::parse::parse_measurement_line;

    #[test]
    fn emits_one_parseable_line_per_channel() {
        let mut source = DemoSource::with_interval(Duration::ZERO);
        for wire in 1..=CHANNEL_COUNT {
            let line = source
                .try_read_line()
                .expect("demo source never closes")
                .expect("cycle should be ready immediately");
            let reading = parse_measurement_line(&line)
                .unwrap_or_else(|| panic!("demo line should parse: {line:?}"));
            assert_eq!(reading.channel, wire);
        }
    }

    #[test]
    fn interleaves_status_line_every_fifty_cycles() {
        let mut source = DemoSource::with_interval(Duration::ZERO);
        let mut unmatched = Vec::new();
        for _ in 0..50 * (CHANNEL_COUNT + 1) {
            if let Ok(Some(line)) = source.try_read_line() {
                if parse_measurement_line(&line).is_none() {
                    unmatched.push(line);
                }
            }
        }
        assert!(unmatched.iter().any(|l| l.starts_with("Generated ")));
    }
}
