use std::time::{SystemTime, UNIX_EPOCH};

/// Number of SMA measurement inputs on the instrument (SMA1..SMA4).
pub const CHANNEL_COUNT: usize = 4;

/// Default ring capacity per channel.
pub const DEFAULT_CAPACITY: usize = 1000;

/// One timestamped TIE reading. Immutable once created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    /// Measured offset in nanoseconds.
    pub value_ns: i64,
    /// Unix seconds at the moment the reading was ingested.
    pub observed_at: i64,
}

impl Sample {
    pub fn new(value_ns: i64, observed_at: i64) -> Self {
        Self {
            value_ns,
            observed_at,
        }
    }

    /// Stamps the reading with the current wall clock.
    pub fn now(value_ns: i64) -> Self {
        let observed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self::new(value_ns, observed_at)
    }
}

/// Fixed-capacity ring of samples for one measurement channel.
///
/// `min_ns`/`max_ns` track lifetime extrema over every value ever pushed,
/// while `average_ns` covers only the currently retained window. The
/// instrument's original statistics display behaves exactly this way, so
/// the asymmetry is kept.
pub struct ChannelBuffer {
    samples: Vec<Sample>,
    capacity: usize,
    // Next slot to overwrite once the ring is full.
    head: usize,
    min_ns: i64,
    max_ns: i64,
    total_count: u64,
}

impl ChannelBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            head: 0,
            min_ns: 0,
            max_ns: 0,
            total_count: 0,
        }
    }

    /// Appends one sample, overwriting the oldest once the ring is full.
    pub fn push(&mut self, sample: Sample) {
        if self.total_count == 0 {
            self.min_ns = sample.value_ns;
            self.max_ns = sample.value_ns;
        } else {
            self.min_ns = self.min_ns.min(sample.value_ns);
            self.max_ns = self.max_ns.max(sample.value_ns);
        }
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
            self.head = self.samples.len() % self.capacity;
        } else {
            self.samples[self.head] = sample;
            self.head = (self.head + 1) % self.capacity;
        }
        self.total_count += 1;
    }

    /// Number of samples currently retained (at most `capacity`).
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lifetime number of samples ever pushed, independent of capacity.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Lifetime minimum across all values ever pushed.
    pub fn min_ns(&self) -> Option<i64> {
        (self.total_count > 0).then_some(self.min_ns)
    }

    /// Lifetime maximum across all values ever pushed.
    pub fn max_ns(&self) -> Option<i64> {
        (self.total_count > 0).then_some(self.max_ns)
    }

    /// Arithmetic mean of exactly the retained samples.
    pub fn average_ns(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: i128 = self.iter_chronological().map(|s| i128::from(s.value_ns)).sum();
        Some(sum as f64 / self.samples.len() as f64)
    }

    /// The most recently pushed sample.
    pub fn latest(&self) -> Option<Sample> {
        if self.samples.len() < self.capacity {
            self.samples.last().copied()
        } else {
            Some(self.samples[(self.head + self.capacity - 1) % self.capacity])
        }
    }

    /// Retained samples oldest to newest, unwrapping the ring start.
    pub fn iter_chronological(&self) -> impl Iterator<Item = &Sample> + '_ {
        let (older, newer) = if self.samples.len() < self.capacity {
            (&self.samples[..], &[][..])
        } else {
            let (wrapped, oldest) = self.samples.split_at(self.head);
            (oldest, wrapped)
        };
        older.iter().chain(newer.iter())
    }

    /// Returns the buffer to its freshly constructed state.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.head = 0;
        self.min_ns = 0;
        self.max_ns = 0;
        self.total_count = 0;
    }
}

/// All four per-channel buffers, indexed by 1-based wire channel number.
pub struct ChannelSet {
    channels: Vec<ChannelBuffer>,
}

impl ChannelSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: (0..CHANNEL_COUNT).map(|_| ChannelBuffer::new(capacity)).collect(),
        }
    }

    /// Buffer for the given 1-based wire channel, if it exists.
    pub fn get(&self, wire: usize) -> Option<&ChannelBuffer> {
        wire.checked_sub(1).and_then(|i| self.channels.get(i))
    }

    pub fn get_mut(&mut self, wire: usize) -> Option<&mut ChannelBuffer> {
        wire.checked_sub(1).and_then(|i| self.channels.get_mut(i))
    }

    /// Buffers in wire order, SMA1 first.
    pub fn iter(&self) -> impl Iterator<Item = &ChannelBuffer> {
        self.channels.iter()
    }

    /// Display label for a 1-based wire channel.
    pub fn label(wire: usize) -> String {
        format!("SMA{wire}")
    }

    pub fn reset_all(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
