// Per-iteration sample storage for one latency-type run

use serde::Serialize;

/// Samples captured in one measured launch cycle; `0.0` means lost
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IterationSample {
    /// Vitals launch timer, seconds
    pub timer: f64,
    /// Displayed (first frame) time, seconds
    pub displayed: f64,
    pub memory_mb: f64,
    pub cpu_percent: f64,
}

impl IterationSample {
    pub const LOST: Self = Self {
        timer: 0.0,
        displayed: 0.0,
        memory_mb: 0.0,
        cpu_percent: 0.0,
    };

    pub fn has_latency(&self) -> bool {
        self.timer != 0.0 || self.displayed != 0.0
    }
}

/// Fixed-size sample table indexed by iteration
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecords {
    samples: Vec<IterationSample>,
}

impl IterationRecords {
    pub fn new(iterations: usize) -> Self {
        Self {
            samples: vec![IterationSample::LOST; iterations],
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Store the sample of iteration `index`; out-of-range indices are ignored
    pub fn record(&mut self, index: usize, sample: IterationSample) {
        match self.samples.get_mut(index) {
            Some(slot) => *slot = sample,
            None => tracing::warn!(index, "Extra iteration sample ignored"),
        }
    }

    pub fn get(&self, index: usize) -> Option<&IterationSample> {
        self.samples.get(index)
    }

    pub fn samples(&self) -> &[IterationSample] {
        &self.samples
    }

    /// Zero every slot, keeping the size
    pub fn reset(&mut self) {
        self.samples.fill(IterationSample::LOST);
    }

    pub fn timer_series(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.timer).collect()
    }

    pub fn displayed_series(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.displayed).collect()
    }

    pub fn memory_series(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.memory_mb).collect()
    }

    pub fn cpu_series(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.cpu_percent).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_start_lost() {
        let records = IterationRecords::new(3);
        assert_eq!(records.len(), 3);
        assert!(records.samples().iter().all(|s| *s == IterationSample::LOST));
    }

    #[test]
    fn test_record_and_reset() {
        let mut records = IterationRecords::new(2);
        records.record(
            1,
            IterationSample {
                timer: 1.2,
                displayed: 0.9,
                memory_mb: 120.5,
                cpu_percent: 30.0,
            },
        );
        assert_eq!(records.timer_series(), vec![0.0, 1.2]);
        assert!(records.get(1).unwrap().has_latency());

        records.record(5, IterationSample::LOST);
        assert_eq!(records.len(), 2);

        records.reset();
        assert_eq!(records.len(), 2);
        assert_eq!(records.displayed_series(), vec![0.0, 0.0]);
    }
}
