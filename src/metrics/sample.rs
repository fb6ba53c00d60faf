use std::time::{SystemTime, UNIX_EPOCH};

/// One health measurement.
///
/// `throttled` is the raw firmware bitmask; its bits are not interpreted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricSample {
    /// Seconds since the unix epoch.
    pub timestamp: u64,
    /// SoC temperature in degrees Celsius.
    pub temperature: f64,
    /// ARM clock speed in Hz.
    pub clock_speed: u64,
    pub throttled: u32,
}

impl MetricSample {
    /// CSV header of the metric log.
    pub const HEADERS: [&'static str; 4] =
        ["time", "cpu_temperature", "cpu_clock_speed", "cpu_throttled"];

    /// Builds a sample stamped with the current wall-clock time.
    pub fn now(temperature: f64, clock_speed: u64, throttled: u32) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self {
            timestamp,
            temperature,
            clock_speed,
            throttled,
        }
    }

    /// Returns the sample as CSV fields.
    pub fn record(&self) -> Vec<String> {
        vec![
            self.timestamp.to_string(),
            format!("{:?}", self.temperature),
            self.clock_speed.to_string(),
            self.throttled.to_string(),
        ]
    }

    /// Parses CSV fields produced by [`record`](Self::record).
    pub fn from_record<S: AsRef<str>>(fields: &[S]) -> Option<Self> {
        match fields {
            [t, temp, clock, thr] => Some(Self {
                timestamp: t.as_ref().parse().ok()?,
                temperature: temp.as_ref().parse().ok()?,
                clock_speed: clock.as_ref().parse().ok()?,
                throttled: thr.as_ref().parse().ok()?,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csvlog::{read_csv_log, save_csv_log};

    #[test]
    fn test_metric_log_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");

        let log = vec![
            MetricSample { timestamp: 1, temperature: 40.0, clock_speed: 600, throttled: 0 },
            MetricSample { timestamp: 2, temperature: 41.0, clock_speed: 600, throttled: 0 },
        ];
        save_csv_log(
            &path,
            Some(&MetricSample::HEADERS[..]),
            log.iter().map(MetricSample::record),
        )
        .unwrap();

        let read = read_csv_log(&path, true).unwrap();
        assert_eq!(
            read.header.clone().unwrap(),
            ["time", "cpu_temperature", "cpu_clock_speed", "cpu_throttled"]
        );
        let samples: Vec<MetricSample> = read
            .rows
            .iter()
            .map(|r| MetricSample::from_record(r).unwrap())
            .collect();
        assert_eq!(samples, log);
        assert_eq!(read.rows[0], vec!["1", "40.0", "600", "0"]);
    }

    #[test]
    fn test_temperature_keeps_every_decimal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        let sample = MetricSample { timestamp: 1, temperature: 42.85, clock_speed: 600, throttled: 0 };

        save_csv_log(&path, Some(&MetricSample::HEADERS[..]), [sample.record()]).unwrap();

        let read = read_csv_log(&path, true).unwrap();
        assert_eq!(read.rows[0][1], "42.85");
        assert_eq!(MetricSample::from_record(&read.rows[0]), Some(sample));
    }

    #[test]
    fn test_from_record_rejects_wrong_width() {
        assert_eq!(MetricSample::from_record(&["1", "40.0", "600"]), None);
        assert_eq!(MetricSample::from_record(&["x", "40.0", "600", "0"]), None);
    }
}
