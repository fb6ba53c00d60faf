//! # Latency histogram extraction.
//!
//! `cyclictest -h N` prints one line per latency bucket once it terminates:
//!
//! ```text
//! # Histogram
//! 000000 000000	000000	000000	000000
//! 000001 000004	000012	000003	000009
//! ...
//! # Total: 000123456 000123456 ...
//! ```
//!
//! The first field is the bucket label (kept verbatim), the remaining fields are
//! per-core counts. Comment and blank lines produce no row.

/// One histogram bucket: latency label and per-core sample counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistogramRow {
    pub latency: String,
    pub counts: Vec<u64>,
}

impl HistogramRow {
    /// Returns the row as CSV fields.
    pub fn record(&self) -> Vec<String> {
        std::iter::once(self.latency.clone())
            .chain(self.counts.iter().map(u64::to_string))
            .collect()
    }
}

/// Parses a single output line into a bucket.
///
/// Returns `None` for blank lines, `#` comments and lines that do not have at
/// least one numeric count after the label.
pub fn parse_bucket(line: &str) -> Option<HistogramRow> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut fields = line.split_whitespace();
    let latency = fields.next()?.to_string();
    let counts = fields
        .map(str::parse::<u64>)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

    if counts.is_empty() {
        return None;
    }
    Some(HistogramRow { latency, counts })
}

/// Parses captured output into the histogram log, skipping non-bucket lines.
pub fn parse_histogram<S: AsRef<str>>(lines: &[S]) -> Vec<HistogramRow> {
    lines
        .iter()
        .filter_map(|l| parse_bucket(l.as_ref()))
        .collect()
}

/// CSV header for a histogram with `cores` count columns.
pub fn headers(cores: usize) -> Vec<String> {
    std::iter::once("latency".to_string())
        .chain((1..=cores).map(|n| format!("count_core{n}")))
        .collect()
}

/// Number of count columns to use for `rows`: widest row, or the number of
/// available CPUs when there are no rows.
pub fn core_columns(rows: &[HistogramRow]) -> usize {
    rows.iter()
        .map(|r| r.counts.len())
        .max()
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_separated_bucket() {
        let row = parse_bucket("1000\t5\t3\t0").unwrap();
        assert_eq!(row.latency, "1000");
        assert_eq!(row.counts, vec![5, 3, 0]);
        assert_eq!(row.record(), vec!["1000", "5", "3", "0"]);
    }

    #[test]
    fn test_cyclictest_layout_keeps_label_verbatim() {
        let row = parse_bucket("000042 000001\t000017\n").unwrap();
        assert_eq!(row.latency, "000042");
        assert_eq!(row.counts, vec![1, 17]);
    }

    #[test]
    fn test_comments_and_blanks_yield_nothing() {
        assert_eq!(parse_bucket(""), None);
        assert_eq!(parse_bucket("   \t "), None);
        assert_eq!(parse_bucket("# Histogram"), None);
        assert_eq!(parse_bucket("  # Total: 000100 000100"), None);
    }

    #[test]
    fn test_malformed_lines_yield_nothing() {
        assert_eq!(parse_bucket("1000"), None);
        assert_eq!(parse_bucket("1000\tfive\t3"), None);
    }

    #[test]
    fn test_parse_histogram_skips_noise() {
        let lines = [
            "# /dev/cpu_dma_latency set to 0us",
            "",
            "000000 000000\t000002",
            "000001 000010\t000008",
            "# Max Latencys: 00012 00015",
        ];
        let rows = parse_histogram(&lines);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].counts, vec![10, 8]);
        assert_eq!(core_columns(&rows), 2);
    }

    #[test]
    fn test_headers() {
        assert_eq!(
            headers(2),
            vec!["latency", "count_core1", "count_core2"]
        );
    }
}
