//! Per-channel scan statistics over valid returns.

use std::collections::BTreeMap;

use ndarray::{Array2, Zip};

use crate::types::{ChannelStats, FieldSummary, LidarScan, ScanFieldReport, ScanShape, ScanSummary};

/// Running min / max / sum over one channel.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    min: f64,
    max: f64,
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            count: 0,
        }
    }

    fn push(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
    }

    fn finish(self) -> ChannelStats {
        if self.count == 0 {
            return ChannelStats {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
            };
        }
        let mean = (self.sum / self.count as f64).clamp(self.min, self.max);
        ChannelStats {
            min: self.min,
            max: self.max,
            mean,
        }
    }
}

/// Summarize a scan. Only pixels with a non-zero range contribute to the
/// statistics; a scan without returns reports zeros.
pub fn summarize(scan: &LidarScan) -> ScanSummary {
    let mut range = Accumulator::new();
    let mut signal = Accumulator::new();
    let mut reflectivity = Accumulator::new();

    Zip::from(&scan.range)
        .and(&scan.signal)
        .and(&scan.reflectivity)
        .for_each(|&r, &s, &refl| {
            if r > 0 {
                range.push(r as f64);
                signal.push(s as f64);
                reflectivity.push(refl as f64);
            }
        });

    ScanSummary {
        frame_id: scan.frame_id,
        scan_shape: ScanShape {
            h: scan.height(),
            w: scan.width(),
        },
        num_valid_returns: range.count,
        range_stats: range.finish(),
        signal_stats: signal.finish(),
        reflectivity_stats: reflectivity.finish(),
    }
}

/// Mean range (millimeters) over valid returns, or zero without returns.
pub fn valid_range_mean(scan: &LidarScan) -> f64 {
    let mut range = Accumulator::new();
    scan.range
        .iter()
        .filter(|&&r| r > 0)
        .for_each(|&r| range.push(r as f64));
    range.finish().mean
}

/// Statistics of every channel over the full grid. Unlike [`summarize`],
/// pixels without a return count toward min and mean.
pub fn field_report(scan: &LidarScan) -> ScanFieldReport {
    let fields = [
        ("RANGE", field_summary(&scan.range, "uint32")),
        ("SIGNAL", field_summary(&scan.signal, "uint16")),
        ("REFLECTIVITY", field_summary(&scan.reflectivity, "uint16")),
        ("NEAR_IR", field_summary(&scan.near_ir, "uint16")),
    ];

    ScanFieldReport {
        frame_id: scan.frame_id,
        fields: fields
            .into_iter()
            .map(|(name, summary)| (name.to_string(), summary))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn field_summary<T>(field: &Array2<T>, dtype: &str) -> FieldSummary
where
    T: Copy + Into<f64>,
{
    let mut acc = Accumulator::new();
    let mut non_zero_count = 0;
    for &value in field.iter() {
        let value: f64 = value.into();
        if value > 0.0 {
            non_zero_count += 1;
        }
        acc.push(value);
    }

    let stats = acc.finish();
    let (h, w) = field.dim();
    FieldSummary {
        shape: ScanShape { h, w },
        dtype: dtype.to_string(),
        min: stats.min,
        max: stats.max,
        mean: stats.mean,
        non_zero_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_ordering(stats: &ChannelStats) {
        assert!(stats.min <= stats.mean, "{stats:?}");
        assert!(stats.mean <= stats.max, "{stats:?}");
    }

    #[test]
    fn test_summary_ignores_invalid_returns() {
        let mut scan = LidarScan::new(42, 2, 2);
        scan.range[[0, 0]] = 1000;
        scan.range[[0, 1]] = 3000;
        scan.signal[[0, 0]] = 10;
        scan.signal[[0, 1]] = 30;
        scan.signal[[1, 1]] = 999; // no return, ignored
        scan.reflectivity[[0, 0]] = 5;
        scan.reflectivity[[0, 1]] = 7;

        let summary = summarize(&scan);
        assert_eq!(summary.frame_id, 42);
        assert_eq!(summary.scan_shape, ScanShape { h: 2, w: 2 });
        assert_eq!(summary.num_valid_returns, 2);
        assert_eq!(summary.range_stats.min, 1000.0);
        assert_eq!(summary.range_stats.max, 3000.0);
        assert_eq!(summary.range_stats.mean, 2000.0);
        assert_eq!(summary.signal_stats.max, 30.0);
        assert_eq!(summary.reflectivity_stats.mean, 6.0);
    }

    #[test]
    fn test_summary_of_empty_scan_is_zero() {
        let scan = LidarScan::new(1, 4, 8);
        let summary = summarize(&scan);
        assert_eq!(summary.num_valid_returns, 0);
        assert_eq!(summary.range_stats.mean, 0.0);
        check_ordering(&summary.signal_stats);
    }

    #[test]
    fn test_summary_invariants_on_varied_scan() {
        let mut scan = LidarScan::new(3, 16, 64);
        for ((row, col), r) in scan.range.indexed_iter_mut() {
            *r = if (row + col) % 5 == 0 { 0 } else { (row * 97 + col * 13) as u32 };
        }
        for ((row, col), s) in scan.signal.indexed_iter_mut() {
            *s = ((row * 31 + col) % 1000) as u16;
        }
        for ((row, col), refl) in scan.reflectivity.indexed_iter_mut() {
            *refl = ((row + col * 7) % 255) as u16;
        }

        let summary = summarize(&scan);
        check_ordering(&summary.range_stats);
        check_ordering(&summary.signal_stats);
        check_ordering(&summary.reflectivity_stats);
        assert!(summary.num_valid_returns <= summary.scan_shape.h * summary.scan_shape.w);
        assert_eq!(summary.num_valid_returns, scan.valid_returns());
    }

    #[test]
    fn test_valid_range_mean() {
        let mut scan = LidarScan::new(1, 1, 4);
        scan.range[[0, 1]] = 400;
        scan.range[[0, 3]] = 600;
        assert_eq!(valid_range_mean(&scan), 500.0);
        assert_eq!(valid_range_mean(&LidarScan::new(1, 1, 1)), 0.0);
    }

    #[test]
    fn test_field_report_covers_whole_grid() {
        let mut scan = LidarScan::new(9, 2, 3);
        scan.range[[0, 0]] = 1200;
        scan.range[[1, 2]] = 600;
        scan.near_ir.fill(30);
        scan.near_ir[[1, 1]] = 0;

        let report = field_report(&scan);
        assert_eq!(report.frame_id, 9);
        let names: Vec<&str> = report.fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["NEAR_IR", "RANGE", "REFLECTIVITY", "SIGNAL"]);

        let range = &report.fields["RANGE"];
        assert_eq!(range.shape, ScanShape { h: 2, w: 3 });
        assert_eq!(range.dtype, "uint32");
        assert_eq!(range.min, 0.0);
        assert_eq!(range.max, 1200.0);
        assert_eq!(range.mean, 300.0);
        assert_eq!(range.non_zero_count, 2);

        let near_ir = &report.fields["NEAR_IR"];
        assert_eq!(near_ir.non_zero_count, 5);
        assert_eq!(near_ir.mean, 25.0);

        assert_eq!(report.fields["SIGNAL"].non_zero_count, 0);
        assert_eq!(report.fields["SIGNAL"].max, 0.0);
    }
}
