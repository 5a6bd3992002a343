//! Cartesian projection of range images and point-cloud statistics.

use std::collections::HashMap;
use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::types::{LidarError, LidarResult, LidarScan, SensorMetadata};

/// Occupancy grid cell size in meters.
pub const GRID_RESOLUTION: f64 = 1.0;

/// Number of densest grid cells reported.
const DENSEST_CELLS: usize = 5;

/// Precomputed per-pixel unit vectors and beam-origin offsets.
///
/// Projects a range (mm) at pixel (row, col) to sensor-frame XYZ in meters.
#[derive(Debug, Clone)]
pub struct XyzLut {
    height: usize,
    width: usize,
    direction: Vec<[f64; 3]>,
    offset: Vec<[f64; 3]>,
}

impl XyzLut {
    pub fn new(meta: &SensorMetadata) -> LidarResult<Self> {
        let height = meta.pixels_per_column;
        let width = meta.columns_per_frame;
        if height == 0 || width == 0 {
            return Err(LidarError::InvalidInput(
                "sensor reports an empty scan format".to_string(),
            ));
        }
        if meta.beam_altitude_angles.len() != height || meta.beam_azimuth_angles.len() != height {
            return Err(LidarError::InvalidInput(format!(
                "beam intrinsics cover {} / {} beams, expected {height}",
                meta.beam_altitude_angles.len(),
                meta.beam_azimuth_angles.len()
            )));
        }

        let n = meta.lidar_origin_to_beam_origin_mm;
        let mut direction = Vec::with_capacity(height * width);
        let mut offset = Vec::with_capacity(height * width);

        for row in 0..height {
            let altitude = meta.beam_altitude_angles[row].to_radians();
            let azimuth = -meta.beam_azimuth_angles[row].to_radians();
            for col in 0..width {
                let encoder = TAU * (1.0 - col as f64 / width as f64);
                let dir = [
                    (encoder + azimuth).cos() * altitude.cos(),
                    (encoder + azimuth).sin() * altitude.cos(),
                    altitude.sin(),
                ];
                offset.push([
                    n * encoder.cos() - n * dir[0],
                    n * encoder.sin() - n * dir[1],
                    -n * dir[2],
                ]);
                direction.push(dir);
            }
        }

        Ok(Self {
            height,
            width,
            direction,
            offset,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Project one range sample to XYZ meters.
    pub fn project(&self, row: usize, col: usize, range_mm: u32) -> [f64; 3] {
        let i = row * self.width + col;
        let (d, o) = (self.direction[i], self.offset[i]);
        let r = range_mm as f64;
        [
            (r * d[0] + o[0]) / 1000.0,
            (r * d[1] + o[1]) / 1000.0,
            (r * d[2] + o[2]) / 1000.0,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
    pub width: f64,
    pub length: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub x: usize,
    pub y: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseCell {
    pub x: f64,
    pub y: f64,
    pub point_count: usize,
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAnalysis {
    pub resolution: f64,
    pub grid_size: GridSize,
    pub occupied_cells: usize,
    pub occupancy_percentage: f64,
    pub highest_density_regions: Vec<DenseCell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightStats {
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

/// Analysis of the valid points of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudDetail {
    pub bounding_box: BoundingBox,
    pub grid_analysis: GridAnalysis,
    pub height_statistics: HeightStats,
    pub signal_statistics: SpreadStats,
    pub reflectivity_statistics: SpreadStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudReport {
    pub frame_id: u64,
    pub total_points: usize,
    pub valid_points: usize,
    /// Absent when no point survived filtering.
    pub detail: Option<PointCloudDetail>,
}

fn spread(values: &[f64]) -> SpreadStats {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    SpreadStats {
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean,
        std_dev: variance.sqrt(),
    }
}

/// Project a scan and summarize the points with a non-zero range, optionally
/// limited to `max_distance` meters from the sensor.
pub fn analyze(scan: &LidarScan, lut: &XyzLut, max_distance: Option<f64>) -> LidarResult<PointCloudReport> {
    if lut.shape() != (scan.height(), scan.width()) {
        return Err(LidarError::InvalidInput(format!(
            "scan shape {}x{} does not match sensor format {}x{}",
            scan.height(),
            scan.width(),
            lut.height,
            lut.width
        )));
    }

    let mut points = Vec::new();
    let mut signal = Vec::new();
    let mut reflectivity = Vec::new();

    for ((row, col), &range) in scan.range.indexed_iter() {
        if range == 0 {
            continue;
        }
        let xyz = lut.project(row, col, range);
        if let Some(limit) = max_distance {
            let distance = (xyz[0].powi(2) + xyz[1].powi(2) + xyz[2].powi(2)).sqrt();
            if distance > limit {
                continue;
            }
        }
        points.push(xyz);
        signal.push(scan.signal[[row, col]] as f64);
        reflectivity.push(scan.reflectivity[[row, col]] as f64);
    }

    let detail = if points.is_empty() {
        None
    } else {
        Some(PointCloudDetail {
            bounding_box: bounding_box(&points),
            grid_analysis: grid_analysis(&points),
            height_statistics: {
                let z: Vec<f64> = points.iter().map(|p| p[2]).collect();
                let stats = spread(&z);
                HeightStats {
                    mean: stats.mean,
                    std_dev: stats.std_dev,
                }
            },
            signal_statistics: spread(&signal),
            reflectivity_statistics: spread(&reflectivity),
        })
    };

    Ok(PointCloudReport {
        frame_id: scan.frame_id,
        total_points: scan.cell_count(),
        valid_points: points.len(),
        detail,
    })
}

fn bounding_box(points: &[[f64; 3]]) -> BoundingBox {
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for p in points {
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }
    BoundingBox {
        min_x: min[0],
        min_y: min[1],
        min_z: min[2],
        max_x: max[0],
        max_y: max[1],
        max_z: max[2],
        width: max[0] - min[0],
        length: max[1] - min[1],
        height: max[2] - min[2],
    }
}

fn grid_analysis(points: &[[f64; 3]]) -> GridAnalysis {
    let bbox = bounding_box(points);
    let size = GridSize {
        x: ((bbox.max_x - bbox.min_x) / GRID_RESOLUTION).ceil() as usize + 1,
        y: ((bbox.max_y - bbox.min_y) / GRID_RESOLUTION).ceil() as usize + 1,
    };

    let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
    for p in points {
        let cx = ((p[0] - bbox.min_x) / GRID_RESOLUTION).floor() as usize;
        let cy = ((p[1] - bbox.min_y) / GRID_RESOLUTION).floor() as usize;
        if cx < size.x && cy < size.y {
            *counts.entry((cx, cy)).or_default() += 1;
        }
    }

    let mut cells: Vec<_> = counts.iter().map(|(&cell, &count)| (cell, count)).collect();
    cells.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let highest_density_regions = cells
        .iter()
        .take(DENSEST_CELLS)
        .map(|&((cx, cy), count)| DenseCell {
            x: bbox.min_x + (cx as f64 + 0.5) * GRID_RESOLUTION,
            y: bbox.min_y + (cy as f64 + 0.5) * GRID_RESOLUTION,
            point_count: count,
            density: count as f64 / GRID_RESOLUTION.powi(2),
        })
        .collect();

    GridAnalysis {
        resolution: GRID_RESOLUTION,
        grid_size: size,
        occupied_cells: counts.len(),
        occupancy_percentage: counts.len() as f64 / (size.x * size.y) as f64 * 100.0,
        highest_density_regions,
    }
}
