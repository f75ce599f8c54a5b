use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use tracing::info;

use crate::config::SimulationConfig;
use crate::domain::grid2d::{Grid2D, GridDimensions2D};
use crate::result::{Frame, SimulationResult};

pub const DEFAULT_FRAME_SKIP: usize = 50;
pub const DEFAULT_DOWNSAMPLE: usize = 2;

#[derive(Serialize, Debug)]
struct Metadata {
    nx: usize,
    ny: usize,
    h: f64,
    dt: f64,
    rho: f64,
    nu: f64,
    num_steps: usize,
    frame_skip: usize,
    downsample: usize,
    // Coordinates of the exported (downsampled) nodes
    x: Vec<f64>,
    y: Vec<f64>,
}

#[derive(Serialize, Debug)]
struct FrameData {
    step: usize,
    time: f64,
    // Downsampled fields, flattened row-major (rows along y)
    u: Vec<f64>,
    v: Vec<f64>,
    pressure: Option<Vec<f64>>,
    curl: Vec<f64>,
    speed: Vec<f64>,
}

#[derive(Serialize, Debug)]
struct SimulationOutput<'a> {
    metadata: Metadata,
    frames: &'a [FrameData],
}

/// Writes a finished run to a JSON file for downstream plotting.
#[derive(Debug)]
pub struct JsonOutputManager {
    output_filepath: PathBuf,
    frame_skip: usize,
    downsample: usize,
}

impl JsonOutputManager {
    /// Creates a new JsonOutputManager.
    /// Ensures the parent directory for the output file exists.
    pub fn new<P: AsRef<Path>>(
        output_filepath: P,
        frame_skip: usize,
        downsample: usize,
    ) -> Result<Self, io::Error> {
        if downsample == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "downsample stride must be at least 1",
            ));
        }
        let output_filepath = output_filepath.as_ref().to_path_buf();
        if let Some(parent_dir) = output_filepath.parent() {
            if !parent_dir.as_os_str().is_empty() {
                fs::create_dir_all(parent_dir)?;
                info!("Ensured output directory exists: {}", parent_dir.display());
            }
        }
        Ok(Self {
            output_filepath,
            frame_skip,
            downsample,
        })
    }

    /// Whether `step` is exported: step 0, every `frame_skip`-th step and the final
    /// step. A `frame_skip` of 0 keeps only the first and final steps.
    pub fn should_collect(&self, step: usize, final_step: usize) -> bool {
        if step == 0 || step == final_step {
            return true;
        }
        self.frame_skip != 0 && step % self.frame_skip == 0
    }

    pub fn write(
        &self,
        result: &SimulationResult,
        grid: &Grid2D,
        config: &SimulationConfig,
    ) -> Result<(), io::Error> {
        let (num_frames, rows, cols) = result.shape();
        if (rows, cols) != grid.field_shape() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Result frames are {}x{} but the grid expects {:?}",
                    rows,
                    cols,
                    grid.field_shape()
                ),
            ));
        }

        info!("Writing results to JSON file: {}...", self.output_filepath.display());
        let output_start = Instant::now();

        let final_step = num_frames.saturating_sub(1);
        let frames: Vec<FrameData> = result
            .frames()
            .filter(|frame| self.should_collect(frame.step, final_step))
            .map(|frame| self.frame_data(&frame))
            .collect();

        let GridDimensions2D(nx, ny) = grid.dimensions;
        let metadata = Metadata {
            nx,
            ny,
            h: grid.h,
            dt: config.dt,
            rho: config.rho,
            nu: config.nu,
            num_steps: result.num_steps(),
            frame_skip: self.frame_skip,
            downsample: self.downsample,
            x: self.stride_vector(&grid.x),
            y: self.stride_vector(&grid.y),
        };
        let output = SimulationOutput {
            metadata,
            frames: &frames,
        };

        let file = File::create(&self.output_filepath)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &output)?;
        writer.flush()?;

        info!(
            "JSON output ({} frames) finished in {:.2}ms",
            frames.len(),
            output_start.elapsed().as_secs_f64() * 1e3
        );
        Ok(())
    }

    fn frame_data(&self, frame: &Frame<'_>) -> FrameData {
        FrameData {
            step: frame.step,
            time: frame.time,
            u: self.downsample_field(frame.u),
            v: self.downsample_field(frame.v),
            pressure: frame.pressure.map(|p| self.downsample_field(p)),
            curl: self.downsample_field(frame.curl),
            speed: self.downsample_field(frame.speed),
        }
    }

    fn downsample_field(&self, field: &DMatrix<f64>) -> Vec<f64> {
        let mut out = Vec::new();
        for i in (0..field.nrows()).step_by(self.downsample) {
            for j in (0..field.ncols()).step_by(self.downsample) {
                out.push(field[(i, j)]);
            }
        }
        out
    }

    fn stride_vector(&self, coords: &DVector<f64>) -> Vec<f64> {
        coords.iter().step_by(self.downsample).copied().collect()
    }
}
