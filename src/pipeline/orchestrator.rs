use crate::config::{Config, PipelineConfig};
use crate::error::StageError;
use crate::tracer::Tracer;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use super::job::ImageJob;
use super::raster;
use super::steps;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Binarize,
    Crop,
    Smooth,
    Trace,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binarize => "binarize",
            Self::Crop => "crop",
            Self::Smooth => "smooth",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing information for a single stage
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub stage: Stage,
    pub time_ms: u64,
}

/// Outcome of one image job. There is no partial success.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PipelineResult {
    Success {
        svg_path: PathBuf,
        total_time_ms: u64,
        steps: Vec<StepTiming>,
    },
    Failure {
        stage: Stage,
        code: String,
        cause: String,
    },
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn svg_path(&self) -> Option<&Path> {
        match self {
            Self::Success { svg_path, .. } => Some(svg_path),
            Self::Failure { .. } => None,
        }
    }
}

/// Result of one job, tied back to its input
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub image: String,
    pub input: PathBuf,
    #[serde(flatten)]
    pub result: PipelineResult,
}

struct StageFailure {
    stage: Stage,
    error: StageError,
}

/// Runs Binarize → Crop → Smooth → Trace for each image
pub struct Pipeline {
    config: PipelineConfig,
    processed_dir: PathBuf,
    output_dir: PathBuf,
    tracer: Arc<dyn Tracer>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        processed_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        tracer: Arc<dyn Tracer>,
    ) -> Self {
        Self {
            config,
            processed_dir: processed_dir.into(),
            output_dir: output_dir.into(),
            tracer,
        }
    }

    pub fn from_config(config: &Config, tracer: Arc<dyn Tracer>) -> Self {
        Self::new(
            config.pipeline.clone(),
            config.processed_dir.clone(),
            config.output_dir.clone(),
            tracer,
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Derive every path the pipeline will touch for `input`
    pub fn job(&self, input: &Path) -> ImageJob {
        ImageJob::new(input, &self.processed_dir, &self.output_dir)
    }

    /// Process one image. Never fails; failures are reported in the result.
    pub async fn run(&self, input: &Path) -> JobReport {
        let job = self.job(input);
        let span = tracing::info_span!("job", image = %job.name);
        let image = job.name.clone();

        let result = self.run_job(job).instrument(span).await;

        JobReport {
            image,
            input: input.to_path_buf(),
            result,
        }
    }

    /// Process a batch with at most `max_workers` jobs in flight.
    /// Reports arrive in completion order, one per input.
    ///
    /// Inputs must have distinct base names (see [`crate::inputs::duplicate_names`]).
    /// Jobs sharing a base name write the same intermediate and SVG paths.
    pub async fn run_batch(&self, inputs: &[PathBuf]) -> Vec<JobReport> {
        let total = inputs.len();
        let workers = self.config.max_workers.max(1);
        tracing::info!(
            "Processing {} image(s) with {} worker(s), tracing with {}",
            total,
            workers,
            self.tracer.name()
        );

        let mut jobs = stream::iter(inputs)
            .map(|input| self.run(input))
            .buffer_unordered(workers);

        let mut reports = Vec::with_capacity(total);
        while let Some(report) = jobs.next().await {
            let status = if report.result.is_success() {
                "done"
            } else {
                "failed"
            };
            tracing::info!("[{}/{}] {} {}", reports.len() + 1, total, report.image, status);
            reports.push(report);
        }

        reports
    }

    async fn run_job(&self, job: ImageJob) -> PipelineResult {
        let start = Instant::now();
        let mut timings = Vec::new();
        tracing::info!("Processing {}", job.input.display());

        match self.run_stages(&job, &mut timings).await {
            Ok(()) => {
                let total_time_ms = start.elapsed().as_millis() as u64;
                tracing::info!("Wrote {} in {}ms", job.svg.display(), total_time_ms);
                PipelineResult::Success {
                    svg_path: job.svg,
                    total_time_ms,
                    steps: timings,
                }
            }
            Err(StageFailure { stage, error }) => {
                tracing::error!(stage = %stage, "{} failed for {}: {}", stage, job.name, error);
                PipelineResult::Failure {
                    stage,
                    code: error.code().to_string(),
                    cause: error.to_string(),
                }
            }
        }
    }

    async fn run_stages(
        &self,
        job: &ImageJob,
        timings: &mut Vec<StepTiming>,
    ) -> Result<(), StageFailure> {
        let config = &self.config;

        let binary = {
            let input = job.input.clone();
            let output = job.binary.clone();
            let method = config.binarization_method.clone();
            let threshold = config.binarization_threshold;
            let intensity = config.sharpen_intensity;
            self.run_blocking_step(Stage::Binarize, timings, move || {
                let gray = raster::load_grayscale(&input)?;
                let binary = steps::threshold::apply(&gray, &method, threshold, intensity)?;
                raster::save_png(&binary, &output)?;
                Ok(binary)
            })
            .await?
        };

        let cropped = {
            let output = job.cropped.clone();
            self.run_blocking_step(Stage::Crop, timings, move || {
                let cropped = steps::crop::apply(&binary)?;
                raster::save_png(&cropped, &output)?;
                Ok(cropped)
            })
            .await?
        };

        let bitmap = {
            let output = job.smoothed.clone();
            let method = config.smoothing_method.clone();
            let kernel_size = config.smoothing_kernel_size;
            self.run_blocking_step(Stage::Smooth, timings, move || {
                let smoothed = steps::smooth::apply(&cropped, &method, kernel_size)?;
                raster::save_bitmap(&smoothed, &output)
            })
            .await?
        };

        let trace_start = Instant::now();
        let traced = match raster::ensure_parent(&job.svg) {
            Ok(()) => {
                self.tracer
                    .trace(&bitmap, &job.svg, config.trace_speck_size)
                    .await
            }
            Err(e) => Err(e),
        };
        traced.map_err(|error| StageFailure {
            stage: Stage::Trace,
            error,
        })?;
        timings.push(StepTiming {
            stage: Stage::Trace,
            time_ms: trace_start.elapsed().as_millis() as u64,
        });

        Ok(())
    }

    /// Run a CPU-bound stage on the blocking pool, recording its timing
    async fn run_blocking_step<T, F>(
        &self,
        stage: Stage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<T, StageFailure>
    where
        F: FnOnce() -> Result<T, StageError> + Send + 'static,
        T: Send + 'static,
    {
        let step_start = Instant::now();
        let span = tracing::Span::current();

        let result = tokio::task::spawn_blocking(move || span.in_scope(step_fn))
            .await
            .unwrap_or_else(|e| {
                Err(StageError::Internal(format!("{} task aborted: {}", stage, e)))
            });

        let value = result.map_err(|error| StageFailure { stage, error })?;
        timings.push(StepTiming {
            stage,
            time_ms: step_start.elapsed().as_millis() as u64,
        });
        Ok(value)
    }
}
