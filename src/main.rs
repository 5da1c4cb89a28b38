use clap::Parser;
use raster2svg::{inputs, Config, ConfigOverrides, JobReport, Pipeline, PipelineResult, Potrace};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "raster2svg")]
#[command(about = "Convert bitmap images to SVG outlines with potrace")]
#[command(version)]
pub struct Args {
    /// Image files or directories of images to convert
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// YAML or JSON config document
    #[arg(long, env = "RASTER2SVG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Binarization method (otsu, adaptive, fixed)
    #[arg(long)]
    pub binarization_method: Option<String>,

    /// Threshold for the fixed binarization method
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Smoothing method (median, gaussian, none)
    #[arg(long)]
    pub smoothing_method: Option<String>,

    /// Smoothing kernel size (odd, 1-15)
    #[arg(long)]
    pub kernel_size: Option<u32>,

    /// Sharpening intensity (0-5)
    #[arg(long)]
    pub sharpen: Option<f32>,

    /// Drop traced specks smaller than this many pixels (0-100)
    #[arg(long)]
    pub turdsize: Option<u32>,

    /// Number of images processed in parallel (1-16)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Path to the potrace executable
    #[arg(long, env = "POTRACE_PATH")]
    pub potrace: Option<PathBuf>,

    /// Directory for intermediate images
    #[arg(long, env = "RASTER2SVG_PROCESSED_DIR")]
    pub processed_dir: Option<PathBuf>,

    /// Directory for the SVG output
    #[arg(long, env = "RASTER2SVG_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Seconds before a potrace run is killed
    #[arg(long)]
    pub trace_timeout: Option<u64>,

    /// Also append logs to <DIR>/process.log
    #[arg(long, env = "RASTER2SVG_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Print the batch report as JSON
    #[arg(long)]
    pub json: bool,
}

impl From<&Args> for ConfigOverrides {
    fn from(args: &Args) -> Self {
        Self {
            binarization_method: args.binarization_method.clone(),
            binarization_threshold: args.threshold,
            smoothing_method: args.smoothing_method.clone(),
            smoothing_kernel_size: args.kernel_size,
            sharpen_intensity: args.sharpen,
            trace_speck_size: args.turdsize,
            max_workers: args.workers,
            potrace_path: args.potrace.clone(),
            processed_dir: args.processed_dir.clone(),
            output_dir: args.output_dir.clone(),
            trace_timeout_secs: args.trace_timeout,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    init_tracing(&args)?;

    tracing::info!("Starting raster2svg v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    }
    .apply(ConfigOverrides::from(&args));
    config.validate()?;

    let tracer = Potrace::from_config(&config);
    if !tracer.is_available() {
        tracing::warn!(
            "potrace not found at {}; every trace stage will fail",
            tracer.executable().display()
        );
    }

    let inputs = inputs::collect(&args.inputs)?;
    if inputs.is_empty() {
        anyhow::bail!("No images found in the given inputs");
    }

    let duplicates = inputs::duplicate_names(&inputs);
    if !duplicates.is_empty() {
        for (name, paths) in &duplicates {
            tracing::error!("Inputs share the base name {:?}: {:?}", name, paths);
        }
        anyhow::bail!("{} base name(s) used by more than one input", duplicates.len());
    }

    let pipeline = Pipeline::from_config(&config, Arc::new(tracer));
    let reports = pipeline.run_batch(&inputs).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_summary(&reports);
    }

    let failed = reports.iter().filter(|r| !r.result.is_success()).count();
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_tracing(args: &Args) -> anyhow::Result<()> {
    let file_layer = match &args.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("process.log"))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

fn print_summary(reports: &[JobReport]) {
    let (succeeded, failed): (Vec<&JobReport>, Vec<&JobReport>) =
        reports.iter().partition(|r| r.result.is_success());

    if !succeeded.is_empty() {
        println!("Converted {} image(s):", succeeded.len());
        for report in &succeeded {
            if let Some(svg) = report.result.svg_path() {
                println!("  {} -> {}", report.input.display(), svg.display());
            }
        }
    }

    if !failed.is_empty() {
        println!("Failed {} image(s):", failed.len());
        for report in &failed {
            if let PipelineResult::Failure { stage, cause, .. } = &report.result {
                println!("  {}: {} failed: {}", report.image, stage, cause);
            }
        }
    }
}
