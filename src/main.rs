use clap::{Args, Parser, Subcommand};
use shotflow::adjust::Adjustments;
use shotflow::config::{self, StudioConfig};
use shotflow::job::{Clock, ManualClock, SimulatedJobSource, SystemClock};
use shotflow::style::{Facet, StyleCatalog};
use shotflow::types::{ExportFormat, Resolution, UploadedImage};
use shotflow::workflow::WorkflowController;
use shotflow::{output, upload};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shotflow")]
#[command(about = "Product image generation workflow, simulated end to end")]
#[command(long_about = "\
Product image generation workflow, simulated end to end

A session moves through five stages:

  1. upload    product photos are handed in
  2. style     model type, background, style and lighting are chosen
  3. generate  a generation job runs through its processing steps
  4. edit      results are adjusted (brightness, contrast, saturation, sharpness)
  5. download  a batch of results is packaged for export

`simulate` drives one session through every stage with a simulated
generation backend and prints what each stage produced.

Set RUST_LOG=shotflow=debug to trace stage changes and job ticks.")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "shotflow.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a whole session: upload → style → generate → edit → download
    Simulate(SimulateArgs),
    /// Validate the configuration file
    Check,
    /// Print a stock shotflow.toml with all options documented
    GenConfig,
}

#[derive(Args)]
struct SimulateArgs {
    /// Image files to upload
    images: Vec<PathBuf>,

    /// Upload every image found in this directory instead
    #[arg(long, conflicts_with = "images")]
    source: Option<PathBuf>,

    /// Model type facet (defaults to the catalog's first option)
    #[arg(long)]
    model_type: Option<String>,
    /// Background facet
    #[arg(long)]
    background: Option<String>,
    /// Style facet
    #[arg(long)]
    style: Option<String>,
    /// Lighting facet
    #[arg(long)]
    lighting: Option<String>,

    /// Brightness adjustment applied to every result (-50..50)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    brightness: i32,
    /// Contrast adjustment (-50..50)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    contrast: i32,
    /// Saturation adjustment (-50..50)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    saturation: i32,
    /// Sharpness passed on to export (-50..50)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    sharpness: i32,

    /// Mark a result (1-based) as favorite; favorites become the download batch
    #[arg(long = "favorite")]
    favorites: Vec<usize>,

    /// Download every result
    #[arg(long, conflicts_with = "favorites")]
    all: bool,

    /// Export format: png, jpeg, webp (defaults to config)
    #[arg(long)]
    format: Option<ExportFormat>,
    /// Export resolution: original, 2k, 4k (defaults to config)
    #[arg(long)]
    resolution: Option<Resolution>,

    /// Wait for the configured tick interval instead of fast-forwarding
    #[arg(long)]
    realtime: bool,

    /// Print the export batch as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Simulate(args) => {
            let config = config::load_config(&cli.config)?;
            let interval = config.generation.tick_interval();
            if args.realtime {
                let source =
                    SimulatedJobSource::new(config.generation.clone(), SystemClock::new());
                simulate(&config, &args, source, || std::thread::sleep(interval))?;
            } else {
                let clock = ManualClock::new();
                let source = SimulatedJobSource::new(config.generation.clone(), clock.clone());
                simulate(&config, &args, source, || clock.advance(interval))?;
            }
        }
        Command::Check => {
            let config = config::load_config(&cli.config)?;
            println!("==> Checking {}", cli.config.display());
            println!(
                "    {} generation steps, {} artifacts per run",
                config.generation.stages.len(),
                config.generation.artifact_count
            );
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Drive one session through all five stages.
///
/// `wait` is called between generation polls to let simulated time pass.
fn simulate<C: Clock>(
    config: &StudioConfig,
    args: &SimulateArgs,
    jobs: SimulatedJobSource<C>,
    mut wait: impl FnMut(),
) -> Result<(), Box<dyn std::error::Error>> {
    let mut controller = WorkflowController::new(jobs);

    output::print_stage_banner(controller.stage());
    let images = collect_uploads(args)?;
    for image in &images {
        println!("    {}", image.id);
    }
    controller.submit_upload(images)?;

    output::print_stage_banner(controller.stage());
    let catalog = StyleCatalog::from_config(&config.catalog);
    let mut choice = catalog.first_choice().unwrap_or_default();
    for (facet, value) in [
        (Facet::ModelType, &args.model_type),
        (Facet::Background, &args.background),
        (Facet::Style, &args.style),
        (Facet::Lighting, &args.lighting),
    ] {
        if let Some(value) = value {
            choice.set(facet, value.clone());
        }
    }
    for facet in Facet::ALL {
        println!("    {}: {}", facet, choice.get(facet).unwrap_or("-"));
    }
    controller.submit_style(choice)?;

    output::print_stage_banner(controller.stage());
    let artifacts = loop {
        let status = controller
            .poll_generation()
            .ok_or("generation job is no longer running")?;
        output::print_progress(&status);
        if status.complete {
            break status.artifacts.unwrap_or_default();
        }
        wait();
    };
    controller.complete_generation(artifacts)?;

    output::print_stage_banner(controller.stage());
    let params = Adjustments::new(
        args.brightness,
        args.contrast,
        args.saturation,
        args.sharpness,
    );
    let count = controller.session().artifacts.len();
    for index in 0..count {
        controller.set_adjustments(index, params)?;
    }
    for &position in &args.favorites {
        let index = position.checked_sub(1).ok_or("favorites are numbered from 1")?;
        controller.set_favorite(index, true)?;
    }
    if !params.is_neutral() {
        println!("    {}", controller.render(0)?.to_css_filter());
    }
    controller.complete_editing()?;

    output::print_stage_banner(controller.stage());
    if args.all {
        controller.select_all_downloads()?;
    } else if !args.favorites.is_empty() {
        controller.download_favorites()?;
    }
    let plan = controller.plan_export(
        args.format.unwrap_or(config.export.format),
        args.resolution.unwrap_or(config.export.resolution),
    )?;

    println!();
    output::print_session(controller.session());
    println!();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        output::print_export_plan(&plan);
    }
    Ok(())
}

fn collect_uploads(args: &SimulateArgs) -> Result<Vec<UploadedImage>, Box<dyn std::error::Error>> {
    let images = match &args.source {
        Some(dir) => upload::scan_upload_dir(dir)?,
        None => upload::uploads_from_paths(&args.images),
    };
    if images.is_empty() {
        return Err("no images to upload (pass image paths or --source <dir>)".into());
    }
    Ok(images)
}
