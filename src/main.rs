//! Command-line interface for colorharmonize
//!
//! Parses the scene paths and options, runs the harmonization engine and
//! reports the elapsed time. Exits with status 1 on any failure.

use anyhow::{bail, Context};
use clap::{error::ErrorKind, CommandFactory, Parser};
use colorharmonize::config::describer_types_from_str;
use colorharmonize::{
    ColorHarmonizationEngine, GeometricModel, HarmonizationReport, HarmonizeConfig,
    HarmonizeParams, SelectionMethod,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "colorharmonize")]
#[command(about = "Global color harmonization of an SfM image set")]
struct Cli {
    /// Path to the sfm_data.json kind of file
    #[arg(
        short = 'i',
        long = "input_file",
        value_name = "FILE",
        default_value = ""
    )]
    input_file: String,

    /// Directory holding features and matches
    #[arg(
        short = 'm',
        long = "matchesDir",
        value_name = "DIR",
        default_value = ""
    )]
    matches_dir: String,

    /// Describer methods, comma separated: SIFT (default), SIFT_FLOAT, AKAZE,
    /// AKAZE_MLDB, CCTAG3, CCTAG4, SIFT_OCV, AKAZE_OCV
    #[arg(short = 'd', long = "describerMethods", default_value = "SIFT")]
    describer_methods: String,

    /// Output directory
    #[arg(
        short = 'o',
        long = "outdir",
        value_name = "DIR",
        default_value = ""
    )]
    outdir: String,

    /// Selection method: 0 full frame, 1 matched points, 2 VLD segment
    #[arg(
        short = 's',
        long = "selectionMethod",
        default_value_t = -1,
        allow_negative_numbers = true
    )]
    selection_method: i32,

    /// Reference image view id
    #[arg(
        short = 'r',
        long = "referenceImage",
        default_value_t = -1,
        allow_negative_numbers = true
    )]
    reference_image: i64,

    /// Geometric model the matches were filtered with: 'f' (default), 'e' or 'h'
    #[arg(short = 'g', long = "matchesGeometricModel", default_value = "f")]
    matches_geometric_model: String,

    /// JSON file with tuning parameters
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log debug details
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() -> ExitCode {
    println!("Global Color Harmonization");
    println!();

    if std::env::args_os().len() == 1 {
        print_usage();
        eprintln!("Invalid command line parameter.");
        return ExitCode::FAILURE;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    init_tracing(cli.verbose);

    if cli.input_file.is_empty() {
        eprintln!();
        eprintln!("It is an invalid file input");
        return ExitCode::FAILURE;
    }

    let start = Instant::now();
    match run(&cli) {
        Ok(report) => {
            tracing::info!(
                views = report.views.len(),
                reference = report.reference_view,
                max_residual = report.max_residual(),
                "harmonization finished"
            );
            println!();
            println!(
                " ColorHarmonization took (s): {:.3}",
                start.elapsed().as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!();
            eprintln!(" Something goes wrong in the process: {:#}", e);
            if let Some(err) = e.downcast_ref::<colorharmonize::HarmonizeError>() {
                eprintln!(" {}", err.user_message());
            }
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    let mut command = Cli::command();
    eprintln!("{}", command.render_usage());
    eprintln!("Use --help for the full option list");
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "colorharmonize=debug" } else { "colorharmonize=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<HarmonizationReport> {
    let describer_types = describer_types_from_str(&cli.describer_methods)
        .context("invalid describer method list")?;
    let geometric_model: GeometricModel = cli
        .matches_geometric_model
        .parse()
        .context("invalid matches geometric model")?;
    let selection_method =
        SelectionMethod::from_code(cli.selection_method).context("invalid selection method")?;
    let reference_view = match cli.reference_image {
        -1 => None,
        id => match u32::try_from(id) {
            Ok(id) => Some(id),
            Err(_) => bail!("invalid reference image {}", id),
        },
    };
    let params = match &cli.config {
        Some(path) => HarmonizeParams::from_json_file(path)
            .with_context(|| format!("cannot load parameters from {}", path.display()))?,
        None => HarmonizeParams::default(),
    };

    let output_dir = Path::new(&cli.outdir);
    if !cli.outdir.is_empty() && !output_dir.exists() {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("cannot create output directory {}", output_dir.display()))?;
    }

    let config = HarmonizeConfig {
        sfm_data_path: PathBuf::from(&cli.input_file),
        matches_dir: PathBuf::from(&cli.matches_dir),
        describer_types,
        geometric_model,
        output_dir: output_dir.to_path_buf(),
        selection_method,
        reference_view,
        params,
    };

    let report = ColorHarmonizationEngine::new(config).process()?;
    Ok(report)
}
