use anyhow::{bail, Context};
use clap::Parser;
use generator::profile::{write_runs, GeneratorConfig};
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use workflow::config::AnalysisConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline driver for the logger run processing engine")]
struct Args {
    /// Logger CSV files; the first one is the comparison baseline
    files: Vec<PathBuf>,
    /// Load an analysis workflow from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Filter settings as a flat JSON object, e.g. '{"type": "median", "median_kernel": 7}'
    #[arg(long)]
    filter: Option<String>,
    /// Write one processed CSV per run into this directory
    #[arg(long)]
    export_dir: Option<PathBuf>,
    /// Print the report as JSON instead of tables
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Write synthetic logger files into this directory and exit
    #[arg(long)]
    generate: Option<PathBuf>,
    #[arg(long, default_value_t = 3)]
    runs: usize,
    /// Logger rows per generated file
    #[arg(long, default_value_t = 2000)]
    samples: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(dir) = args.generate {
        let config = GeneratorConfig {
            runs: args.runs,
            rows: args.samples,
            seed: args.seed,
            ..Default::default()
        };
        for path in write_runs(&dir, &config)? {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = match args.workflow {
        Some(path) => AnalysisConfig::load(path)?.override_with(
            args.files,
            args.filter.as_deref(),
            args.export_dir,
        )?,
        None => AnalysisConfig::from_args(args.files, args.filter.as_deref(), args.export_dir)?,
    };
    if config.files.is_empty() {
        bail!("no run files given; pass CSV paths or a --workflow file");
    }

    let runtime = TokioBuilder::new_multi_thread()
        .build()
        .context("creating runtime for batch loading")?;
    let report = runtime.block_on(Runner::new(config).execute())?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing report")?
        );
    } else {
        print!("{}", report);
    }

    if report.loaded.is_empty() {
        bail!("none of the run files could be loaded");
    }
    Ok(())
}
