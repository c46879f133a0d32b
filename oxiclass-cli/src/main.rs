//! oxiclass: run the classification walkthrough from the command line.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use oxiclass::datasets::{load_students, make_classification, Dataset};
use oxiclass::workflow::{
    label_distribution, load_config, render_count_plot, render_report_table, Experiment,
    ExperimentConfig, ModelReport, StudentDataset,
};

/// Compare classic classifiers on a synthetic dataset or on student records
#[derive(Parser, Debug)]
#[command(name = "oxiclass", version, about, long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./oxiclass.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the random seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Worked example on a generated two-class dataset
    Demo {
        /// Number of generated samples
        #[arg(short = 'n', long)]
        samples: Option<usize>,
    },
    /// Predict Low/Middle/High grade levels from student records
    Students {
        /// Path to the student CSV
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Also print per-class precision/recall for every model
        #[arg(long)]
        report: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let workdir = std::env::current_dir().context("cannot determine working directory")?;
    let mut config = load_config(cli.config.as_deref(), &workdir)
        .context("failed to load configuration")?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Demo { samples } => {
            if let Some(n) = samples {
                config.synthetic.n_samples = n;
            }
            let dataset = make_classification(&config.synthetic, Some(config.seed))
                .context("failed to generate the synthetic dataset")?;
            run(config, &dataset, cli.json, false)
        }
        Commands::Students { path, report } => {
            let path = path.unwrap_or_else(|| config.students_path.clone());
            let students = student_dataset(&path)?;
            run(config, &students.dataset, cli.json, report)
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = match (verbose, quiet) {
        (_, true) => "error",
        (0, false) => "warn",
        (1, false) => "info",
        (2, false) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}

fn student_dataset(path: &Path) -> anyhow::Result<StudentDataset> {
    if !path.exists() {
        bail!(
            "student data not found at {} (pass --path or set students_path in the config)",
            path.display()
        );
    }
    let records = load_students(path)?;
    Ok(StudentDataset::from_records(&records)?)
}

fn run(
    config: ExperimentConfig,
    dataset: &Dataset,
    json: bool,
    per_class: bool,
) -> anyhow::Result<()> {
    let counts = label_distribution(dataset);
    let reports = Experiment::new(config).run(dataset)?;

    if json {
        let out = serde_json::json!({
            "samples": dataset.n_samples(),
            "features": dataset.n_features(),
            "class_counts": counts,
            "models": reports,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "{} samples, {} features, {} classes\n",
        dataset.n_samples(),
        dataset.n_features(),
        dataset.n_classes()
    );
    print!("{}", render_count_plot(&counts));
    println!();
    print!("{}", render_report_table(&reports));
    if per_class {
        print_class_reports(&reports);
    }
    if let Some(best) = best_model(&reports) {
        println!("\nbest test accuracy: {} ({:.3})", best.name, best.test_accuracy);
    }
    Ok(())
}

fn print_class_reports(reports: &[ModelReport]) {
    for r in reports {
        println!("\n== {} ==\n{}", r.name, r.test_report);
    }
}

/// First model with the highest test accuracy.
fn best_model(reports: &[ModelReport]) -> Option<&ModelReport> {
    reports.iter().fold(None, |best: Option<&ModelReport>, r| match best {
        Some(b) if b.test_accuracy >= r.test_accuracy => Some(b),
        _ => Some(r),
    })
}
