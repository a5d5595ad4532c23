// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueHint};
use spaced_config::RunConfig;
use spaced_core::criterion::{self, CriterionInputs};
use spaced_core::enumeration::scan_length_groups_in;
use spaced_core::persist::{read_npy, write_output, ArtifactNames};
use spaced_core::{
    Arity, BatchEvaluator, BatchOutput, GeneratorSet, Hyperboloid, ModelKind, PositiveDefinite,
    SymmetricSpace, WordRange, WordSource, DEFAULT_RELATION_TOLERANCE,
};
use tracing::{info, warn};

const SUMMARY_FILE: &str = "summary.json";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Straight-and-spaced checks for surface-group orbits"
)]
struct Cli {
    /// TOML run configuration; falls back to SPACED_CONFIG
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the generators and check the inverse pairs and the surface relation
    Relation(RelationArgs),

    /// Print the length-group boundaries of a word list
    Scan(ScanArgs),

    /// Measure angles and spacing for words split into two subwords
    Pairs(RunArgs),

    /// Measure angles and spacing for words split into three subwords
    Triples(RunArgs),

    /// Evaluate the straight-and-spaced inequalities
    Criterion(CriterionArgs),
}

#[derive(Args)]
struct RelationArgs {
    /// Largest accepted Frobenius distance from the identity
    #[arg(long, default_value_t = DEFAULT_RELATION_TOLERANCE)]
    tolerance: f64,
}

#[derive(Args)]
struct ScanArgs {
    /// Word list, one word per line
    #[arg(long, value_hint = ValueHint::FilePath)]
    words: PathBuf,

    /// Emit the groups as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RunArgs {
    /// Symmetric space to measure in (hyperbolic or rank2)
    #[arg(long, default_value_t = ModelKind::Hyperbolic)]
    model: ModelKind,

    /// Word list; overrides enumeration.path from the config
    #[arg(long, value_hint = ValueHint::FilePath)]
    words: Option<PathBuf>,

    /// Process the length group of this word length
    #[arg(long, conflicts_with = "start")]
    length: Option<usize>,

    /// First line index to process (0-based)
    #[arg(long)]
    start: Option<usize>,

    /// One past the last line index to process
    #[arg(long, requires = "start")]
    end: Option<usize>,

    /// Directory receiving the arrays and summary.json
    #[arg(long, value_hint = ValueHint::DirPath)]
    out: Option<PathBuf>,

    /// Evaluate both cosine formulas and report their largest gap
    #[arg(long)]
    cross_check: bool,

    /// Worker threads (0 picks the rayon default)
    #[arg(long)]
    threads: Option<usize>,

    /// Evaluate on the calling thread only
    #[arg(long)]
    sequential: bool,

    /// Words read per chunk
    #[arg(long)]
    chunk_size: Option<usize>,
}

#[derive(Args)]
struct CriterionArgs {
    /// Directory holding the arrays of a rank2 pairs run
    #[arg(long, value_hint = ValueHint::DirPath, conflicts_with_all = ["min_cos_zeta", "min_cos_iota_zeta", "spacing"])]
    from: Option<PathBuf>,

    /// Smallest cosine of the zeta-angle
    #[arg(long, requires_all = ["min_cos_iota_zeta", "spacing"], allow_negative_numbers = true)]
    min_cos_zeta: Option<f64>,

    /// Smallest cosine of the iota-zeta-angle
    #[arg(long, allow_negative_numbers = true)]
    min_cos_iota_zeta: Option<f64>,

    /// Smallest spacing
    #[arg(long)]
    spacing: Option<f64>,

    /// Matrix dimension d
    #[arg(long)]
    dim: Option<usize>,

    /// Interpolation parameter in (0.5, 1)
    #[arg(long)]
    parameter: Option<f64>,

    /// Emit the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(err) = spaced_config::init_tracing() {
        eprintln!("warning: {err}");
    }
    let outcome = try_main();
    spaced_config::flush_tracing();
    if let Err(err) = outcome {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let config = RunConfig::load(cli.config.as_deref()).context("loading run configuration")?;
    match &cli.command {
        Command::Relation(args) => run_relation(args),
        Command::Scan(args) => run_scan(args),
        Command::Pairs(args) => run_batch(args, Arity::Pairs, config),
        Command::Triples(args) => run_batch(args, Arity::Triples, config),
        Command::Criterion(args) => run_criterion(args, &config),
    }
}

fn run_relation(args: &RelationArgs) -> Result<()> {
    let generators = GeneratorSet::genus_two();
    println!("inverse residual:  {:e}", generators.inverse_residual());
    println!("relation residual: {:e}", generators.relation_residual());
    generators.verify(args.tolerance)?;
    println!("generators satisfy the surface relation within {:e}", args.tolerance);
    Ok(())
}

fn run_scan(args: &ScanArgs) -> Result<()> {
    let groups = scan_length_groups_in(&args.words)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }
    println!("{:>6} {:>12} {:>12} {:>12}", "length", "start", "end", "words");
    for group in &groups {
        println!(
            "{:>6} {:>12} {:>12} {:>12}",
            group.length,
            group.start,
            group.end,
            group.len()
        );
    }
    Ok(())
}

fn run_batch(args: &RunArgs, arity: Arity, mut config: RunConfig) -> Result<()> {
    if let Some(threads) = args.threads {
        config.execution.threads = threads;
    }
    if args.sequential {
        config.execution.sequential = true;
    }
    if let Some(chunk_size) = args.chunk_size {
        if chunk_size == 0 {
            bail!("--chunk-size must be positive");
        }
        config.execution.chunk_size = chunk_size;
    }

    let words = args
        .words
        .clone()
        .or_else(|| config.enumeration.path.clone())
        .context("no word list given; pass --words or set enumeration.path")?;
    let range = resolve_range(args, &config, &words)?;
    let out_dir = args.out.clone().unwrap_or_else(|| config.output.dir.clone());

    let generators = GeneratorSet::genus_two();
    generators.verify(DEFAULT_RELATION_TOLERANCE)?;

    let output = match args.model {
        ModelKind::Hyperbolic => {
            evaluate_with(Hyperboloid, &generators, arity, args, &config, &words, range)?
        }
        ModelKind::Rank2 => evaluate_with(
            PositiveDefinite::new(),
            &generators,
            arity,
            args,
            &config,
            &words,
            range,
        )?,
    };

    let written = write_output(&out_dir, &output)?;
    let summary_path = out_dir.join(SUMMARY_FILE);
    let summary = serde_json::to_string_pretty(&output.summary)?;
    fs::write(&summary_path, summary)
        .with_context(|| format!("writing {}", summary_path.display()))?;
    for path in &written {
        info!(path = %path.display(), "wrote array");
    }

    let summary = &output.summary;
    println!(
        "{} {}: {} words, {} NaN",
        summary.model, summary.arity, summary.words, summary.nan_count
    );
    println!("min cos primary:   {}", display(summary.min_cos_primary));
    if summary.model == ModelKind::Rank2 {
        println!("min cos secondary: {}", display(summary.min_cos_secondary));
        println!("worst angle sum:   {}", display(summary.worst_combined_angle));
    }
    println!(
        "spacing ({:?}):     {}",
        summary.spacing_extremum,
        display(summary.spacing)
    );
    if summary.any_nan {
        warn!(count = summary.nan_count, "some words produced NaN readings");
    }
    Ok(())
}

fn evaluate_with<S: SymmetricSpace>(
    space: S,
    generators: &GeneratorSet,
    arity: Arity,
    args: &RunArgs,
    config: &RunConfig,
    words: &Path,
    range: WordRange,
) -> Result<BatchOutput> {
    let mut batch = config.execution.batch_config();
    batch.cross_check = args.cross_check;
    let evaluator = BatchEvaluator::new(space, generators, arity, batch)?;
    let source = WordSource::open(words, range, config.execution.chunk_size)?;
    Ok(evaluator.evaluate_stream(source)?)
}

fn resolve_range(args: &RunArgs, config: &RunConfig, words: &Path) -> Result<WordRange> {
    if let Some(start) = args.start {
        return Ok(WordRange::new(start, args.end)?);
    }
    let Some(length) = args.length else {
        return Ok(WordRange::all());
    };
    if let Some(group) = config.enumeration.group(length) {
        return Ok(group.into());
    }
    let groups = scan_length_groups_in(words)?;
    match groups.into_iter().find(|group| group.length == length) {
        Some(group) => {
            info!(length, start = group.start, end = group.end, "located length group by scanning");
            Ok(group.into())
        }
        None => bail!("no words of length {length} in {}", words.display()),
    }
}

fn run_criterion(args: &CriterionArgs, config: &RunConfig) -> Result<()> {
    let inputs = match (&args.from, args.min_cos_zeta, args.min_cos_iota_zeta, args.spacing) {
        (Some(dir), ..) => inputs_from_dir(dir)?,
        (None, Some(zeta), Some(iota_zeta), Some(spacing)) => {
            CriterionInputs::new(zeta, iota_zeta, spacing)
        }
        _ => bail!(
            "pass --from <dir> or all of --min-cos-zeta, --min-cos-iota-zeta and --spacing"
        ),
    }
    .with_dim(args.dim.unwrap_or(config.criterion.dim))
    .with_parameter(args.parameter.unwrap_or(config.criterion.parameter));

    let report = criterion::evaluate(&inputs)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    if !report.passed() {
        let failed: Vec<&str> = report.failed_items().map(|item| item.name).collect();
        bail!("criterion items failed: {}", failed.join(", "));
    }
    Ok(())
}

fn inputs_from_dir(dir: &Path) -> Result<CriterionInputs> {
    let names = ArtifactNames::new(ModelKind::Rank2, Arity::Pairs);
    let cos_zeta = read_npy(dir.join(&names.cos_primary))?;
    let cos_iota_zeta = match &names.cos_secondary {
        Some(name) => read_npy(dir.join(name))?,
        None => bail!("rank2 artifacts always carry a second angle column"),
    };
    let spacing = read_npy(dir.join(&names.spacing))?;
    Ok(CriterionInputs::from_arrays(
        &cos_zeta,
        &cos_iota_zeta,
        &spacing,
    )?)
}

fn display(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |value| format!("{value:.16}"))
}
