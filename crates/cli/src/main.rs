use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use cinder_hir::timing::{self, FileTimings, FuncTimings, PipelineReport, PHASE_RECOVER};
use cinder_lift::{recover_conditions, Region};

/// Recover `if`/`while`/`until` conditions and `and`/`or` expressions from
/// Lua 5.1 binary chunks.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Compiled chunks (`luac` output) or directories containing them
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Only print the function with this depth-first index
    #[arg(short, long)]
    function: Option<usize>,

    /// Print a timing summary to stderr
    #[arg(short, long)]
    timings: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut paths = Vec::new();
    for input in &args.inputs {
        if input.is_dir() {
            collect_chunks(input, &mut paths)
                .with_context(|| format!("listing {}", input.display()))?;
        } else {
            paths.push(input.clone());
        }
    }
    paths.sort();

    let mut report = PipelineReport::new();
    let mut failed = 0;

    for path in &paths {
        match process_file(path, args.function) {
            Ok(file_timings) => report.add(file_timings),
            Err(err) => {
                log::error!("{:#}", err);
                failed += 1;
            }
        }
    }

    if args.timings {
        report.print_summary();
        report.print_fallbacks(15);
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files could not be read", failed, paths.len());
    }
    Ok(())
}

fn process_file(path: &Path, only: Option<usize>) -> Result<FileTimings> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (chunk, parse_time) = timing::timed(|| cinder_bytecode::deserialize(&data));
    let chunk = chunk.with_context(|| format!("parsing {}", path.display()))?;
    log::debug!("{}: parsed in {:.2?}", path.display(), parse_time);

    let mut file_timings = FileTimings::new(path.display().to_string());
    file_timings.parse_time = parse_time;

    for (index, func) in chunk.functions().into_iter().enumerate() {
        let name = match index {
            0 => "main".to_string(),
            _ => format!("fn#{} (line {})", index, func.line_defined),
        };
        let mut func_timings = FuncTimings::new(name);

        let (regions, duration) = timing::timed(|| recover_conditions(func));
        func_timings.record(PHASE_RECOVER, duration);
        for region in &regions {
            match region {
                Region::Condition(_) => func_timings.recovered += 1,
                Region::Goto { .. } => func_timings.fallbacks += 1,
            }
        }

        if only.map_or(true, |n| n == index) {
            println!("function {} (line {}):", index, func.line_defined);
            for region in &regions {
                println!("  {}", region);
            }
        }

        file_timings.functions.push(func_timings);
    }

    Ok(file_timings)
}

fn collect_chunks(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_chunks(&path, out)?;
        } else if path
            .extension()
            .is_some_and(|e| e == "luac" || e == "out")
        {
            out.push(path);
        }
    }
    Ok(())
}
