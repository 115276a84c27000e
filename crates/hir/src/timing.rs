use std::time::{Duration, Instant};
use rustc_hash::FxHashMap;

/// Phase names used throughout the pipeline.
pub const PHASE_PARSE: &str = "parse";
pub const PHASE_RECOVER: &str = "recover";

/// Per-phase timing and outcome counts for one function.
#[derive(Debug, Clone)]
pub struct FuncTimings {
    pub func_name: String,
    pub phases: Vec<(String, Duration)>,
    /// Conditions reduced to a single expression.
    pub recovered: usize,
    /// Chains that fell back to raw jumps.
    pub fallbacks: usize,
}

impl FuncTimings {
    pub fn new(func_name: impl Into<String>) -> Self {
        Self {
            func_name: func_name.into(),
            phases: Vec::new(),
            recovered: 0,
            fallbacks: 0,
        }
    }

    pub fn record(&mut self, phase: &str, duration: Duration) {
        self.phases.push((phase.to_string(), duration));
    }

    pub fn total(&self) -> Duration {
        self.phases.iter().map(|(_, d)| *d).sum()
    }
}

/// Timings for every function of one input file.
#[derive(Debug, Clone)]
pub struct FileTimings {
    pub file_name: String,
    pub parse_time: Duration,
    pub functions: Vec<FuncTimings>,
}

impl FileTimings {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            parse_time: Duration::ZERO,
            functions: Vec::new(),
        }
    }

    pub fn total_recover(&self) -> Duration {
        self.functions.iter()
            .flat_map(|f| f.phases.iter())
            .filter(|(p, _)| p == PHASE_RECOVER)
            .map(|(_, d)| *d)
            .sum()
    }

    pub fn total_all_phases(&self) -> Duration {
        self.parse_time + self.functions.iter().map(|f| f.total()).sum::<Duration>()
    }
}

/// Aggregated report across all files.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub files: Vec<FileTimings>,
}

impl PipelineReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file: FileTimings) {
        self.files.push(file);
    }

    pub fn total_functions(&self) -> usize {
        self.files.iter().map(|f| f.functions.len()).sum()
    }

    /// (recovered, fallbacks) summed over every function.
    pub fn outcome_totals(&self) -> (usize, usize) {
        self.files
            .iter()
            .flat_map(|f| f.functions.iter())
            .fold((0, 0), |(r, g), f| (r + f.recovered, g + f.fallbacks))
    }

    pub fn phase_totals(&self) -> FxHashMap<String, Duration> {
        let mut totals = FxHashMap::default();
        let parse_total: Duration = self.files.iter().map(|f| f.parse_time).sum();
        totals.insert(PHASE_PARSE.to_string(), parse_total);

        for file in &self.files {
            for func in &file.functions {
                for (phase, duration) in &func.phases {
                    *totals.entry(phase.clone()).or_insert(Duration::ZERO) += *duration;
                }
            }
        }
        totals
    }

    pub fn grand_total(&self) -> Duration {
        self.files.iter().map(|f| f.total_all_phases()).sum()
    }

    /// Print a summary table to stderr.
    pub fn print_summary(&self) {
        let totals = self.phase_totals();
        let grand = self.grand_total();
        let func_count = self.total_functions();
        let (recovered, fallbacks) = self.outcome_totals();

        eprintln!("\n--- Performance Summary ---");
        eprintln!("{} files, {} functions in {:.2?}", self.files.len(), func_count, grand);
        eprintln!("{} conditions recovered, {} left as jumps", recovered, fallbacks);
        eprintln!();

        for phase in [PHASE_PARSE, PHASE_RECOVER] {
            if let Some(&dur) = totals.get(phase) {
                eprintln!("  {:12} {:>10.2?}  ({:.1}%)", phase, dur, percent(dur, grand));
            }
        }

        if func_count > 0 {
            let avg = grand / func_count as u32;
            eprintln!("\n  avg/function: {:.2?}", avg);
        }
    }

    /// Functions with goto fallbacks, most fallbacks first, paired with
    /// the file they came from.
    pub fn fallback_hotspots(&self, limit: usize) -> Vec<(&str, &FuncTimings)> {
        let mut hotspots: Vec<(&str, &FuncTimings)> = self
            .files
            .iter()
            .flat_map(|file| {
                file.functions
                    .iter()
                    .filter(|func| func.fallbacks > 0)
                    .map(move |func| (file.file_name.as_str(), func))
            })
            .collect();
        hotspots.sort_by(|a, b| {
            b.1.fallbacks
                .cmp(&a.1.fallbacks)
                .then_with(|| b.1.total().cmp(&a.1.total()))
        });
        hotspots.truncate(limit);
        hotspots
    }

    /// List the functions that left the most conditions as jumps.
    pub fn print_fallbacks(&self, limit: usize) {
        let hotspots = self.fallback_hotspots(limit);
        if hotspots.is_empty() {
            return;
        }
        eprintln!("\n--- Unrecovered conditions ---");
        for (file, func) in hotspots {
            eprintln!(
                "  {:4} of {:4}  {}: {}",
                func.fallbacks,
                func.recovered + func.fallbacks,
                file,
                func.func_name
            );
        }
    }
}

fn percent(part: Duration, whole: Duration) -> f64 {
    if whole.as_nanos() > 0 {
        part.as_nanos() as f64 / whole.as_nanos() as f64 * 100.0
    } else {
        0.0
    }
}

/// Convenience: time a closure and return (result, duration).
pub fn timed<F, T>(f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}
