use crate::config_reader::Config;
use crate::log_sink::{LogFacade, LogSink, NoopSink};
use crate::output::{OutputFormat, render};
use crate::walker::{WalkOptions, Walker};
use clap::Parser;
use log::LevelFilter;
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Parser)]
#[command(author, version, about = "Count lines of code per language")]
pub struct Cli {
    /// Files or directories to count
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Show the whole result tree instead of just the summary
    #[arg(short, long)]
    pub all: bool,

    /// Output format
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = OutputFormat::Yaml)]
    pub output: OutputFormat,

    /// Print how long counting took
    #[arg(short, long)]
    pub time: bool,

    /// Number of files and directories processed at once
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Config path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose logging to stderr; repeat for per-line tracing
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub debug: u8,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.debug {
            0 => LevelFilter::Off,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

pub fn run_cli(args: &Cli) -> color_eyre::Result<String> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let jobs = args
        .jobs
        .or(config.jobs)
        .unwrap_or_else(num_cpus::get)
        .max(1);
    let registry = config.into_registry()?;
    let sink: Arc<dyn LogSink> = if args.debug > 0 {
        Arc::new(LogFacade)
    } else {
        Arc::new(NoopSink)
    };
    let walker = Walker::with_options(registry, WalkOptions { jobs }, sink)?;

    let start = Instant::now();
    let total = walker.count_roots(&args.paths);
    let elapsed = start.elapsed();

    let mut out = render(&total, args.output, args.all)?;
    if args.time {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        let _ = writeln!(out, "Counting completed in {elapsed:?}.");
    }
    Ok(out)
}
