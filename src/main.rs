use clap::Parser;
use loctree::cli::{Cli, run_cli};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

fn init_logging(level: LevelFilter) -> color_eyre::Result<()> {
    if level == LevelFilter::Off {
        return Ok(());
    }
    let config = ConfigBuilder::new()
        .add_filter_allow_str(loctree::log_sink::LOG_TARGET)
        .set_time_format_rfc3339()
        .build();
    TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto)?;
    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    init_logging(args.log_level())?;

    let out = run_cli(&args)?;
    print!("{out}");
    Ok(())
}
