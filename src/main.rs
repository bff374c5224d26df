use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use env_logger::Env;

use lichtmaler::error::{PaintError, Result};
use lichtmaler::form::TerminalForm;
use lichtmaler::imagesource::FileImageSource;
use lichtmaler::input::{InputController, TerminalKeys};
use lichtmaler::output;
use lichtmaler::painter::Painter;
use lichtmaler::settings::Settings;
use lichtmaler::strip::Strip;

#[derive(Parser)]
struct Cli {
    /// Settings file (TOML). Built-in defaults are used without one
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pattern to start with, overrides the settings file
    #[arg(short, long, value_name = "INDEX")]
    pattern: Option<usize>,

    /// Do not touch any hardware, simulate every strip
    #[arg(long)]
    dry_run: bool,

    /// Log per-pass details
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        // The terminal is in raw mode while painting.
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:5}] {}\r",
                buf.timestamp_millis(),
                record.level(),
                record.args()
            )
        })
        .init();
}

fn run(args: &Cli) -> Result<()> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(pattern) = args.pattern {
        settings.default_pattern = pattern;
    }
    settings.validate()?;

    let mut strips = Vec::with_capacity(settings.strip_count());
    for (index, strip_settings) in settings.strips.iter().enumerate() {
        log::info!(
            "Config of strip {}: pixels={}, color order={}, vflip={}, output={:?}",
            index + 1,
            strip_settings.pixels,
            strip_settings.color_order,
            strip_settings.vflip,
            strip_settings.output
        );
        strips.push(Strip::new(index, output::open(index, strip_settings, args.dry_run)?));
    }

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst)).map_err(|err| {
        PaintError::Terminal(io::Error::new(io::ErrorKind::Other, err.to_string()))
    })?;

    let images = Box::new(FileImageSource::new(settings.image_dir.clone()));
    let input = InputController::new(TerminalKeys::new()?, settings.patterns.len());
    let mut painter = Painter::new(&settings, strips, images, input, TerminalForm, stop)?;
    log::info!("Keys: 0-9 pattern, up/down speed, o options, esc quit");
    painter.run()
}

fn main() {
    let args = Cli::parse();
    init_logging(args.verbose);

    if let Err(err) = run(&args) {
        log::error!("{err}");
    }
}
