extern crate clap;
extern crate image;
extern crate mandelbrot;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use mandelbrot::config::{parse_moves, parse_run_count};
use mandelbrot::{paint, Engine, MandelError, RenderConfig, Viewport};
use std::path::PathBuf;
use std::str::FromStr;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_size(s: &str) -> Result<(), String> {
    match parse_pair::<usize>(s, 'x') {
        Some((w, h)) if w > 0 && h > 0 => Ok(()),
        _ => Err("Size must look like WIDTHxHEIGHT, both above zero".to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const GRAPHICS: &str = "graphics";
const NO_GRAPHICS: &str = "no-graphics";
const RUNS: &str = "runs";
const STRATEGY: &str = "strategy";
const THREADS: &str = "threads";
const SIZE: &str = "size";
const CENTER: &str = "center";
const SCALE: &str = "scale";
const MOVES: &str = "moves";
const OUTPUT: &str = "output";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("mandel")
        .version("0.1.0")
        .about("Mandelbrot escape-time renderer")
        .arg(
            Arg::with_name(GRAPHICS)
                .long(GRAPHICS)
                .overrides_with(NO_GRAPHICS)
                .help("Color the result and write it out (default)"),
        )
        .arg(
            Arg::with_name(NO_GRAPHICS)
                .long(NO_GRAPHICS)
                .overrides_with(GRAPHICS)
                .help("Compute only"),
        )
        .arg(
            Arg::with_name(RUNS)
                .long(RUNS)
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("1")
                .help("Number of computation passes to time; below 1 means 1"),
        )
        .arg(
            Arg::with_name(STRATEGY)
                .long(STRATEGY)
                .takes_value(true)
                .default_value("scalar")
                .possible_values(&["scalar", "narrow", "wide", "vector"])
                .help("How many pixels to iterate at once"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .default_value("1")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads sharing each pass"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("800x600")
                .validator(|s| validate_size(&s))
                .help("Size of the pixel grid"),
        )
        .arg(
            Arg::with_name(CENTER)
                .long(CENTER)
                .short("c")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-0.5,0.0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse center point"))
                .help("Point on the complex plane under the middle of the grid"),
        )
        .arg(
            Arg::with_name(SCALE)
                .long(SCALE)
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0.005")
                .validator(|s| match f64::from_str(&s) {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Could not parse scale".to_string()),
                })
                .help("Plane units per pixel"),
        )
        .arg(
            Arg::with_name(MOVES)
                .long(MOVES)
                .short("m")
                .takes_value(true)
                .validator(|s| parse_moves(&s).map(|_| ()))
                .help("Keys to replay before computing: z x zoom, h l k j pan"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .default_value("mandelbrot.png")
                .help("Output image"),
        )
        .get_matches()
}

fn config(matches: &ArgMatches) -> RenderConfig {
    let mut config = RenderConfig::default();

    // The validators above have already vetted every value read here.
    if let Some((width, height)) = matches.value_of(SIZE).and_then(|s| parse_pair(s, 'x')) {
        config.width = width;
        config.height = height;
    }
    if let Some((x, y)) = matches.value_of(CENTER).and_then(|s| parse_pair(s, ',')) {
        config.viewport = Viewport::new(x, y, config.viewport.scale);
    }
    if let Some(scale) = matches.value_of(SCALE).and_then(|s| f64::from_str(s).ok()) {
        config.viewport.scale = scale;
    }
    if let Some(strategy) = matches.value_of(STRATEGY).and_then(|s| s.parse().ok()) {
        config.strategy = strategy;
    }
    if let Some(threads) = matches.value_of(THREADS).and_then(|s| usize::from_str(s).ok()) {
        config.threads = threads;
    }
    if let Some(runs) = matches.value_of(RUNS) {
        config.run_count = parse_run_count(runs);
    }
    if let Some(output) = matches.value_of(OUTPUT) {
        config.output = PathBuf::from(output);
    }
    config.graphics = !matches.is_present(NO_GRAPHICS);

    if let Some(moves) = matches.value_of(MOVES).and_then(|s| parse_moves(s).ok()) {
        config.navigate(&moves);
    }
    config
}

fn write_image(config: &RenderConfig, pixels: Vec<u8>) -> Result<(), MandelError> {
    let image = image::RgbaImage::from_raw(config.width as u32, config.height as u32, pixels)
        .ok_or_else(|| MandelError::Output("pixel buffer does not match grid".to_string()))?;
    image
        .save(&config.output)
        .map_err(|e| MandelError::Output(e.to_string()))
}

fn run(config: &RenderConfig) -> Result<(), MandelError> {
    let engine = Engine::new(config.strategy).threads(config.threads);
    let frame = engine.render(config.width, config.height, &config.viewport, config.run_count)?;
    println!(
        "Compute time: {:.3} sec (Runs: {})",
        frame.elapsed, config.run_count
    );

    if config.graphics {
        let pixels = paint(&frame.buffer);
        write_image(config, pixels)?;
        tracing::info!(output = %config.output.display(), "image written");
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let matches = args();
    let config = config(&matches);
    tracing::debug!(?config, "starting");

    if let Err(e) = run(&config) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
