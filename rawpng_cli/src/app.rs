use std::fs;
use std::path::{Path, PathBuf};

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use lib_rawpng::checksum::adler32_of;
use lib_rawpng::compression::inflate_stored;
use lib_rawpng::constants::{FORMAT_NAME, IDAT};
use lib_rawpng::image::{read_chunks, tga};
use lib_rawpng::{ColorMode, Image};
use log::{info, LevelFilter};

use crate::filemanager::{self, companion_path, ImageHandlingError};
use crate::pattern::{self, ModeArg, Pattern};

fn output_arg() -> Arg {
    Arg::new("out")
        .short('o')
        .long("output")
        .help("File to write; the extension picks PNG or TGA")
        .value_parser(value_parser!(PathBuf))
        .required(true)
}

fn tga_arg() -> Arg {
    Arg::new("tga")
        .long("tga")
        .action(ArgAction::SetTrue)
        .help("Also dump a TGA file next to the output")
}

#[rustfmt::skip]
pub fn create_cmd_args() -> Command {
    Command::new("rawpng")
        .about("Writes uncompressed PNG files from pixel buffers")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .action(ArgAction::Count)
            .global(true)
            .help_heading("LOGGING")
            .help("Raise log verbosity (-v info, -vv debug, -vvv trace)"))
        .subcommand(Command::new("pattern")
            .about("Render a test pattern through the pixel stream")
            .arg(Arg::new("width")
                .long("width")
                .value_parser(value_parser!(u32).range(1..))
                .default_value("128"))
            .arg(Arg::new("height")
                .long("height")
                .value_parser(value_parser!(u32).range(1..))
                .default_value("128"))
            .arg(Arg::new("mode")
                .short('m')
                .long("mode")
                .value_parser(value_parser!(ModeArg))
                .default_value("rgba"))
            .arg(Arg::new("pattern")
                .short('p')
                .long("pattern")
                .value_parser(value_parser!(Pattern))
                .default_value("gradient"))
            .arg(output_arg())
            .arg(tga_arg()))
        .subcommand(Command::new("convert")
            .about("Convert a pixel snapshot (.rpxs) or a stored PNG")
            .arg(Arg::new("input")
                .help("Snapshot or PNG to read")
                .value_parser(value_parser!(PathBuf))
                .required(true))
            .arg(output_arg())
            .arg(tga_arg()))
        .subcommand(Command::new("inspect")
            .about("List the chunks of a PNG file and verify its checksums")
            .arg(Arg::new("input")
                .value_parser(value_parser!(PathBuf))
                .required(true)))
}

pub fn log_level(matches: &ArgMatches) -> LevelFilter {
    let verbosity = matches
        .subcommand()
        .map(|(_, sub)| sub.get_count("verbose"))
        .unwrap_or(0)
        .max(matches.get_count("verbose"));

    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn run(matches: &ArgMatches) -> Result<(), ImageHandlingError> {
    match matches.subcommand() {
        Some(("pattern", sub)) => run_pattern(sub),
        Some(("convert", sub)) => run_convert(sub),
        Some(("inspect", sub)) => run_inspect(sub),
        Some((other, _)) => Err(ImageHandlingError::UnknownCommand(other.to_string())),
        None => Err(ImageHandlingError::UnknownCommand(String::new())),
    }
}

fn value<'a, T>(matches: &'a ArgMatches, id: &'static str) -> Result<&'a T, ImageHandlingError>
where
    T: Clone + Send + Sync + 'static,
{
    matches
        .get_one::<T>(id)
        .ok_or(ImageHandlingError::MissingArgument(id))
}

fn required_path<'a>(matches: &'a ArgMatches, id: &'static str) -> Result<&'a Path, ImageHandlingError> {
    value::<PathBuf>(matches, id).map(PathBuf::as_path)
}

fn write_outputs(image: &Image, matches: &ArgMatches) -> Result<(), ImageHandlingError> {
    let out = required_path(matches, "out")?;
    filemanager::save_image(image, out)?;

    if matches.get_flag("tga") {
        let dump = companion_path(out, "tga");
        if dump != out {
            tga::save(image, &dump)?;
        }
    }
    Ok(())
}

fn run_pattern(matches: &ArgMatches) -> Result<(), ImageHandlingError> {
    let width = *value::<u32>(matches, "width")?;
    let height = *value::<u32>(matches, "height")?;
    let ModeArg(mode) = *value::<ModeArg>(matches, "mode")?;
    let pattern = *value::<Pattern>(matches, "pattern")?;

    let image = pattern::render(width, height, mode, pattern)?;
    write_outputs(&image, matches)?;

    println!(
        "Pattern     : {:?}\nSize        : {}x{}\nColor mode  : {}",
        pattern, width, height, mode
    );
    Ok(())
}

fn run_convert(matches: &ArgMatches) -> Result<(), ImageHandlingError> {
    let input = required_path(matches, "input")?;
    let image = filemanager::open_image(input)?;
    info!(
        "Loaded {}: {}x{} {}",
        input.display(),
        image.width(),
        image.height(),
        image.mode()
    );

    write_outputs(&image, matches)
}

fn run_inspect(matches: &ArgMatches) -> Result<(), ImageHandlingError> {
    let input = required_path(matches, "input")?;
    let bytes = fs::read(input)?;
    let chunks = read_chunks(&bytes)?;

    println!("File        : {}", input.display());
    println!("Format      : {}", FORMAT_NAME);
    println!("Size        : {} bytes", bytes.len());
    for chunk in &chunks {
        println!(
            "  {} @ {:>8}  length {:>8}  crc {:#010x} ok",
            chunk.name(),
            chunk.offset,
            chunk.data.len(),
            chunk.crc
        );
    }

    if let Some(ihdr) = chunks.first().filter(|c| c.data.len() >= 10) {
        let mode = ColorMode::from_png_tag(ihdr.data[9])
            .map(|m| m.name().to_string())
            .unwrap_or_else(|| format!("unknown ({})", ihdr.data[9]));
        println!("Color mode  : {}", mode);
    }

    let zlib: Vec<u8> = chunks
        .iter()
        .filter(|c| c.tag == IDAT)
        .flat_map(|c| c.data.iter().copied())
        .collect();
    if !zlib.is_empty() {
        let raw = inflate_stored(&zlib).map_err(lib_rawpng::DecodeError::from)?;
        println!(
            "Image data  : {} bytes inflated, adler32 {:#010x} ok",
            raw.len(),
            adler32_of(&raw)
        );
    }
    Ok(())
}
