//! Carbuf CLI

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use carbuf::config::{Config, Sink, TextMode};
use carbuf::storage::{write_car, CarFile};
use carbuf::{Car, CarView, Manufacturer};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("carbuf=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() {
        print_usage();
        process::exit(1);
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Carbuf v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("Usage: carbuf [--config <file>] <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  encode <input-spec> <output-file>   Encode a car described in TOML");
    eprintln!("  decode <input-file>                 Print the fields of an encoded car");
    eprintln!("  inspect <input-file>                Show buffer layout and a hex dump");
    eprintln!("  demo <dir>                          Write and read back two sample cars");
}

fn run(args: Vec<String>) -> Result<()> {
    let (config_path, args) = take_config_flag(args)?;
    let config = match config_path {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    let Some((command, rest)) = args.split_first() else {
        print_usage();
        bail!("missing command");
    };

    match (command.as_str(), rest) {
        ("encode", [input, output]) => encode(Path::new(input), Path::new(output), &config),
        ("decode", [input]) => decode(Path::new(input), &config),
        ("inspect", [input]) => inspect(Path::new(input), &config),
        ("demo", [dir]) => demo(Path::new(dir), &config),
        ("encode" | "decode" | "inspect" | "demo", _) => {
            print_usage();
            bail!("wrong number of arguments for '{command}'")
        }
        _ => bail!("Unknown command: {command}\nRun 'carbuf' for usage information."),
    }
}

/// Pull `--config <file>` out of the argument list, wherever it appears
fn take_config_flag(args: Vec<String>) -> Result<(Option<PathBuf>, Vec<String>)> {
    let mut config = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let Some(path) = iter.next() else {
                bail!("--config requires a file path");
            };
            config = Some(PathBuf::from(path));
        } else {
            rest.push(arg);
        }
    }

    Ok((config, rest))
}

fn encode(input: &Path, output: &Path, config: &Config) -> Result<()> {
    let spec = std::fs::read_to_string(input)
        .with_context(|| format!("reading input spec {}", input.display()))?;
    let car: Car =
        toml::from_str(&spec).with_context(|| format!("parsing input spec {}", input.display()))?;

    let written = write_car(output, &car, &config.encode)
        .with_context(|| format!("writing {}", output.display()))?;

    info!("Encoded {} bytes to {}", written, output.display());
    Ok(())
}

fn decode(input: &Path, config: &Config) -> Result<()> {
    let file = CarFile::open(input).with_context(|| format!("opening {}", input.display()))?;

    if config.decode.verify {
        let verified = match config.decode.text_mode {
            TextMode::Strict => carbuf::verify(file.as_bytes()),
            TextMode::Lenient => carbuf::verify_bytes(file.as_bytes()),
        };
        verified.with_context(|| format!("verifying {}", input.display()))?;
    }

    let car = match config.decode.identifier()? {
        Some(expected) => file.car_with_identifier(expected)?,
        None => file.car()?,
    };

    print_car(&car, config).with_context(|| format!("decoding {}", input.display()))
}

fn inspect(input: &Path, config: &Config) -> Result<()> {
    let file = CarFile::open(input).with_context(|| format!("opening {}", input.display()))?;
    let bytes = file.as_bytes();
    let car = file.car()?;
    let make = car.make()?;

    println!("File: {} ({} bytes)", input.display(), file.len());
    println!(
        "Root offset: {} (table at {})",
        car.table().position() - carbuf::codec::ROOT_BASE,
        car.table().position()
    );
    // bytes 4..8 only hold an identifier when the writer was configured with one
    let uses_identifier =
        config.decode.expected_identifier.is_some() || config.encode.file_identifier.is_some();
    if uses_identifier {
        if let Some(identifier) = carbuf::buffer_identifier(bytes) {
            println!(
                "File identifier: {} ({})",
                String::from_utf8_lossy(&identifier),
                hex::encode(identifier)
            );
        }
    }
    for table in [car.table(), make.table()] {
        let header = table.header();
        println!(
            "{} table at {}: vtable at {} ({} slots), {} inline bytes",
            table.name(),
            table.position(),
            table.vtable_position(),
            header.slot_count(),
            header.table_len
        );
    }

    println!();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        println!("{:08x}  {}", i * 16, hex::encode(chunk));
    }

    Ok(())
}

fn demo(dir: &Path, config: &Config) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let cars = [
        (
            "car1.bin",
            Car::new(Manufacturer::new("McCar", 22), "Nugget", 2033),
        ),
        (
            "car2.bin",
            Car::new(Manufacturer::new("Car King", 43), "Flopper", 2032),
        ),
    ];

    // write
    for (name, car) in &cars {
        let path = dir.join(name);
        let written = write_car(&path, car, &config.encode)?;
        debug!("Wrote {} ({} bytes)", path.display(), written);
    }

    // read
    for (i, (name, _)) in cars.iter().enumerate() {
        if i > 0 {
            emit(config.output.sink, "-----");
        }
        let file = CarFile::open(&dir.join(name))?;
        print_car(&file.car()?, config)?;
    }

    Ok(())
}

fn print_car(car: &CarView<'_>, config: &Config) -> Result<()> {
    let (model, name) = match config.decode.text_mode {
        TextMode::Strict => (Cow::Borrowed(car.model()?), Cow::Borrowed(car.make()?.name()?)),
        TextMode::Lenient => (
            String::from_utf8_lossy(car.model_bytes()?),
            String::from_utf8_lossy(car.make()?.name_bytes()?),
        ),
    };
    let year = car.year()?;
    let coolness = car.make()?.coolness()?;

    let sink = config.output.sink;
    emit(sink, &format!("Model: {model}"));
    emit(sink, &format!("Year: {year}"));
    emit(sink, &format!("Make: {name} ({coolness})"));
    Ok(())
}

fn emit(sink: Sink, line: &str) {
    match sink {
        Sink::Console => println!("{line}"),
        Sink::Log => info!(target: "carbuf::record", "{line}"),
    }
}
