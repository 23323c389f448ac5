//! Command-line front end for the TM11 emulation.  It can build and
//! list SIMH-format tape images, and read them back through the
//! emulated controller exactly as a PDP-11 driver would.
use std::error::Error;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{event, Level};
use tracing_subscriber::prelude::*;

use tm11::{
    ControllerConfiguration, ControllerStatus, MemoryConfiguration, Ram, StatusRegister, TapeEntry,
    TapeImage, TapeImageBuilder, TapeLibrary, Tm11, UnitNumber,
};
use unibus::Address;

mod driver;
mod report;

use driver::{ReadOutcome, TapeDriver};
use report::{describe_errors, Reporter};

/// Host address of the buffer records are read into.
const BUFFER_ADDRESS: u16 = 0o1000;

#[derive(Debug)]
struct Fail(String);

impl Display for Fail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Error for Fail {}

/// Emulate a DEC TM11 magnetic tape controller
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a tape image.  Each input file becomes one tape file,
    /// followed by a tape mark; the tape ends with a second tape mark.
    Mktape {
        /// File to which the tape image is written
        #[clap(short = 'o', long)]
        output: PathBuf,

        /// Largest record to write, in bytes
        #[clap(long, default_value_t = 512)]
        block_size: usize,

        /// Finish the image with an end-of-medium marker
        #[clap(long)]
        end_of_medium: bool,

        /// Files to put on the tape
        inputs: Vec<PathBuf>,
    },

    /// List the records and tape marks in a tape image, without
    /// using the controller.
    List {
        image: PathBuf,

        /// Print JSON instead of text
        #[clap(long)]
        json: bool,
    },

    /// Read every record of a tape through the emulated controller.
    Dump {
        /// Tape image to mount on the selected unit
        #[clap(long, conflicts_with = "directory")]
        tape: Option<PathBuf>,

        /// Directory containing images named tm0.tap to tm3.tap
        #[clap(long)]
        directory: Option<PathBuf>,

        /// Unit to read (0-3)
        #[clap(long, default_value_t = 0)]
        unit: u8,

        /// Size of the read buffer in bytes
        #[clap(long, default_value_t = 0o77776)]
        buffer_size: u16,

        /// Space forward over this many records before reading
        #[clap(long, default_value_t = 0)]
        skip: u16,

        /// Write the data of each tape file to this directory, as
        /// file0.bin, file1.bin and so on
        #[clap(long)]
        extract: Option<PathBuf>,

        /// Print JSON instead of text
        #[clap(long)]
        json: bool,
    },

    /// Show the controller's registers as they are after power-up.
    Status {
        /// Print JSON instead of text
        #[clap(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum DumpItem {
    Record {
        file: usize,
        length: usize,
        truncated: bool,
    },
    TapeMark,
    EndOfTape,
    Error {
        mts: u16,
        description: String,
    },
}

#[derive(Debug, Serialize)]
struct DumpReport {
    items: Vec<DumpItem>,
    controller: ControllerStatus,
}

fn make_tape(
    output: &Path,
    block_size: usize,
    end_of_medium: bool,
    inputs: &[PathBuf],
) -> Result<(), Box<dyn Error>> {
    if block_size == 0 || block_size > usize::from(u16::MAX) {
        return Err(Box::new(Fail(format!(
            "block size {block_size} is not between 1 and {}",
            u16::MAX
        ))));
    }
    let mut builder = TapeImageBuilder::new();
    for input in inputs {
        let data = fs::read(input)
            .map_err(|e| Fail(format!("failed to read {}: {e}", input.display())))?;
        event!(
            Level::INFO,
            "adding {} ({} bytes) as tape file",
            input.display(),
            data.len()
        );
        builder = builder.file(&data, block_size)?;
    }
    builder = builder.tape_mark();
    if end_of_medium {
        builder = builder.end_of_medium();
    }
    let image = builder.build();
    image.save(output)?;
    event!(
        Level::INFO,
        "wrote {} bytes of tape image to {}",
        image.len(),
        output.display()
    );
    Ok(())
}

fn list_tape(path: &Path, json: bool) -> Result<(), Box<dyn Error>> {
    let image = TapeImage::load(path)?;
    let entries: Vec<TapeEntry> = image.entries()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        let mut reporter = Reporter::new();
        for entry in entries.iter() {
            reporter.entry(entry, image.record_data(entry.position()))?;
        }
    }
    Ok(())
}

fn report_error(
    items: &mut Vec<DumpItem>,
    reporter: Option<&mut Reporter>,
    status: &StatusRegister,
) -> Result<(), Box<dyn Error>> {
    if let Some(r) = reporter {
        r.failure(status)?;
    }
    items.push(DumpItem::Error {
        mts: status.bits(),
        description: describe_errors(status),
    });
    Ok(())
}

fn dump_tape(
    tape: Option<&Path>,
    directory: Option<&Path>,
    unit: u8,
    buffer_size: u16,
    skip: u16,
    extract: Option<&Path>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let unit = UnitNumber::try_from(unit)?;
    let mut library = TapeLibrary::new();
    match (tape, directory) {
        (Some(path), _) => {
            library.mount_on(unit, TapeImage::load(path)?);
        }
        (None, Some(dir)) => {
            let loaded = library.load_directory(dir)?;
            if loaded.is_empty() {
                event!(
                    Level::WARN,
                    "no tape images found in {}",
                    dir.display()
                );
            }
        }
        (None, None) => {
            return Err(Box::new(Fail(
                "specify a tape image with --tape or a directory of them with --directory"
                    .to_string(),
            )));
        }
    }
    if let Some(dir) = extract {
        fs::create_dir_all(dir)
            .map_err(|e| Fail(format!("failed to create {}: {e}", dir.display())))?;
    }

    let memory = Ram::new(&MemoryConfiguration::default());
    let buffer = Address::from(BUFFER_ADDRESS);
    if memory.slice(buffer, usize::from(buffer_size)).is_none() {
        return Err(Box::new(Fail(format!(
            "a buffer of {buffer_size} bytes does not fit in host memory"
        ))));
    }
    let mut driver = TapeDriver::with_library(
        ControllerConfiguration::default(),
        library,
        memory,
        unit,
    );
    let mut reporter = if json { None } else { Some(Reporter::new()) };
    let mut items: Vec<DumpItem> = Vec::new();

    let mut status = driver.rewind()?;
    if skip > 0 && !status.any_error() {
        status = driver.space_forward(skip)?;
        if status.end_of_file {
            // Spacing stops at a tape mark.
            event!(Level::WARN, "a tape mark was reached before skipping {skip} records");
        }
    }
    if status.any_error() && !status.end_of_file {
        report_error(&mut items, reporter.as_mut(), &status)?;
        return finish_dump(&driver, reporter, items);
    }

    let mut file_number: usize = 0;
    let mut file_data: Vec<u8> = Vec::new();
    let mut previous_was_mark = false;
    let mut records: usize = 0;
    loop {
        match driver.read_record(buffer, buffer_size)? {
            ReadOutcome::Record { data, truncated } => {
                records += 1;
                previous_was_mark = false;
                if let Some(r) = reporter.as_mut() {
                    r.record(records, &data, truncated)?;
                }
                items.push(DumpItem::Record {
                    file: file_number,
                    length: data.len(),
                    truncated,
                });
                file_data.extend_from_slice(&data);
            }
            ReadOutcome::TapeMark => {
                if let Some(r) = reporter.as_mut() {
                    r.tape_mark()?;
                }
                items.push(DumpItem::TapeMark);
                if previous_was_mark {
                    // Two tape marks in a row: the logical end of the
                    // tape.
                    break;
                }
                if let Some(dir) = extract {
                    let path = dir.join(format!("file{file_number}.bin"));
                    fs::write(&path, &file_data)
                        .map_err(|e| Fail(format!("failed to write {}: {e}", path.display())))?;
                }
                file_data.clear();
                file_number += 1;
                previous_was_mark = true;
            }
            ReadOutcome::EndOfTape => {
                if let Some(r) = reporter.as_mut() {
                    r.end_of_tape()?;
                }
                items.push(DumpItem::EndOfTape);
                break;
            }
            ReadOutcome::Failed(status) => {
                report_error(&mut items, reporter.as_mut(), &status)?;
                break;
            }
        }
    }
    event!(
        Level::INFO,
        "read {records} records in {file_number} files at simulated time {:?}",
        driver.machine().now()
    );

    finish_dump(&driver, reporter, items)
}

fn finish_dump(
    driver: &TapeDriver,
    reporter: Option<Reporter>,
    items: Vec<DumpItem>,
) -> Result<(), Box<dyn Error>> {
    let controller = driver.machine().controller().status();
    match reporter {
        Some(mut r) => r.controller_status(&controller)?,
        None => {
            let report = DumpReport { items, controller };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn show_status(json: bool) -> Result<(), Box<dyn Error>> {
    let controller = Tm11::new(ControllerConfiguration::default());
    let status = controller.status();
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        Reporter::new().controller_status(&status)?;
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // See
    // https://docs.rs/tracing-subscriber/0.3/tracing_subscriber/fmt/index.html#filtering-events-with-environment-variables
    // for instructions on how to select which trace messages get
    // printed.  They go to stderr so as not to mix with the output.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            return Err(Box::new(e));
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    match cli.command {
        Command::Mktape {
            output,
            block_size,
            end_of_medium,
            inputs,
        } => make_tape(&output, block_size, end_of_medium, &inputs),
        Command::List { image, json } => list_tape(&image, json),
        Command::Dump {
            tape,
            directory,
            unit,
            buffer_size,
            skip,
            extract,
            json,
        } => dump_tape(
            tape.as_deref(),
            directory.as_deref(),
            unit,
            buffer_size,
            skip,
            extract.as_deref(),
            json,
        ),
        Command::Status { json } => show_status(json),
    }
}

fn main() {
    match run() {
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_inputs(dir: &Path) -> Vec<PathBuf> {
        let first = dir.join("first.txt");
        let second = dir.join("second.bin");
        fs::write(&first, b"a file which spans several records").expect("writable temp dir");
        fs::write(&second, [0o377_u8; 9]).expect("writable temp dir");
        vec![first, second]
    }

    #[test]
    fn test_mktape_writes_one_tape_file_per_input() {
        let dir = tempfile::tempdir().expect("should be able to create a temporary directory");
        let inputs = write_inputs(dir.path());
        let output = dir.path().join("out.tap");
        make_tape(&output, 16, false, &inputs).expect("tape should be written");

        let image = TapeImage::load(&output).expect("tape should load");
        let entries = image.entries().expect("image should be well formed");
        let lengths: Vec<Option<usize>> = entries
            .iter()
            .map(|entry| match entry {
                TapeEntry::Record { length, .. } => Some(*length as usize),
                TapeEntry::TapeMark { .. } | TapeEntry::EndOfMedium { .. } => None,
            })
            .collect();
        assert_eq!(
            lengths,
            vec![Some(16), Some(16), Some(2), None, Some(9), None, None]
        );
    }

    #[test]
    fn test_list_shows_every_entry() {
        let dir = tempfile::tempdir().expect("should be able to create a temporary directory");
        let inputs = write_inputs(dir.path());
        let output = dir.path().join("out.tap");
        make_tape(&output, 16, true, &inputs).expect("tape should be written");
        list_tape(&output, false).expect("listing should work");
        list_tape(&output, true).expect("listing should work");
    }

    #[test]
    fn test_mktape_rejects_zero_block_size() {
        let dir = tempfile::tempdir().expect("should be able to create a temporary directory");
        let inputs = write_inputs(dir.path());
        assert!(make_tape(&dir.path().join("out.tap"), 0, false, &inputs).is_err());
    }

    #[test]
    fn test_dump_extracts_tape_files() {
        let dir = tempfile::tempdir().expect("should be able to create a temporary directory");
        let inputs = write_inputs(dir.path());
        let tape = dir.path().join("tm0.tap");
        make_tape(&tape, 10, true, &inputs).expect("tape should be written");

        let extracted = dir.path().join("extracted");
        dump_tape(Some(&tape), None, 0, 512, 0, Some(&extracted), true).expect("dump should work");
        for (n, input) in inputs.iter().enumerate() {
            let original = fs::read(input).expect("input is readable");
            let copy =
                fs::read(extracted.join(format!("file{n}.bin"))).expect("file was extracted");
            assert_eq!(copy, original);
        }
    }

    #[test]
    fn test_dump_skips_records() {
        let dir = tempfile::tempdir().expect("should be able to create a temporary directory");
        let inputs = write_inputs(dir.path());
        let tape = dir.path().join("tm0.tap");
        make_tape(&tape, 10, false, &inputs).expect("tape should be written");

        let extracted = dir.path().join("extracted");
        dump_tape(Some(&tape), None, 0, 512, 1, Some(&extracted), true).expect("dump should work");
        let original = fs::read(&inputs[0]).expect("input is readable");
        let copy = fs::read(extracted.join("file0.bin")).expect("file was extracted");
        assert_eq!(copy, &original[10..]);
    }

    #[test]
    fn test_dump_needs_a_tape() {
        assert!(dump_tape(None, None, 0, 512, 0, None, true).is_err());
    }
}
