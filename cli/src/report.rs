//! Human-readable output, with tape marks and errors highlighted when
//! writing to a terminal.
use std::io::{self, IsTerminal, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use tm11::{ControllerStatus, StatusRegister, TapeEntry};

/// Bytes of each record shown in a dump.
const PREVIEW_BYTES: usize = 16;

fn get_colour_choice() -> ColorChoice {
    if io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

pub struct Reporter {
    stream: StandardStream,
}

impl Reporter {
    pub fn new() -> Reporter {
        Reporter {
            stream: StandardStream::stdout(get_colour_choice()),
        }
    }

    fn highlighted(&mut self, colour: Color, text: &str) -> Result<(), io::Error> {
        self.stream
            .set_color(ColorSpec::new().set_fg(Some(colour)).set_bold(true))?;
        write!(self.stream, "{text}")?;
        self.stream.reset()
    }

    pub fn record(&mut self, number: usize, data: &[u8], truncated: bool) -> Result<(), io::Error> {
        write!(
            self.stream,
            "record {number:>5}: {:>6} bytes {}",
            data.len(),
            preview(data)
        )?;
        if truncated {
            write!(self.stream, " ")?;
            self.highlighted(Color::Yellow, "(truncated)")?;
        }
        writeln!(self.stream)
    }

    pub fn tape_mark(&mut self) -> Result<(), io::Error> {
        self.highlighted(Color::Cyan, "---- tape mark ----")?;
        writeln!(self.stream)
    }

    pub fn end_of_tape(&mut self) -> Result<(), io::Error> {
        self.highlighted(Color::Cyan, "==== end of tape ====")?;
        writeln!(self.stream)
    }

    pub fn failure(&mut self, status: &StatusRegister) -> Result<(), io::Error> {
        self.highlighted(
            Color::Red,
            &format!("error: status {:06o} ({})", status.bits(), describe_errors(status)),
        )?;
        writeln!(self.stream)
    }

    /// One item of a tape image listing.  `data` is the record's
    /// content, if the entry is a record.
    pub fn entry(&mut self, entry: &TapeEntry, data: Option<&[u8]>) -> Result<(), io::Error> {
        match entry {
            TapeEntry::Record { position, length } => writeln!(
                self.stream,
                "{position:>10}  record of {length} bytes {}",
                data.map(preview).unwrap_or_default()
            ),
            TapeEntry::TapeMark { position } => {
                write!(self.stream, "{position:>10}  ")?;
                self.highlighted(Color::Cyan, "tape mark")?;
                writeln!(self.stream)
            }
            TapeEntry::EndOfMedium { position } => {
                write!(self.stream, "{position:>10}  ")?;
                self.highlighted(Color::Cyan, "end of medium")?;
                writeln!(self.stream)
            }
        }
    }

    pub fn controller_status(&mut self, status: &ControllerStatus) -> Result<(), io::Error> {
        writeln!(self.stream, "MTS   {:06o}", status.mts)?;
        writeln!(self.stream, "MTC   {:06o}", status.mtc)?;
        writeln!(self.stream, "MTBRC {:06o}", status.mtbrc)?;
        writeln!(self.stream, "MTCMA {:06o}", status.mtcma)?;
        let errors = describe_errors(&status.status);
        if !errors.is_empty() {
            self.highlighted(Color::Red, &format!("errors: {errors}"))?;
            writeln!(self.stream)?;
        }
        writeln!(self.stream, "selected unit: {}", status.selected_unit)?;
        for unit in status.units.iter() {
            writeln!(
                self.stream,
                "unit {}: {} at word {} ({:?})",
                unit.unit, unit.backing, unit.position, unit.activity
            )?;
        }
        Ok(())
    }
}

/// The first few bytes of `data`, in octal.
fn preview(data: &[u8]) -> String {
    let mut shown: Vec<String> = data
        .iter()
        .take(PREVIEW_BYTES)
        .map(|b| format!("{b:03o}"))
        .collect();
    if data.len() > PREVIEW_BYTES {
        shown.push("...".to_string());
    }
    shown.join(" ")
}

/// Names of the error conditions set in `status`.
pub fn describe_errors(status: &StatusRegister) -> String {
    [
        (status.illegal_command, "illegal command"),
        (status.end_of_file, "end of file"),
        (status.crc_error, "CRC error"),
        (status.parity_error, "parity error"),
        (status.bus_grant_late, "bus grant late"),
        (status.end_of_tape, "end of tape"),
        (status.record_length_error, "record length error"),
        (status.data_error, "bad tape"),
        (status.non_existent_memory, "non-existent memory"),
    ]
    .into_iter()
    .filter(|(set, _)| *set)
    .map(|(_, name)| name)
    .collect::<Vec<_>>()
    .join(", ")
}

#[test]
fn test_describe_errors() {
    let mut status = StatusRegister::power_up();
    assert_eq!(describe_errors(&status), "");
    status.data_error = true;
    status.end_of_file = true;
    assert_eq!(describe_errors(&status), "end of file, bad tape");
}

#[test]
fn test_preview() {
    assert_eq!(preview(&[]), "");
    assert_eq!(preview(&[8, 255]), "010 377");
    let long = [1_u8; PREVIEW_BYTES + 1];
    assert!(preview(&long).ends_with("001 ..."));
}
