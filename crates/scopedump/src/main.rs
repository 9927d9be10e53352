//! CLI entry point for the scopedump binary.
//!
//! Works on saved material rather than a live bus: a control/status word or a
//! raw capture buffer dumped to a text file (one hex word per line), decoded
//! into a listing or a VCD document.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use scope_core::{
    expand_compressed, print_compressed, print_uncompressed, StatusWord, VcdWriter,
    WaveformSource,
};
#[cfg(test)]
use tempfile as _;

const USAGE_TEXT: &str = "\
Usage: scopedump <command> [options]

Commands:
  status <hexword>            Decode a control/status register word
  print  <capture> [options]  Textual listing of a saved capture buffer
  vcd    <capture> [options]  Render a saved capture buffer to VCD

Options (print, vcd):
  -z, --compressed            Buffer uses run-length compression
Options (vcd):
  -o, --output <file>         Output path (default: input stem + .vcd)
  -c, --clock-hz <hz>         Capture clock in Hz (default: 100000000)
  -t, --trace <name:bits:shift>
                              Declare a trace field (repeatable)
  -d, --holdoff <n>           Holdoff for uncompressed trigger alignment
  -h, --help                  Show this help message

Capture files hold one hex word per line; blank lines and lines starting
with '#' are ignored.

Examples:
  scopedump status 0x60300002
  scopedump print capture.hex --compressed
  scopedump vcd capture.hex -z -t cs_n:1:31 -t value:24:0 -o capture.vcd
";

const DEFAULT_CLOCK_HZ: u64 = 100_000_000;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Status(u32),
    Print(PrintArgs),
    Vcd(VcdArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct PrintArgs {
    input: PathBuf,
    compressed: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct VcdArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    compressed: bool,
    clock_hz: u64,
    holdoff: Option<u32>,
    traces: Vec<TraceSpec>,
}

#[derive(Debug, PartialEq, Eq)]
struct TraceSpec {
    name: String,
    bits: u32,
    shift: u32,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "status" => parse_status_args(args)
            .map(Command::Status)
            .map(ParseResult::Command),
        "print" => parse_print_args(args)
            .map(Command::Print)
            .map(ParseResult::Command),
        "vcd" => parse_vcd_args(args)
            .map(Command::Vcd)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

fn parse_status_args(mut args: impl Iterator<Item = OsString>) -> Result<u32, String> {
    let word = args.next().ok_or_else(|| "missing status word".to_string())?;
    if args.next().is_some() {
        return Err("unexpected extra argument".to_string());
    }
    parse_hex_word(word.to_string_lossy().trim())
}

fn parse_print_args(args: impl Iterator<Item = OsString>) -> Result<PrintArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut compressed = false;

    for arg in args {
        match arg.to_string_lossy().as_ref() {
            "-z" | "--compressed" => compressed = true,
            other if other.starts_with('-') => return Err(format!("unknown option: {other}")),
            _ if input.is_some() => return Err("unexpected extra argument".to_string()),
            _ => input = Some(PathBuf::from(arg)),
        }
    }

    Ok(PrintArgs {
        input: input.ok_or_else(|| "missing capture file".to_string())?,
        compressed,
    })
}

#[allow(clippy::while_let_on_iterator)]
fn parse_vcd_args(mut args: impl Iterator<Item = OsString>) -> Result<VcdArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut compressed = false;
    let mut clock_hz = DEFAULT_CLOCK_HZ;
    let mut holdoff = None;
    let mut traces = Vec::new();

    while let Some(arg) = args.next() {
        match arg.to_string_lossy().as_ref() {
            "-z" | "--compressed" => compressed = true,
            "-o" | "--output" => {
                let value = args.next().ok_or_else(|| "missing output path".to_string())?;
                output = Some(PathBuf::from(value));
            }
            "-c" | "--clock-hz" => {
                let value = args.next().ok_or_else(|| "missing clock rate".to_string())?;
                clock_hz = value
                    .to_string_lossy()
                    .parse::<u64>()
                    .map_err(|_| "clock rate must be a positive integer".to_string())?;
                if clock_hz == 0 {
                    return Err("clock rate must be a positive integer".to_string());
                }
            }
            "-d" | "--holdoff" => {
                let value = args.next().ok_or_else(|| "missing holdoff".to_string())?;
                let parsed = value
                    .to_string_lossy()
                    .parse::<u32>()
                    .map_err(|_| "holdoff must be an unsigned integer".to_string())?;
                holdoff = Some(parsed);
            }
            "-t" | "--trace" => {
                let value = args.next().ok_or_else(|| "missing trace spec".to_string())?;
                traces.push(parse_trace_spec(value.to_string_lossy().as_ref())?);
            }
            other if other.starts_with('-') => return Err(format!("unknown option: {other}")),
            _ if input.is_some() => return Err("unexpected extra argument".to_string()),
            _ => input = Some(PathBuf::from(arg)),
        }
    }

    Ok(VcdArgs {
        input: input.ok_or_else(|| "missing capture file".to_string())?,
        output,
        compressed,
        clock_hz,
        holdoff,
        traces,
    })
}

fn parse_trace_spec(spec: &str) -> Result<TraceSpec, String> {
    let mut parts = spec.split(':');
    let name = parts
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| format!("bad trace spec: {spec}"))?;
    let bits = parts
        .next()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|&bits| (1..=32).contains(&bits))
        .ok_or_else(|| format!("bad trace spec: {spec}"))?;
    let shift = parts
        .next()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|&shift| shift < 32)
        .ok_or_else(|| format!("bad trace spec: {spec}"))?;
    if parts.next().is_some() {
        return Err(format!("bad trace spec: {spec}"));
    }
    Ok(TraceSpec {
        name: name.to_string(),
        bits,
        shift,
    })
}

fn parse_hex_word(text: &str) -> Result<u32, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    u32::from_str_radix(&cleaned, 16).map_err(|_| format!("bad hex word: {text}"))
}

/// Reads a capture file: one hex word per line, '#' comments allowed.
fn read_capture_file(path: &Path) -> Result<Vec<u32>, String> {
    let text =
        fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let mut words = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let word = parse_hex_word(line)
            .map_err(|e| format!("{}:{}: {e}", path.display(), number + 1))?;
        words.push(word);
    }
    Ok(words)
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn run_status(word: u32) -> Result<(), String> {
    let status = StatusWord(word);
    let snap = status.snapshot();

    println!("\t31. RESET:\t{}", if snap.reset_ongoing { "Ongoing" } else { "Complete" });
    println!("\t30. STOPPED:\t{}", yes_no(snap.stopped));
    println!("\t29. TRIGGERED:\t{}", yes_no(snap.triggered));
    println!("\t28. PRIMED:\t{}", yes_no(snap.primed));
    println!("\t27. MANUAL:\t{}", yes_no(snap.manual));
    println!("\t26. DISABLED:\t{}", yes_no(snap.disabled));
    println!("\t25. ZERO:\t{}", yes_no(snap.zero_flag));
    println!("\tLENGTH:\t\t{} words", snap.buffer_length);
    println!("\tHOLDOFF:\t{}", snap.holdoff);
    if snap.buffer_length == 0 {
        println!("\tNo instrument present at this address.");
    } else if let Some(trigger) =
        (snap.buffer_length as u64 - 1).checked_sub(u64::from(snap.holdoff))
    {
        println!("\tTRIGGER:\tsample {trigger}");
    }
    Ok(())
}

fn run_print(args: &PrintArgs) -> Result<(), String> {
    let words = read_capture_file(&args.input)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let no_decode = |_: &mut dyn Write, _: u32| -> io::Result<()> { Ok(()) };

    if args.compressed {
        let records = expand_compressed(&words).map_err(|e| e.to_string())?;
        print_compressed(&mut out, &records, &no_decode).map_err(|e| e.to_string())
    } else {
        print_uncompressed(&mut out, &words, &no_decode).map_err(|e| e.to_string())
    }
}

fn run_vcd(args: &VcdArgs) -> Result<(), String> {
    let words = read_capture_file(&args.input)?;

    let mut writer = VcdWriter::new(args.clock_hz);
    for spec in &args.traces {
        writer
            .register_trace(spec.name.clone(), spec.bits, spec.shift)
            .map_err(|e| e.to_string())?;
    }

    let mut document = Vec::new();
    if args.compressed {
        let records = expand_compressed(&words).map_err(|e| e.to_string())?;
        let trigger = records
            .iter()
            .find(|record| record.is_trigger)
            .map(|record| record.logical_address);
        writer
            .emit(WaveformSource::Compressed(&records), trigger, &mut document)
            .map_err(|e| e.to_string())?;
    } else {
        let trigger = args.holdoff.and_then(|holdoff| {
            (words.len() as u64)
                .checked_sub(1)
                .and_then(|last| last.checked_sub(u64::from(holdoff)))
        });
        writer
            .emit(WaveformSource::Uncompressed(&words), trigger, &mut document)
            .map_err(|e| e.to_string())?;
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("vcd"));
    fs::write(&output, document).map_err(|e| format!("cannot write {}: {e}", output.display()))?;
    eprintln!("wrote {} ({} words)", output.display(), words.len());
    Ok(())
}

fn main() {
    let result = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            print!("{USAGE_TEXT}");
            return;
        }
        Ok(ParseResult::Command(Command::Status(word))) => run_status(word),
        Ok(ParseResult::Command(Command::Print(args))) => run_print(&args),
        Ok(ParseResult::Command(Command::Vcd(args))) => run_vcd(&args),
        Err(message) => {
            eprintln!("error: {message}");
            eprint!("{USAGE_TEXT}");
            std::process::exit(2);
        }
    };

    if let Err(message) = result {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::{
        parse_args, parse_hex_word, parse_trace_spec, Command, ParseResult, TraceSpec,
        DEFAULT_CLOCK_HZ,
    };

    fn args(list: &[&str]) -> impl Iterator<Item = OsString> {
        list.iter()
            .map(OsString::from)
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn status_command_parses_hex_words() {
        let parsed = parse_args(args(&["status", "0x60300002"])).unwrap();
        assert!(matches!(
            parsed,
            ParseResult::Command(Command::Status(0x6030_0002))
        ));

        let parsed = parse_args(args(&["status", "60300002"])).unwrap();
        assert!(matches!(
            parsed,
            ParseResult::Command(Command::Status(0x6030_0002))
        ));
    }

    #[test]
    fn vcd_command_collects_every_option() {
        let parsed = parse_args(args(&[
            "vcd",
            "capture.hex",
            "-z",
            "-c",
            "25000000",
            "-t",
            "cs_n:1:31",
            "-t",
            "value:24:0",
            "-o",
            "out.vcd",
        ]))
        .unwrap();

        let ParseResult::Command(Command::Vcd(vcd)) = parsed else {
            panic!("expected vcd command");
        };
        assert_eq!(vcd.input.to_str(), Some("capture.hex"));
        assert_eq!(vcd.output.as_deref().and_then(|p| p.to_str()), Some("out.vcd"));
        assert!(vcd.compressed);
        assert_eq!(vcd.clock_hz, 25_000_000);
        assert_eq!(
            vcd.traces,
            vec![
                TraceSpec {
                    name: "cs_n".to_string(),
                    bits: 1,
                    shift: 31,
                },
                TraceSpec {
                    name: "value".to_string(),
                    bits: 24,
                    shift: 0,
                },
            ]
        );
    }

    #[test]
    fn vcd_defaults_apply_without_options() {
        let parsed = parse_args(args(&["vcd", "capture.hex"])).unwrap();
        let ParseResult::Command(Command::Vcd(vcd)) = parsed else {
            panic!("expected vcd command");
        };
        assert!(!vcd.compressed);
        assert_eq!(vcd.clock_hz, DEFAULT_CLOCK_HZ);
        assert!(vcd.output.is_none());
        assert!(vcd.traces.is_empty());
    }

    #[test]
    fn malformed_trace_specs_are_rejected() {
        assert!(parse_trace_spec("name:1:0").is_ok());
        assert!(parse_trace_spec("name").is_err());
        assert!(parse_trace_spec("name:0:0").is_err());
        assert!(parse_trace_spec("name:33:0").is_err());
        assert!(parse_trace_spec("name:1:32").is_err());
        assert!(parse_trace_spec(":1:0").is_err());
        assert!(parse_trace_spec("name:1:0:extra").is_err());
    }

    #[test]
    fn hex_words_accept_prefixes_and_separators() {
        assert_eq!(parse_hex_word("0xDEAD_BEEF"), Ok(0xDEAD_BEEF));
        assert_eq!(parse_hex_word("deadbeef"), Ok(0xDEAD_BEEF));
        assert!(parse_hex_word("not-hex").is_err());
        assert!(parse_hex_word("1_0000_0000").is_err());
    }

    #[test]
    fn unknown_commands_and_options_are_rejected() {
        assert!(parse_args(args(&["frobnicate"])).is_err());
        assert!(parse_args(args(&["print", "capture.hex", "--wat"])).is_err());
        assert!(parse_args(args(&["vcd"])).is_err());
    }
}
