//! CLI entry point for the microtrace REPL binary.
//!
//! Starts with the built-in demo fixture loaded at 0x0000, or with an image
//! given on the command line, then drops into the interactive loop.

use std::env;
use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

mod demo;
mod hexfile;
mod repl;
mod view;

const HELP_TEXT: &str = "Usage: microtrace [image] [--org HEX] [--hex] [--help]

  image      program image to load instead of the built-in demo
  --org HEX  load origin and initial PC (default 0000)
  --hex      treat the image as hex text instead of raw binary";

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    image: Option<PathBuf>,
    org: u16,
    hex: bool,
}

#[derive(Debug)]
enum ParseResult {
    Args(CliArgs),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut image: Option<PathBuf> = None;
    let mut org = 0u16;
    let mut hex = false;

    while let Some(arg) = args.next() {
        if arg == "--help" {
            return Ok(ParseResult::Help);
        }

        if arg == "--hex" {
            hex = true;
            continue;
        }

        if arg == "--org" {
            let value = args
                .next()
                .ok_or_else(|| String::from("missing value for --org"))?;
            let text = value.to_string_lossy();
            let digits = text.strip_prefix("0x").unwrap_or(&text);
            org = u16::from_str_radix(digits, 16)
                .map_err(|_| format!("bad --org value '{text}', expected hex"))?;
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if image.is_some() {
            return Err(String::from("multiple image paths provided"));
        }
        image = Some(PathBuf::from(arg));
    }

    Ok(ParseResult::Args(CliArgs { image, org, hex }))
}

fn run_repl(args: &CliArgs) -> io::Result<()> {
    let mut session = repl::Session::new();

    if let Some(path) = &args.image {
        let bytes = if args.hex {
            hexfile::load_hex_file(path)
        } else {
            hexfile::load_bin_file(path)
        };
        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(error) => {
                eprintln!("error: {error}");
                std::process::exit(1);
            }
        };
        if let Err(error) = session.cpu.load_program(&bytes, args.org) {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
        session.cpu.write16(microtrace_core::RESET_VECTOR, args.org);
        session.cpu.reset(args.org);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "microtrace micro-step CPU emulator")?;
    writeln!(out, "Type 'help' for commands.\n")?;
    writeln!(out, "{}", view::render_registers(&session.cpu))?;

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        write!(out, "\n> ")?;
        out.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match repl::parse_command(&line) {
            Ok(None) => {}
            Ok(Some(command)) => {
                let outcome = session.execute(command);
                if !outcome.text.is_empty() {
                    writeln!(out, "{}", outcome.text.trim_end())?;
                }
                if outcome.quit {
                    break;
                }
            }
            Err(message) => writeln!(out, "{message}")?,
        }
    }

    Ok(())
}

fn main() {
    match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => println!("{HELP_TEXT}"),
        Ok(ParseResult::Args(args)) => {
            if let Err(error) = run_repl(&args) {
                eprintln!("error: {error}");
                std::process::exit(1);
            }
        }
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{HELP_TEXT}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_args, CliArgs, ParseResult};
    use std::ffi::OsString;
    use std::path::PathBuf;

    #[test]
    fn defaults_to_demo_at_origin_zero() {
        let result = parse_args(std::iter::empty()).expect("empty args should parse");
        let ParseResult::Args(args) = result else {
            panic!("expected parsed args");
        };
        assert_eq!(
            args,
            CliArgs {
                image: None,
                org: 0x0000,
                hex: false,
            }
        );
    }

    #[test]
    fn parses_image_origin_and_hex_flag() {
        let result = parse_args(
            [
                OsString::from("counter.hex"),
                OsString::from("--org"),
                OsString::from("8000"),
                OsString::from("--hex"),
            ]
            .into_iter(),
        )
        .expect("valid args should parse");
        let ParseResult::Args(args) = result else {
            panic!("expected parsed args");
        };
        assert_eq!(
            args,
            CliArgs {
                image: Some(PathBuf::from("counter.hex")),
                org: 0x8000,
                hex: true,
            }
        );
    }

    #[test]
    fn parses_help_flag() {
        let result =
            parse_args([OsString::from("--help")].into_iter()).expect("help should parse");
        assert!(matches!(result, ParseResult::Help));
    }

    #[test]
    fn rejects_unknown_flags_and_bad_origins() {
        assert!(parse_args([OsString::from("--unknown")].into_iter()).is_err());
        assert!(parse_args(
            [OsString::from("--org"), OsString::from("zz")].into_iter()
        )
        .is_err());
        assert!(parse_args([OsString::from("--org")].into_iter()).is_err());
    }

    #[test]
    fn rejects_multiple_images() {
        let error = parse_args(
            [OsString::from("a.bin"), OsString::from("b.bin")].into_iter(),
        )
        .expect_err("two images should fail");
        assert!(error.contains("multiple image paths"));
    }
}
