//! The `ippcode22` binary: turns a command line into a loaded [`ippcode22::Program`], runs it
//! against real files or standard streams, and translates the outcome into a process exit
//! status and an `ERROR - ` diagnostic line.
//!
//! Kept as a library so the end-to-end scenarios can drive [`run`] directly against in-memory
//! buffers instead of spawning a subprocess.

#[macro_use]
extern crate clap;

pub mod args;
pub mod error;

use std::fs;
use std::io::{self, Read, Write};

use args::{Command, Config};
use error::CliError;
use ippcode22::{Input, Program};

/// Parses `argv`, runs the program it describes, and returns the process exit code. Any
/// failure is rendered as `ERROR - <message>` on `stderr` before its exit code is returned.
pub fn run(argv: &[String], stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    match execute(argv, stdout) {
        Ok(code) => code,
        Err(err) => {
            let _ = writeln!(stderr, "ERROR - {}", err);
            err.exit_code()
        }
    }
}

fn execute(argv: &[String], stdout: &mut dyn Write) -> Result<i32, CliError> {
    match args::parse(argv).map_err(CliError::Argument)? {
        Command::Help => {
            write!(stdout, "{}", help_text())?;
            Ok(0)
        }
        Command::Run(cfg) => run_program(cfg, stdout),
    }
}

fn run_program(cfg: Config, stdout: &mut dyn Write) -> Result<i32, CliError> {
    let xml = match &cfg.source {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let (instructions, labels) = ippcode22_xml::load_from_str(&xml)?;
    let mut program = Program::new(instructions, labels);

    let outcome = if let Some(path) = &cfg.input {
        let contents = fs::read_to_string(path)?;
        let mut input: Input<&[u8]> = Input::from_file(&contents);
        program.run(&mut input, stdout)
    } else {
        let stdin = io::stdin();
        let mut input = Input::from_stdin(stdin.lock());
        program.run(&mut input, stdout)
    };

    let code = match outcome {
        Ok(()) => 0,
        Err(ippcode22::RuntimeError::Exit(code)) => code,
        Err(other) => return Err(CliError::Runtime(other)),
    };

    if let Some(stats_file) = &cfg.stats_file {
        let mut file = fs::File::create(stats_file).map_err(CliError::OutputFile)?;
        program
            .stats()
            .write_report(&cfg.metrics, &mut file)
            .map_err(CliError::OutputFile)?;
        log::debug!("wrote {} metric(s) to {}", cfg.metrics.len(), stats_file);
    }

    Ok(code)
}

/// The usage text printed for `--help`, generated from the same `clap` schema `args::parse`
/// validates everything else against, plus the one rule that schema can't state itself.
fn help_text() -> String {
    let mut buf = Vec::new();
    args::build_app()
        .write_long_help(&mut buf)
        .expect("writing help to an in-memory buffer cannot fail");
    let mut text = String::from_utf8(buf).expect("clap help text is valid UTF-8");
    text.push('\n');
    text.push_str("\n--help must be the only argument; at least one of --source or --input is required otherwise.\n");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn help_prints_usage_and_exits_zero() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run(&argv(&["--help"]), &mut out, &mut err);
        assert_eq!(code, 0);
        assert!(String::from_utf8(out).unwrap().contains("USAGE"));
        assert!(err.is_empty());
    }

    #[test]
    fn bad_arguments_exit_ten_with_error_line() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run(&argv(&[]), &mut out, &mut err);
        assert_eq!(code, 10);
        assert!(String::from_utf8(err).unwrap().starts_with("ERROR - "));
    }

    #[test]
    fn missing_source_file_is_exit_eleven() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run(&argv(&["--source=/no/such/file.xml"]), &mut out, &mut err);
        assert_eq!(code, 11);
    }
}
