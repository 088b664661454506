use clap::{App, Arg, ArgGroup};

use ippcode22::Metric;

/// The fully validated command line: what to run, and what statistics (if any) to record.
#[derive(Debug)]
pub enum Command {
    Help,
    Run(Config),
}

#[derive(Debug, Default)]
pub struct Config {
    pub source: Option<String>,
    pub input: Option<String>,
    pub metrics: Vec<Metric>,
    pub stats_file: Option<String>,
}

/// Builds the declarative flag schema: `--source`/`--input` as a required, jointly-satisfiable
/// group (`vex`'s own `ArgGroup::with_name("input")` does the same for its `PROGRAM`/`assembly`
/// choice), and `--insts`/`--vars`/`--hot` each declared with `.requires("stats")` so `--stats`
/// is enforced exactly when a metric flag is present — `--stats` alone, with no metric flag, is
/// left unconstrained, since it is a legitimate (if useless) combination.
pub(crate) fn build_app() -> App<'static, 'static> {
    App::new("ippcode22")
        .version(crate_version!())
        .author(crate_authors!())
        .about("Interprets an IPPcode22 XML source.")
        .arg(
            Arg::with_name("source")
                .long("source")
                .takes_value(true)
                .value_name("FILE")
                .help("XML source file (default: standard input)"),
        )
        .arg(
            Arg::with_name("input")
                .long("input")
                .takes_value(true)
                .value_name("FILE")
                .help("Input fed to READ (default: standard input)"),
        )
        .arg(
            Arg::with_name("insts")
                .long("insts")
                .requires("stats")
                .help("Report the number of executed instructions"),
        )
        .arg(
            Arg::with_name("vars")
                .long("vars")
                .requires("stats")
                .help("Report the high-water mark of initialized variables"),
        )
        .arg(
            Arg::with_name("hot")
                .long("hot")
                .requires("stats")
                .help("Report the order of the most frequently executed instruction"),
        )
        .arg(
            Arg::with_name("stats")
                .long("stats")
                .takes_value(true)
                .value_name("FILE")
                .help("Destination for the requested metrics; required with any of --insts/--vars/--hot"),
        )
        .group(
            ArgGroup::with_name("io")
                .args(&["source", "input"])
                .multiple(true)
                .required(true),
        )
}

/// Parses `argv` (not including the program name) into a [`Command`], or a human-readable
/// description of the parameter error (always exit code 10).
///
/// Everything `clap`'s declarative `App`/`Arg`/`ArgGroup` schema can express — required-one-of
/// `--source`/`--input`, `--stats` required by each metric flag, no duplicate flags, no unknown
/// flags — is left to `build_app`. `--help` must be the *sole* argument, which no flag schema
/// states directly (clap's own `--help` short-circuits unconditionally, alongside anything
/// else on the line), so that one rule is still checked by hand before the parser runs.
pub fn parse(argv: &[String]) -> Result<Command, String> {
    if argv == ["--help"] {
        return Ok(Command::Help);
    }
    if argv.iter().any(|a| a == "--help") {
        return Err("--help must be the only argument".to_string());
    }

    let full_argv = std::iter::once("ippcode22".to_string()).chain(argv.iter().cloned());
    let matches = build_app()
        .get_matches_from_safe(full_argv)
        .map_err(|e| e.message)?;

    // clap preserves each flag's own occurrence, but not cross-flag relative order; the
    // command line's order is recovered from the argv index each flag matched at.
    let mut metrics: Vec<(usize, Metric)> = Vec::new();
    if let Some(i) = matches.index_of("insts") {
        metrics.push((i, Metric::Insts));
    }
    if let Some(i) = matches.index_of("vars") {
        metrics.push((i, Metric::Vars));
    }
    if let Some(i) = matches.index_of("hot") {
        metrics.push((i, Metric::Hot));
    }
    metrics.sort_by_key(|(index, _)| *index);
    let metrics = metrics.into_iter().map(|(_, metric)| metric).collect();

    Ok(Command::Run(Config {
        source: matches.value_of("source").map(String::from),
        input: matches.value_of("input").map(String::from),
        metrics,
        stats_file: matches.value_of("stats").map(String::from),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_help_is_accepted() {
        assert!(matches!(parse(&args(&["--help"])).unwrap(), Command::Help));
    }

    #[test]
    fn help_combined_with_anything_is_an_error() {
        assert!(parse(&args(&["--help", "--source=x"])).is_err());
    }

    #[test]
    fn source_alone_is_accepted() {
        let cmd = parse(&args(&["--source=prog.xml"])).unwrap();
        match cmd {
            Command::Run(cfg) => assert_eq!(cfg.source.as_deref(), Some("prog.xml")),
            _ => panic!("expected Run"),
        }
    }

    #[test]
    fn source_and_input_in_either_order_are_accepted() {
        assert!(parse(&args(&["--source=a", "--input=b"])).is_ok());
        assert!(parse(&args(&["--input=b", "--source=a"])).is_ok());
    }

    #[test]
    fn neither_source_nor_input_is_an_error() {
        assert!(parse(&args(&[])).is_err());
    }

    #[test]
    fn metric_without_stats_file_is_an_error() {
        assert!(parse(&args(&["--source=a", "--insts"])).is_err());
    }

    #[test]
    fn metric_flags_are_stripped_before_checking_source_input_combination() {
        // After stripping --insts and --stats=out, only --source=a remains: a valid combination.
        let cmd = parse(&args(&["--source=a", "--insts", "--stats=out"])).unwrap();
        match cmd {
            Command::Run(cfg) => {
                assert_eq!(cfg.metrics, vec![Metric::Insts]);
                assert_eq!(cfg.stats_file.as_deref(), Some("out"));
            }
            _ => panic!("expected Run"),
        }
    }

    #[test]
    fn metric_order_is_preserved() {
        let cmd = parse(&args(&["--source=a", "--hot", "--insts", "--stats=out"])).unwrap();
        match cmd {
            Command::Run(cfg) => assert_eq!(cfg.metrics, vec![Metric::Hot, Metric::Insts]),
            _ => panic!("expected Run"),
        }
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(parse(&args(&["--bogus"])).is_err());
    }

    #[test]
    fn duplicate_source_is_an_error() {
        assert!(parse(&args(&["--source=a", "--source=b"])).is_err());
    }
}
