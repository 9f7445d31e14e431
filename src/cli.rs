use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// File name used when `--output` is not given, relative to the working directory.
pub const DEFAULT_OUTPUT: &str = "output.md";

pub const BRANCH_PROMPT: &str = "Branch name to sync: ";
pub const PATH_PROMPT: &str =
    "Directory to export (e.g. `src/`, `/home/me/project` or `../other`): ";

pub struct Config {
    pub branch: String,
    pub target_dir: PathBuf,
    pub output_path: PathBuf,
    pub work_dir: PathBuf,
    pub verbosity: u8,
}

pub fn command() -> Command {
    Command::new("tree2md")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Syncs the current git working copy and exports a directory into a single .md file")
        .arg(
            Arg::new("branch")
                .short('b')
                .long("branch")
                .value_name("BRANCH")
                .help("Branch to fetch and pull (prompted for when omitted)")
                .num_args(1),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .value_name("DIR")
                .help("Directory to export (prompted for when omitted)")
                .num_args(1),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Sets the output .md file path")
                .num_args(1),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count),
        )
}

/// Parses the command line, prompting on stdin for anything not given as a flag.
pub fn parse_args() -> Result<Config> {
    let matches = command().get_matches();
    let work_dir = std::env::current_dir().context("Failed to read current directory")?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    config_from_matches(&matches, work_dir, &mut input, &mut output)
}

pub fn config_from_matches<R: BufRead, W: Write>(
    matches: &ArgMatches,
    work_dir: PathBuf,
    input: &mut R,
    output: &mut W,
) -> Result<Config> {
    let branch = match matches.get_one::<String>("branch") {
        Some(branch) => branch.clone(),
        None => prompt(input, output, BRANCH_PROMPT)?,
    };

    let target_dir = match matches.get_one::<String>("path") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(prompt(input, output, PATH_PROMPT)?),
    };

    let output_path = matches
        .get_one::<String>("output")
        .map(|o| work_dir.join(o))
        .unwrap_or_else(|| work_dir.join(DEFAULT_OUTPUT));

    Ok(Config {
        branch,
        target_dir,
        output_path,
        work_dir,
        verbosity: matches.get_count("verbose"),
    })
}

/// Writes `message` and reads one line of input. Only the line terminator is
/// stripped; surrounding whitespace is kept.
pub fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, message: &str) -> Result<String> {
    write!(output, "{message}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("Input closed while waiting for: {}", message.trim_end());
    }

    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(line)
}
