// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code. More specific options for `ambiguity`
//! subcommands are contained in modules.
//!
//! All booleans must have `#[serde(default)]` annotated, and anything that
//! isn't a boolean must be optional. This allows all arguments to be optional
//! *and* usable in an arguments file.
//!
//! Only 3 things should be public in this module: `Ambiguity`,
//! `Ambiguity::run`, and `AmbiguityError`.

mod common;
mod error;
mod operators;
mod resolve;

pub use error::AmbiguityError;

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use clap::{AppSettings, Args, Parser, Subcommand};
use log::{info, warn};

use crate::PROGRESS_BARS;

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = r#"Resolve the indexing ambiguity of serial crystallography datasets.
Each XDS_ASCII file is assigned a reindexing operator that puts it into a
common indexing frame; reindexed copies are written next to the originals."#
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_subcommands = true)]
#[clap(propagate_version = true)]
#[clap(infer_long_args = true)]
pub struct Ambiguity {
    #[clap(flatten)]
    global_opts: GlobalArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Don't draw progress bars.
    #[clap(long)]
    #[clap(global = true)]
    no_progress_bars: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    #[clap(global = true)]
    verbosity: u8,

    /// Only verify that arguments were correctly ingested, determine the
    /// operators and print out high-level information. No files are written.
    #[clap(long)]
    #[clap(global = true)]
    dry_run: bool,

    /// Save the input arguments into a new TOML file that can be used to
    /// reproduce this run.
    #[clap(long)]
    #[clap(global = true)]
    save_toml: Option<PathBuf>,

    /// Also write all log messages to this file.
    #[clap(long, parse(from_os_str))]
    #[clap(global = true)]
    logfile: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
#[clap(arg_required_else_help = true)]
enum Command {
    #[clap(alias = "reindex")]
    #[clap(
        about = "Find a reindexing operator for each dataset in a file list and write reindexed files."
    )]
    Resolve(resolve::ResolveArgs),

    #[clap(about = "Print the candidate reindexing operators for the symmetry of an XDS_ASCII file.")]
    Operators(operators::OperatorsArgs),
}

impl Ambiguity {
    pub fn run(self) -> Result<(), AmbiguityError> {
        // Set up logging.
        let GlobalArgs {
            verbosity,
            dry_run,
            no_progress_bars,
            save_toml,
            logfile,
        } = self.global_opts;
        // A dry run doesn't write anything, the log file included.
        let wants_logfile = logfile.is_some();
        let logfile = logfile.filter(|_| !dry_run);
        setup_logging(verbosity, logfile.as_deref())?;
        // Enable progress bars if the user didn't say "no progress bars".
        if !no_progress_bars {
            PROGRESS_BARS.store(true);
        }

        // Print the version of ambiguity and its build-time information.
        let sub_command = match &self.command {
            Command::Resolve(_) => "resolve",
            Command::Operators(_) => "operators",
        };
        info!("ambiguity {} {}", sub_command, env!("CARGO_PKG_VERSION"));
        display_build_info();
        if dry_run && wants_logfile {
            warn!("Not writing a log file on a dry run");
        }

        macro_rules! merge_save_run {
            ($args:expr) => {{
                let args = $args.merge()?;
                if let Some(toml) = save_toml {
                    use std::io::BufWriter;

                    let mut f = BufWriter::new(File::create(toml)?);
                    let toml_str = toml::to_string(&args).map_err(|e| {
                        AmbiguityError::ArgFile(format!("Couldn't serialise arguments: {e}"))
                    })?;
                    f.write_all(toml_str.as_bytes())?;
                }
                args.run(dry_run)?;
            }};
        }

        match self.command {
            Command::Resolve(args) => {
                merge_save_run!(args)
            }

            // Misc. utilities.
            Command::Operators(args) => args.run()?,
        }

        info!("ambiguity {} complete.", sub_command);
        Ok(())
    }
}

/// Writes everything to stdout as well as a file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        std::io::stdout().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stdout().flush()?;
        self.file.flush()
    }
}

/// Activate a logger. All log messages are put onto `stdout`. `env_logger`
/// automatically only uses colours and fancy symbols if we're on a tty (e.g. a
/// terminal); piped output will be formatted sensibly. Source code lines are
/// displayed in log messages when verbosity >= 3.
///
/// If a log file is given, messages are also written there, without colours.
fn setup_logging(verbosity: u8, logfile: Option<&Path>) -> Result<(), AmbiguityError> {
    let mut builder = env_logger::Builder::from_default_env();
    match logfile {
        Some(logfile) => {
            let file = File::create(logfile).map_err(|e| {
                AmbiguityError::Generic(format!(
                    "Couldn't create log file {}: {e}",
                    logfile.display()
                ))
            })?;
            builder.target(env_logger::Target::Pipe(Box::new(Tee { file })));
            builder.write_style(env_logger::WriteStyle::Never);
        }
        None => {
            builder.target(env_logger::Target::Stdout);
        }
    }
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.init();

    Ok(())
}

/// Write many info-level log lines of how this executable was compiled.
fn display_build_info() {
    let dirty = match GIT_DIRTY {
        Some(true) => " (dirty)",
        _ => "",
    };
    match GIT_COMMIT_HASH_SHORT {
        Some(hash) => {
            info!("Compiled on git commit hash: {hash}{dirty}");
        }
        None => info!("Compiled on git commit hash: <no git info>"),
    }
    if let Some(hr) = GIT_HEAD_REF {
        info!("            git head ref: {}", hr);
    }
    info!("            {}", BUILT_TIME_UTC);
    info!("         with compiler {}", RUSTC_VERSION);
    info!("");
}
