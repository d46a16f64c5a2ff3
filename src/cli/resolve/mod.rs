// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.


use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::common::{read_arg_file, InfoPrinter, ARG_FILE_HELP, STRATEGIES_COMMA_SEPARATED};
use crate::{
    cli::common::{display_warnings, Warn},
    constants::{
        DEFAULT_D_MIN, DEFAULT_MAX_CYCLES, DEFAULT_MAX_DELTA, DEFAULT_NPROC,
        DEFAULT_REFERENCE_LABEL, DEFAULT_SEED,
    },
    dataset::{load_datasets, LoadOptions},
    io::{read_path_list, read_reference},
    params::ResolveParams,
    resolve::{
        BrehmDiederichs, ReferenceBased, ReindexStrategy, SelectiveBreeding, StrategyKind,
    },
    symmetry::{find_reindex_operators, OperatorList, SymmetryError},
    AmbiguityError,
};

lazy_static::lazy_static! {
    static ref STRATEGY_HELP: String =
        format!("The algorithm used to assign operators. Supported strategies: {}. Default: {}", *STRATEGIES_COMMA_SEPARATED, StrategyKind::default());

    static ref D_MIN_HELP: String =
        format!("Reflections with a higher resolution than this are not used [Å]. Default: {DEFAULT_D_MIN}");

    static ref MAX_DELTA_HELP: String =
        format!("The maximum obliquity of lattice twofold axes used to find the reindexing operators [degrees]. Default: {DEFAULT_MAX_DELTA}");

    static ref MAX_CYCLES_HELP: String =
        format!("The maximum number of selective-breeding cycles. Default: {DEFAULT_MAX_CYCLES}");

    static ref NPROC_HELP: String =
        format!("The number of threads used to correlate datasets. Default: {DEFAULT_NPROC}");

    static ref REFERENCE_LABEL_HELP: String =
        format!("The intensity item of the reference file. Its sigmas are read from SIGMA(<label>). Default: {DEFAULT_REFERENCE_LABEL}");

    static ref SEED_HELP: String =
        format!("The seed for the random starting coordinates of the brehm-diederichs embedding. Default: {DEFAULT_SEED}");
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct ResolveArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// A file listing the XDS_ASCII files to be resolved, one per line.
    /// Anything after a '#' is ignored.
    #[clap(short, long, parse(from_os_str), help_heading = "INPUT FILES")]
    pub(super) lstin: Option<PathBuf>,

    #[clap(short, long, help = STRATEGY_HELP.as_str(), help_heading = "RESOLVING")]
    pub(super) strategy: Option<String>,

    #[clap(long, help = D_MIN_HELP.as_str(), help_heading = "INPUT FILES")]
    pub(super) d_min: Option<f64>,

    /// Reflections with a smaller I/σ than this are not used. The default is
    /// to use all reflections.
    #[clap(long, help_heading = "INPUT FILES")]
    pub(super) min_ios: Option<f64>,

    #[clap(long, help = MAX_DELTA_HELP.as_str(), help_heading = "RESOLVING")]
    pub(super) max_delta: Option<f64>,

    #[clap(long, help = MAX_CYCLES_HELP.as_str(), help_heading = "RESOLVING")]
    pub(super) max_cycles: Option<usize>,

    #[clap(long, help = NPROC_HELP.as_str(), help_heading = "RESOLVING")]
    pub(super) nproc: Option<usize>,

    /// Reindex all datasets into the Niggli-reduced primitive cell (in P1)
    /// before resolving. Use this when the datasets weren't all processed in
    /// the same space group or setting.
    #[clap(long, help_heading = "RESOLVING")]
    #[serde(default)]
    pub(super) from_p1: bool,

    /// An XDS_ASCII file with reference intensities. Only used with the
    /// "reference" strategy, which is selected if no strategy is given.
    #[clap(short, long, parse(from_os_str), help_heading = "REFERENCE")]
    pub(super) reference_file: Option<PathBuf>,

    #[clap(long, help = REFERENCE_LABEL_HELP.as_str(), help_heading = "REFERENCE")]
    pub(super) reference_label: Option<String>,

    /// Use these reindexing operators instead of working them out from the
    /// lattice symmetry. Operators are separated by ';', e.g.
    /// "h,k,l;k,h,-l". The identity is always included. With --from-p1, the
    /// operators act on the indices of the reduced cell.
    #[clap(long, help_heading = "RESOLVING")]
    pub(super) operators: Option<String>,

    /// The directory to write the list of reindexed files (and their cells)
    /// into. Reindexed files themselves are written next to the originals.
    /// The default is the current directory.
    #[clap(short, long, parse(from_os_str), help_heading = "OUTPUT FILES")]
    pub(super) outdir: Option<PathBuf>,

    #[clap(long, help = SEED_HELP.as_str(), help_heading = "RESOLVING")]
    pub(super) seed: Option<u64>,
}

impl ResolveArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<ResolveArgs, AmbiguityError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let ResolveArgs {
                args_file: _,
                lstin,
                strategy,
                d_min,
                min_ios,
                max_delta,
                max_cycles,
                nproc,
                from_p1,
                reference_file,
                reference_label,
                operators,
                outdir,
                seed,
            } = read_arg_file(&arg_file)?;

            // Merge all the arguments, preferring the CLI args when available.
            Ok(ResolveArgs {
                args_file: None,
                lstin: cli_args.lstin.or(lstin),
                strategy: cli_args.strategy.or(strategy),
                d_min: cli_args.d_min.or(d_min),
                min_ios: cli_args.min_ios.or(min_ios),
                max_delta: cli_args.max_delta.or(max_delta),
                max_cycles: cli_args.max_cycles.or(max_cycles),
                nproc: cli_args.nproc.or(nproc),
                from_p1: cli_args.from_p1 || from_p1,
                reference_file: cli_args.reference_file.or(reference_file),
                reference_label: cli_args.reference_label.or(reference_label),
                operators: cli_args.operators.or(operators),
                outdir: cli_args.outdir.or(outdir),
                seed: cli_args.seed.or(seed),
            })
        } else {
            Ok(cli_args)
        }
    }

    /// Check the arguments without touching any files other than checking
    /// that they exist.
    fn validate(self) -> Result<ValidatedArgs, ResolveArgsError> {
        let Self {
            args_file: _,
            lstin,
            strategy,
            d_min,
            min_ios,
            max_delta,
            max_cycles,
            nproc,
            from_p1,
            reference_file,
            reference_label,
            operators,
            outdir,
            seed,
        } = self;

        let lstin = lstin.ok_or(ResolveArgsError::NoList)?;
        if !lstin.exists() {
            return Err(ResolveArgsError::ListDoesntExist(lstin));
        }

        let kind = match strategy {
            Some(s) => {
                StrategyKind::from_str(&s.to_lowercase()).map_err(|_| {
                    ResolveArgsError::UnknownStrategy {
                        got: s,
                        valid: STRATEGIES_COMMA_SEPARATED.as_str(),
                    }
                })?
            }
            None if reference_file.is_some() => StrategyKind::Reference,
            None => StrategyKind::default(),
        };
        let reference = match kind {
            StrategyKind::Reference => match reference_file {
                Some(file) => {
                    if !file.exists() {
                        return Err(ResolveArgsError::ReferenceDoesntExist(file));
                    }
                    Some((
                        file,
                        reference_label.unwrap_or_else(|| DEFAULT_REFERENCE_LABEL.to_string()),
                    ))
                }
                None if reference_label.is_some() => {
                    return Err(ResolveArgsError::LabelWithoutFile)
                }
                None => return Err(ResolveArgsError::NoReferenceFile),
            },
            _ => {
                if reference_file.is_some() || reference_label.is_some() {
                    return Err(ResolveArgsError::ReferenceWithOtherStrategy(kind));
                }
                None
            }
        };

        let max_cycles = max_cycles.unwrap_or(DEFAULT_MAX_CYCLES);
        if max_cycles == 0 {
            return Err(ResolveArgsError::ZeroMaxCycles);
        }
        let nproc = nproc.unwrap_or(DEFAULT_NPROC);
        if nproc == 0 {
            return Err(ResolveArgsError::ZeroNproc);
        }
        let d_min = d_min.unwrap_or(DEFAULT_D_MIN);
        if !d_min.is_finite() || d_min <= 0.0 {
            return Err(ResolveArgsError::BadDMin(d_min));
        }
        let max_delta = max_delta.unwrap_or(DEFAULT_MAX_DELTA);
        if !max_delta.is_finite() || max_delta < 0.0 {
            return Err(ResolveArgsError::BadMaxDelta(max_delta));
        }
        if let Some(min_ios) = min_ios {
            if !min_ios.is_finite() {
                return Err(ResolveArgsError::BadMinIos(min_ios));
            }
        }

        let operators = operators.as_deref().map(OperatorList::from_str).transpose()?;

        let outdir = outdir.unwrap_or_else(|| PathBuf::from("."));
        if outdir.exists() && !outdir.is_dir() {
            return Err(ResolveArgsError::OutdirNotADirectory(outdir));
        }

        // These only do something for one strategy each.
        if kind != StrategyKind::SelectiveBreeding && max_cycles != DEFAULT_MAX_CYCLES {
            format!(
                "--max-cycles is only used by the {} strategy; ignoring it",
                StrategyKind::SelectiveBreeding
            )
            .warn();
        }
        if kind != StrategyKind::BrehmDiederichs && seed.is_some() {
            format!(
                "--seed is only used by the {} strategy; ignoring it",
                StrategyKind::BrehmDiederichs
            )
            .warn();
        }

        Ok(ValidatedArgs {
            lstin,
            kind,
            reference,
            options: LoadOptions {
                d_min,
                min_ios,
                from_p1,
            },
            max_delta,
            max_cycles,
            nproc,
            operators,
            outdir,
            seed: seed.unwrap_or(DEFAULT_SEED),
        })
    }

    pub(super) fn parse(self) -> Result<ResolveParams, AmbiguityError> {
        debug!("{:#?}", self);

        // All configuration problems are found before any file is read.
        let ValidatedArgs {
            lstin,
            kind,
            reference,
            options,
            max_delta,
            max_cycles,
            nproc,
            operators,
            outdir,
            seed,
        } = self.validate()?;

        let paths = read_path_list(&lstin)?;
        let loaded = load_datasets(&paths, &options)?;
        let operators = match operators {
            Some(ops) => ops,
            None => find_reindex_operators(&loaded.symmetry, max_delta)?,
        };
        let laue_group = loaded.symmetry.laue_group()?;

        let strategy: Box<dyn ReindexStrategy> = match (kind, reference) {
            (StrategyKind::Reference, Some((file, label))) => {
                let reference = read_reference(
                    &file,
                    &label,
                    options.d_min,
                    &laue_group,
                    loaded.to_p1.as_ref(),
                )?;
                Box::new(ReferenceBased::new(reference))
            }
            // Validation makes sure that there's always a reference file for
            // the reference strategy.
            (StrategyKind::Reference, None) => {
                return Err(ResolveArgsError::NoReferenceFile.into())
            }
            (StrategyKind::SelectiveBreeding, _) => Box::new(SelectiveBreeding::new(max_cycles)),
            (StrategyKind::BrehmDiederichs, _) => Box::new(BrehmDiederichs::new(seed)),
        };

        let prefix = lstin
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "files".to_string());

        let mut printer = InfoPrinter::new("Resolving indexing ambiguity".into());
        printer.push_block(vec![
            format!("File list: {}", lstin.display()).into(),
            format!(
                "{} good dataset(s), {} ignored",
                loaded.datasets.len(),
                loaded.bad_files.len()
            )
            .into(),
            format!("Resolution limit: {} Å", options.d_min).into(),
        ]);
        let mut block = vec![format!("Representative symmetry: {}", loaded.symmetry).into()];
        if let Some(to_p1) = loaded.to_p1 {
            block.push(format!("Data reindexed into the reduced cell with {to_p1}").into());
        }
        printer.push_block(block);
        if operators.is_ambiguous() {
            let mut block = vec![format!("{} candidate operators:", operators.len()).into()];
            for (i, op) in operators.iter().enumerate() {
                block.push(format!("{i:3}: {op}").into());
            }
            printer.push_block(block);
        } else {
            printer.push_line("No indexing ambiguity; datasets will keep their indexing".into());
        }
        printer.push_line(format!("Strategy: {} with {nproc} thread(s)", strategy.name()).into());
        printer.push_line(
            format!(
                "Output lists: {}",
                outdir.join(format!("{prefix}_reindexed.lst")).display()
            )
            .into(),
        );
        printer.display();

        if !loaded.bad_files.is_empty() {
            let mut block =
                vec![format!("{} file(s) are not used:", loaded.bad_files.len()).into()];
            for bad in &loaded.bad_files {
                block.push(format!("{}: {}", bad.path.display(), bad.reason).into());
            }
            block.warn();
        }
        display_warnings();

        Ok(ResolveParams {
            loaded,
            operators,
            laue_group,
            strategy,
            nproc,
            outdir,
            prefix,
        })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), AmbiguityError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let params = self.parse()?;
        params.run(dry_run)?;
        Ok(())
    }
}

/// Arguments that have been checked, but nothing has been read yet.
#[derive(Debug)]
struct ValidatedArgs {
    lstin: PathBuf,
    kind: StrategyKind,
    /// The reference file and its intensity label.
    reference: Option<(PathBuf, String)>,
    options: LoadOptions,
    max_delta: f64,
    max_cycles: usize,
    nproc: usize,
    operators: Option<OperatorList>,
    outdir: PathBuf,
    seed: u64,
}

#[derive(thiserror::Error, Debug)]
pub(super) enum ResolveArgsError {
    #[error("No file list was supplied (--lstin)")]
    NoList,

    #[error("The file list {0} doesn't exist")]
    ListDoesntExist(PathBuf),

    #[error("Unknown strategy '{got}'; supported strategies are: {valid}")]
    UnknownStrategy { got: String, valid: &'static str },

    #[error("The reference strategy needs a reference file (--reference-file)")]
    NoReferenceFile,

    #[error("A reference file or label was given, but the {0} strategy doesn't use one")]
    ReferenceWithOtherStrategy(StrategyKind),

    #[error("A reference label was given without a reference file")]
    LabelWithoutFile,

    #[error("The reference file {0} doesn't exist")]
    ReferenceDoesntExist(PathBuf),

    #[error("The maximum number of cycles must be at least 1")]
    ZeroMaxCycles,

    #[error("The number of threads must be at least 1")]
    ZeroNproc,

    #[error("The resolution limit must be a positive number of Å, but got {0}")]
    BadDMin(f64),

    #[error("The maximum obliquity must be a non-negative number of degrees, but got {0}")]
    BadMaxDelta(f64),

    #[error("The minimum I/σ must be a finite number, but got {0}")]
    BadMinIos(f64),

    #[error("Couldn't parse --operators: {0}")]
    ParseOperators(#[from] SymmetryError),

    #[error("The output directory {0} exists but isn't a directory")]
    OutdirNotADirectory(PathBuf),
}
