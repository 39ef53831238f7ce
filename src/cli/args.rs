//! Defines the command-line arguments and subcommands for topexpect.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::expect::Mode;
use crate::toplevel::EvalFlags;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "topexpect",
    version,
    about = "Runs toplevel scripts and rewrites their [%%expect] blocks to match the actual output."
)]
pub struct TopexpectArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check scripts against their expectations and write corrected copies.
    Check {
        /// Scripts, or directories searched for `*.expect` scripts.
        #[arg(default_value = "tests")]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        eval: EvalArgs,
        /// Overwrite each script with its corrected output.
        #[arg(long)]
        promote: bool,
        /// Do not print a diff for changed scripts.
        #[arg(long)]
        no_diff: bool,
        /// How to report results.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Execute a script directly, ignoring its expectations.
    Run {
        /// The path to the script to run.
        #[arg(required = true)]
        file: PathBuf,
        #[command(flatten)]
        eval: EvalArgs,
    },
}

/// Evaluation options shared by all subcommands.
#[derive(Debug, Clone, Args)]
pub struct EvalArgs {
    /// Compare against the strict variant and check integer overflow.
    #[arg(long)]
    pub strict: bool,
    /// Treat warnings as errors.
    #[arg(long)]
    pub warn_error: bool,
    /// Add a directory searched by `#use`.
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub include: Vec<PathBuf>,
}

impl EvalArgs {
    pub fn mode(&self) -> Mode {
        if self.strict {
            Mode::Strict
        } else {
            Mode::Normal
        }
    }

    pub fn flags(&self) -> EvalFlags {
        EvalFlags {
            strict: self.strict,
            warn_error: self.warn_error,
            include_dirs: self.include.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_defaults() {
        let args = TopexpectArgs::parse_from(["topexpect", "check"]);
        let Command::Check {
            paths,
            eval,
            promote,
            no_diff,
            format,
        } = args.command
        else {
            panic!("expected check");
        };
        assert_eq!(paths, vec![PathBuf::from("tests")]);
        assert_eq!(eval.mode(), Mode::Normal);
        assert!(!promote && !no_diff);
        assert_eq!(format, Format::Text);
    }

    #[test]
    fn test_check_flags() {
        let args = TopexpectArgs::parse_from([
            "topexpect", "check", "a.expect", "dir", "--strict", "-I", "lib", "--include",
            "more", "--format", "json",
        ]);
        let Command::Check {
            paths,
            eval,
            format,
            ..
        } = args.command
        else {
            panic!("expected check");
        };
        assert_eq!(paths.len(), 2);
        assert_eq!(eval.mode(), Mode::Strict);
        let flags = eval.flags();
        assert!(flags.strict && !flags.warn_error);
        assert_eq!(flags.include_dirs, vec![PathBuf::from("lib"), PathBuf::from("more")]);
        assert_eq!(format, Format::Json);
    }
}
