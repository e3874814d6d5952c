// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.

use std::path::PathBuf;

use bildwerk_core::types::YOrigin;
use bildwerk_core::units::Unit;
use clap::{Parser, Subcommand, ValueEnum};

/// Extract images from PDF pages and place images onto PDF pages.
#[derive(Debug, Parser)]
#[command(name = "bildwerk", about, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Save every image placed in a PDF as PNG, plus a rule file that puts them back
    Extract {
        /// Path to the PDF file
        #[arg(value_name = "PDF")]
        file: PathBuf,

        /// Output directory. Default: a `pic` directory next to the PDF
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Unit for the emitted rules
        #[arg(long, value_enum, default_value_t = UnitArg::Cm)]
        unit: UnitArg,

        /// Y axis convention for the emitted rules
        #[arg(long, value_enum, default_value_t = OriginArg::BottomUp)]
        y_origin: OriginArg,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Composite transparent images onto white
        #[arg(long)]
        flatten: bool,
    },

    /// Place images onto every PDF under a directory as described by a rule file
    Insert {
        /// Directory searched recursively for PDF files
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// Rule file (JSON)
        #[arg(long, value_name = "FILE")]
        config: PathBuf,

        /// Output root. Overrides the rule file; default `<ROOT>/output`
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Unit of the rule values. Overrides the rule file
        #[arg(long, value_enum)]
        unit: Option<UnitArg>,

        /// Y axis convention of the rule values. Overrides the rule file
        #[arg(long, value_enum)]
        y_origin: Option<OriginArg>,

        /// Append `_signed` to output file names
        #[arg(long)]
        suffix: bool,

        /// Documents processed in parallel
        #[arg(long, default_value_t = 1)]
        jobs: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitArg {
    Pt,
    Inch,
    Cm,
}

impl From<UnitArg> for Unit {
    fn from(arg: UnitArg) -> Self {
        match arg {
            UnitArg::Pt => Unit::Pt,
            UnitArg::Inch => Unit::Inch,
            UnitArg::Cm => Unit::Cm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OriginArg {
    /// Measured from the page bottom (PDF native)
    BottomUp,
    /// Measured from the page top (screen-like)
    TopDown,
}

impl From<OriginArg> for YOrigin {
    fn from(arg: OriginArg) -> Self {
        match arg {
            OriginArg::BottomUp => YOrigin::BottomUp,
            OriginArg::TopDown => YOrigin::TopDown,
        }
    }
}
