// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bildwerk — extract images from PDF pages and place images onto PDF pages.
//
// Entry point. Initialises logging and dispatches to the subcommands. Exit
// status: 0 on success, 1 when a document or image failed, 2 on bad input or
// configuration.

mod cli;
mod extract_cmd;
mod insert_cmd;

use clap::Parser;
use cli::{Cli, Commands};

/// A document or image failed; the run itself completed.
pub(crate) const EXIT_FAILED: i32 = 1;
/// Arguments or configuration unusable; nothing was processed.
pub(crate) const EXIT_CONFIG: i32 = 2;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            ref file,
            ref out,
            unit,
            y_origin,
            ref pages,
            flatten,
        } => extract_cmd::run(file, out.as_deref(), unit.into(), y_origin.into(), pages.as_deref(), flatten),
        Commands::Insert {
            ref root,
            ref config,
            ref out,
            unit,
            y_origin,
            suffix,
            jobs,
        } => insert_cmd::run(&insert_cmd::InsertArgs {
            root,
            config,
            out: out.as_deref(),
            unit: unit.map(Into::into),
            y_origin: y_origin.map(Into::into),
            suffix,
            jobs,
        }),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
