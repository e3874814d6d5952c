// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — image decoding, location and placement on top of `lopdf`.

mod filters;
mod objects;

pub mod insert;
pub mod inspect;
pub mod locate;
pub mod materialize;
pub mod samples;
pub mod session;

pub use insert::PageImageSource;
pub use inspect::is_decode_inverted;
pub use locate::ImagePlacement;
pub use materialize::materialize;
pub use session::{PageBox, PdfSession};
