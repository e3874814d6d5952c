// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bildwerk.

use thiserror::Error;

/// Top-level error type for all Bildwerk operations.
#[derive(Debug, Error)]
pub enum BildwerkError {
    // -- Document errors --
    #[error("cannot open document: {0}")]
    DocumentOpen(String),

    #[error("document is encrypted and could not be decrypted: {0}")]
    Decryption(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image decode failed: {0}")]
    ImageDecode(String),

    #[error("save failed: {0}")]
    Save(String),

    // -- Rule / configuration errors --
    #[error("rule #{index} rejected: {reason}")]
    InvalidRule { index: usize, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BildwerkError {
    /// Whether this error only invalidates the document being processed.
    ///
    /// Configuration and rule errors are raised before any document is
    /// touched and therefore stop the whole run instead.
    pub fn is_document_fatal(&self) -> bool {
        !matches!(self, Self::InvalidRule { .. } | Self::Config(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BildwerkError>;
