// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF session — one open document, exclusively owned by the runner using it.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::types::PageRect;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info, instrument, warn};

use super::insert::{PageImageSource, draw_on_page, embed_image};
use super::locate::{ImagePlacement, locate_images};
use super::materialize::materialize;
use super::objects::effective_mediabox;
use crate::image::DecodedImage;

/// Page box in default user space, normalised so that `llx <= urx` and
/// `lly <= ury`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl PageBox {
    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }
}

/// An open, decrypted document plus the bookkeeping needed to place images
/// on its pages.
///
/// All rectangles exchanged with a session are relative to the lower-left
/// corner of the page box.
pub struct PdfSession {
    document: Document,
    source_path: Option<PathBuf>,
    /// Page object ids in page order.
    page_ids: Vec<ObjectId>,
    /// Pages whose original content is already wrapped in `q ... Q`.
    wrapped_pages: HashSet<ObjectId>,
    /// XObjects embedded by this session, keyed by source path.
    embedded: HashMap<PathBuf, ObjectId>,
}

impl PdfSession {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening PDF: {}", path.display());

        let document = Document::load(path).map_err(|err| {
            BildwerkError::DocumentOpen(format!("failed to open {}: {}", path.display(), err))
        })?;

        let mut session = Self::from_document(document)?;
        session.source_path = Some(path.to_path_buf());
        debug!(pages = session.page_count(), "PDF loaded");
        Ok(session)
    }

    /// Create a session from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            BildwerkError::DocumentOpen(format!("failed to load PDF from memory: {}", err))
        })?;
        Self::from_document(document)
    }

    /// Take ownership of a loaded document. An encrypted document gets the
    /// empty-password attempt; if it stays encrypted the session is refused.
    ///
    /// `Document::load` already decrypts objects when the empty password
    /// works, but leaves `/Encrypt` in the trailer. Such a document must not
    /// be decrypted a second time.
    pub fn from_document(mut document: Document) -> Result<Self> {
        if document.is_encrypted() {
            if document.encryption_state.is_some() {
                debug!("document was decrypted on load with the empty password");
                drop_encrypt_entry(&mut document);
            } else {
                debug!("document is encrypted, trying the empty password");
                document
                    .decrypt("")
                    .map_err(|err| BildwerkError::Decryption(format!("empty password rejected: {}", err)))?;
            }
        }

        let page_ids = document.get_pages().into_values().collect();
        Ok(Self {
            document,
            source_path: None,
            page_ids,
            wrapped_pages: HashSet::new(),
            embedded: HashMap::new(),
        })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Object id of the page at 0-based `index`.
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids.get(index).copied().ok_or_else(|| {
            BildwerkError::PdfError(format!(
                "page index {} out of range (document has {} pages)",
                index,
                self.page_count()
            ))
        })
    }

    /// Effective MediaBox of the page at `index`.
    pub fn page_box(&self, index: usize) -> Result<PageBox> {
        let page_id = self.page_id(index)?;
        let (llx, lly, urx, ury) = effective_mediabox(&self.document, page_id)
            .ok_or_else(|| BildwerkError::PdfError(format!("page {} has no usable MediaBox", index + 1)))?;
        Ok(PageBox { llx, lly, urx, ury })
    }

    pub fn page_height(&self, index: usize) -> Result<f64> {
        Ok(self.page_box(index)?.height())
    }

    // -- Images ---------------------------------------------------------------

    /// Every image drawn on the page at `index`, with rectangles relative to
    /// the page box.
    pub fn locate_images(&self, index: usize) -> Result<Vec<ImagePlacement>> {
        let page_id = self.page_id(index)?;
        let page_box = self.page_box(index)?;
        let placements = locate_images(&self.document, page_id)
            .into_iter()
            .map(|placement| ImagePlacement {
                rect: PageRect::new(
                    placement.rect.x0 - page_box.llx,
                    placement.rect.y0 - page_box.lly,
                    placement.rect.x1 - page_box.llx,
                    placement.rect.y1 - page_box.lly,
                ),
                ..placement
            })
            .collect::<Vec<_>>();
        debug!(page = index + 1, images = placements.len(), "images located");
        Ok(placements)
    }

    pub fn materialize(&self, id: ObjectId) -> Result<DecodedImage> {
        materialize(&self.document, id)
    }

    /// Draw `source` on the page at `index`, stretched to fill `rect`
    /// (relative to the page box). A source placed repeatedly in one session
    /// is embedded once.
    #[instrument(skip(self, source), fields(image = %source.path().display()))]
    pub fn insert_image(&mut self, index: usize, rect: &PageRect, source: &PageImageSource) -> Result<()> {
        let page_id = self.page_id(index)?;
        let page_box = self.page_box(index)?;

        let xobject = match self.embedded.get(source.path()) {
            Some(id) => *id,
            None => {
                let id = embed_image(&mut self.document, source.image())?;
                self.embedded.insert(source.path().to_path_buf(), id);
                id
            }
        };

        let absolute = PageRect::new(
            rect.x0 + page_box.llx,
            rect.y0 + page_box.lly,
            rect.x1 + page_box.llx,
            rect.y1 + page_box.lly,
        );
        let first_on_page = self.wrapped_pages.insert(page_id);
        draw_on_page(&mut self.document, page_id, xobject, &absolute, first_on_page)
    }

    // -- Output ---------------------------------------------------------------

    /// Serialise the document to PDF bytes.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.document
            .save_to(&mut output)
            .map_err(|err| BildwerkError::Save(format!("failed to serialise PDF: {}", err)))?;
        Ok(output)
    }

    /// Write the document to `path`, creating parent directories. A partially
    /// written file is removed again on failure.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                BildwerkError::Save(format!("cannot create {}: {}", parent.display(), err))
            })?;
        }

        if let Err(err) = fs::write(path, &bytes) {
            if path.exists() {
                if let Err(cleanup) = fs::remove_file(path) {
                    warn!(%cleanup, "could not remove partial output");
                }
            }
            return Err(BildwerkError::Save(format!("cannot write {}: {}", path.display(), err)));
        }

        info!(bytes = bytes.len(), "PDF saved");
        Ok(())
    }
}

/// Remove the trailer's `/Encrypt` entry and its dictionary, so that the
/// plaintext objects are written back unencrypted.
fn drop_encrypt_entry(document: &mut Document) {
    if let Some(Object::Reference(id)) = document.trailer.remove(b"Encrypt") {
        document.objects.remove(&id);
    }
}
