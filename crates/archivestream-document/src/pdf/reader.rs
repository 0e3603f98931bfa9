// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open source documents with `lopdf` and copy selected pages
// into another document.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument, warn};

use archivestream_core::error::{ArchiveError, Result};

use crate::selection::PageSelection;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Upper bound on page tree depth when walking `/Parent` links.
const MAX_TREE_DEPTH: usize = 32;

/// A parsed source PDF (or the PDF rendition of a word-processor document).
pub struct SourcePdf {
    document: Document,
}

impl SourcePdf {
    /// Parse raw PDF bytes.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            ArchiveError::PdfError(format!("failed to load PDF from memory: {err}"))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Object ids of the selected pages, in selection order.
    pub fn selected_page_ids(&self, selection: &PageSelection) -> Result<Vec<ObjectId>> {
        let pages = self.document.get_pages();
        selection
            .pages()
            .iter()
            .map(|page_number| {
                pages.get(page_number).copied().ok_or_else(|| {
                    ArchiveError::PdfError(format!(
                        "page {page_number} out of range (document has {} pages)",
                        pages.len()
                    ))
                })
            })
            .collect()
    }
}

/// Copies objects from one source document into a target, sharing copies of
/// objects referenced more than once (fonts, images) and tolerating cycles.
pub(crate) struct PageCopier<'a> {
    source: &'a Document,
    copied: HashMap<ObjectId, ObjectId>,
}

impl<'a> PageCopier<'a> {
    pub(crate) fn new(source: &'a Document) -> Self {
        Self {
            source,
            copied: HashMap::new(),
        }
    }

    /// Copy a page into `target` and return the id of the new page object.
    ///
    /// Inherited attributes are written onto the copy and `/Parent` is left
    /// unset; the caller links the page into its own page tree.
    pub(crate) fn copy_page(&mut self, target: &mut Document, page_id: ObjectId) -> Result<ObjectId> {
        let source = self.source;
        let page = source.get_dictionary(page_id).map_err(|err| {
            ArchiveError::PdfError(format!("cannot read page object {page_id:?}: {err}"))
        })?;

        let mut flattened = page.clone();
        for key in INHERITABLE_KEYS {
            if !flattened.has(key)
                && let Some(value) = self.inherited_attribute(page, key)
            {
                flattened.set(key.to_vec(), value);
            }
        }
        flattened.remove(b"Parent");

        let new_id = target.new_object_id();
        self.copied.insert(page_id, new_id);
        let copied = self.copy_dictionary(target, &flattened)?;
        target.objects.insert(new_id, Object::Dictionary(copied));
        Ok(new_id)
    }

    /// Look `key` up in the ancestors of `page`.
    fn inherited_attribute(&self, page: &Dictionary, key: &[u8]) -> Option<Object> {
        let mut parent_ref = page.get(b"Parent").and_then(Object::as_reference).ok();
        for _ in 0..MAX_TREE_DEPTH {
            let node = self.source.get_dictionary(parent_ref?).ok()?;
            if let Ok(value) = node.get(key) {
                return Some(value.clone());
            }
            parent_ref = node.get(b"Parent").and_then(Object::as_reference).ok();
        }
        None
    }

    fn copy_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Result<Dictionary> {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            // Page back-references are dropped; the page tree is rebuilt.
            if key == b"Parent" {
                continue;
            }
            copy.set(key.clone(), self.copy_object(target, value)?);
        }
        Ok(copy)
    }

    fn copy_object(&mut self, target: &mut Document, object: &Object) -> Result<Object> {
        match object {
            Object::Dictionary(dict) => Ok(Object::Dictionary(self.copy_dictionary(target, dict)?)),
            Object::Array(items) => items
                .iter()
                .map(|item| self.copy_object(target, item))
                .collect::<Result<Vec<_>>>()
                .map(Object::Array),
            Object::Stream(stream) => {
                let dict = self.copy_dictionary(target, &stream.dict)?;
                let mut copy = lopdf::Stream::new(dict, stream.content.clone());
                copy.allows_compression = stream.allows_compression;
                Ok(Object::Stream(copy))
            }
            Object::Reference(id) => self.copy_reference(target, *id),
            other => Ok(other.clone()),
        }
    }

    fn copy_reference(&mut self, target: &mut Document, id: ObjectId) -> Result<Object> {
        if let Some(existing) = self.copied.get(&id) {
            return Ok(Object::Reference(*existing));
        }
        let source = self.source;
        let referenced = match source.get_object(id) {
            Ok(object) => object,
            Err(err) => {
                warn!(?id, %err, "cannot resolve reference, using Null");
                return Ok(Object::Null);
            }
        };

        // Reserve the id first so cycles resolve to the same copy.
        let new_id = target.new_object_id();
        self.copied.insert(id, new_id);
        let copy = self.copy_object(target, referenced)?;
        target.objects.insert(new_id, copy);
        Ok(Object::Reference(new_id))
    }
}
