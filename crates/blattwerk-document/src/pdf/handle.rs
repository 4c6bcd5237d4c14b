// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document handle — an open, mutable PDF built on `lopdf`.
//
// Every page operation in Blattwerk is composed from the primitives here:
// load, create-empty, copy-pages-by-index, add-page, geometry and box
// mutators, metadata access, and save.

use std::collections::HashMap;

use blattwerk_core::error::{BlattwerkError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument, warn};

/// Page attributes that may be inherited from an ancestor `/Pages` node.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Rotate", b"Resources"];

/// US Letter, used when a page tree carries no MediaBox at all.
const FALLBACK_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Bound on `/Parent` walks so malformed trees cannot loop forever.
const MAX_TREE_DEPTH: usize = 32;

/// Options for [`DocumentHandle::load`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Open encrypted documents anyway instead of failing.
    pub ignore_encryption: bool,
}

/// Options for [`DocumentHandle::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Drop unreachable objects and renumber the rest densely.
    pub use_object_streams: bool,
    /// Flate-compress every stream that is not already filtered.
    pub compress: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            use_object_streams: false,
            compress: true,
        }
    }
}

/// Geometry of a single page, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// `[x0, y0, x1, y1]` of the effective MediaBox.
    pub media_box: [f32; 4],
    pub crop_box: Option<[f32; 4]>,
    /// Normalised `/Rotate` value: 0, 90, 180 or 270.
    pub rotation: i32,
}

impl PageGeometry {
    pub fn width(&self) -> f32 {
        (self.media_box[2] - self.media_box[0]).abs()
    }

    pub fn height(&self) -> f32 {
        (self.media_box[3] - self.media_box[1]).abs()
    }

    /// The box a viewer actually shows: CropBox when set, else MediaBox.
    pub fn visible_box(&self) -> [f32; 4] {
        self.crop_box.unwrap_or(self.media_box)
    }
}

/// Document information dictionary fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

/// An open PDF document.
///
/// Page order is stable across every mutation except an explicit reorder,
/// which always produces a fresh handle.
#[derive(Debug)]
pub struct DocumentHandle {
    document: Document,
}

impl DocumentHandle {
    // -- Construction ---------------------------------------------------------

    /// Parse PDF bytes from an anonymous source.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn load(data: &[u8], options: LoadOptions) -> Result<Self> {
        Self::open(None, data, options)
    }

    /// Parse PDF bytes, naming `name` in any [`BlattwerkError::LoadError`].
    #[instrument(skip_all, fields(name, bytes_len = data.len()))]
    pub fn load_named(name: &str, data: &[u8], options: LoadOptions) -> Result<Self> {
        Self::open(Some(name), data, options)
    }

    fn open(name: Option<&str>, data: &[u8], options: LoadOptions) -> Result<Self> {
        let fail = |reason: String| match name {
            Some(name) => BlattwerkError::load(name, reason),
            None => BlattwerkError::load_anonymous(reason),
        };

        let document = Document::load_mem(data).map_err(|err| fail(err.to_string()))?;
        if document.is_encrypted() && !options.ignore_encryption {
            return Err(fail("document is encrypted".to_string()));
        }
        if document.catalog().is_err() {
            return Err(fail("document has no catalog".to_string()));
        }

        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    /// A new document with an empty page tree.
    pub fn create_empty() -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        document.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(Vec::new())),
                ("Count", Object::Integer(0)),
            ])),
        );
        let catalog_id = document.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        document.trailer.set("Root", Object::Reference(catalog_id));
        Self { document }
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Page object ids in page order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.document.get_pages().into_values().collect()
    }

    /// Object id of the 0-based page `index`.
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        let ids = self.page_ids();
        ids.get(index).copied().ok_or_else(|| {
            BlattwerkError::InvalidOptions(format!(
                "page {} out of range (document has {} pages)",
                index + 1,
                ids.len()
            ))
        })
    }

    /// Effective geometry of the 0-based page `index`, resolving inheritance.
    pub fn page_geometry(&self, index: usize) -> Result<PageGeometry> {
        let page_id = self.page_id(index)?;
        let media_box = inherited(&self.document, page_id, b"MediaBox")
            .and_then(|obj| rect_from(&self.document, obj))
            .unwrap_or(FALLBACK_MEDIA_BOX);
        let crop_box = inherited(&self.document, page_id, b"CropBox")
            .and_then(|obj| rect_from(&self.document, obj));
        let rotation = inherited(&self.document, page_id, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .unwrap_or(0) as i32;
        Ok(PageGeometry {
            media_box,
            crop_box,
            rotation: rotation.rem_euclid(360),
        })
    }

    /// Concatenated, decompressed content of the 0-based page `index`.
    pub fn page_content(&self, index: usize) -> Result<Vec<u8>> {
        let page_id = self.page_id(index)?;
        self.document
            .get_page_content(page_id)
            .map_err(|err| BlattwerkError::DecodeError(format!("page {}: {err}", index + 1)))
    }

    /// Borrow the underlying lopdf document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    // -- Page tree mutation ---------------------------------------------------

    /// Copy the pages at `indices` (0-based, in the given order) from `source`
    /// and append them. Indices may repeat; each copy gets its own page dict.
    #[instrument(skip_all, fields(count = indices.len()))]
    pub fn copy_pages_from(&mut self, source: &DocumentHandle, indices: &[usize]) -> Result<()> {
        let source_ids = source.page_ids();
        if let Some(&bad) = indices.iter().find(|&&i| i >= source_ids.len()) {
            return Err(BlattwerkError::InvalidOptions(format!(
                "page {} out of range (document has {} pages)",
                bad + 1,
                source_ids.len()
            )));
        }

        let pages_root = self.pages_root()?;
        let mut cloner = ObjectCloner::new(&source.document);

        for &index in indices {
            let source_page = source_ids[index];
            let new_id = cloner.clone_page(&mut self.document, source_page)?;

            if let Ok(page) = self.document.get_dictionary_mut(new_id) {
                page.set("Parent", Object::Reference(pages_root));
            }
            self.append_kid(pages_root, new_id)?;
        }

        debug!(total = self.page_count(), "Pages copied");
        Ok(())
    }

    /// Append a blank page of `width` x `height` points. Returns its index.
    pub fn add_blank_page(&mut self, width: f32, height: f32) -> Result<usize> {
        let pages_root = self.pages_root()?;
        let content_id = self
            .document
            .add_object(Stream::new(Dictionary::new(), Vec::new()));
        let page_id = self.document.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_root)),
            ("MediaBox", rect_object([0.0, 0.0, width, height])),
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]));
        self.append_kid(pages_root, page_id)?;
        Ok(self.page_count() - 1)
    }

    // -- Page attributes ------------------------------------------------------

    /// Set `/Rotate` on page `index` (normalised to 0..360).
    pub fn set_rotation(&mut self, index: usize, degrees: i32) -> Result<()> {
        let page_id = self.page_id(index)?;
        let page = self.page_dict_mut(page_id)?;
        page.set("Rotate", Object::Integer(degrees.rem_euclid(360) as i64));
        Ok(())
    }

    pub fn set_crop_box(&mut self, index: usize, rect: [f32; 4]) -> Result<()> {
        let page_id = self.page_id(index)?;
        self.page_dict_mut(page_id)?.set("CropBox", rect_object(rect));
        Ok(())
    }

    pub fn set_media_box(&mut self, index: usize, rect: [f32; 4]) -> Result<()> {
        let page_id = self.page_id(index)?;
        self.page_dict_mut(page_id)?.set("MediaBox", rect_object(rect));
        Ok(())
    }

    // -- Metadata -------------------------------------------------------------

    pub fn metadata(&self) -> Metadata {
        let Some(info) = self.info_dict() else {
            return Metadata::default();
        };
        let field = |key: &[u8]| match info.get(key) {
            Ok(Object::String(bytes, _)) => Some(crate::text::decode_pdf_string(bytes)),
            _ => None,
        };
        Metadata {
            title: field(b"Title"),
            author: field(b"Author"),
            subject: field(b"Subject"),
            keywords: field(b"Keywords"),
            creator: field(b"Creator"),
            producer: field(b"Producer"),
        }
    }

    /// Write the present fields of `metadata` into `/Info`, leaving the
    /// others untouched.
    pub fn set_metadata(&mut self, metadata: &Metadata) -> Result<()> {
        let fields = [
            ("Title", &metadata.title),
            ("Author", &metadata.author),
            ("Subject", &metadata.subject),
            ("Keywords", &metadata.keywords),
            ("Creator", &metadata.creator),
            ("Producer", &metadata.producer),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                self.set_info(key, value)?;
            }
        }
        Ok(())
    }

    /// Set a single `/Info` entry as a text string.
    pub fn set_info(&mut self, key: &str, value: &str) -> Result<()> {
        let info_id = self.info_id();
        let info = self
            .document
            .get_dictionary_mut(info_id)
            .map_err(|err| BlattwerkError::SaveError(format!("info dictionary: {err}")))?;
        info.set(key, crate::text::encode_pdf_string(value));
        Ok(())
    }

    /// Remove every `/Info` entry.
    pub fn clear_metadata(&mut self) {
        if let Ok(Object::Reference(info_id)) = self.document.trailer.get(b"Info") {
            let info_id = *info_id;
            if let Ok(info) = self.document.get_dictionary_mut(info_id) {
                *info = Dictionary::new();
            }
        } else {
            self.document.trailer.remove(b"Info");
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Serialise the document, consuming the handle.
    #[instrument(skip_all, fields(pages = self.page_count()))]
    pub fn save(mut self, options: SaveOptions) -> Result<Vec<u8>> {
        if options.use_object_streams {
            let pruned = self.document.prune_objects();
            self.document.renumber_objects();
            debug!(pruned = pruned.len(), "Unreachable objects dropped");
        }
        if options.compress {
            self.document.compress();
        }

        let mut output = Vec::new();
        self.document
            .save_to(&mut output)
            .map_err(|err| BlattwerkError::SaveError(err.to_string()))?;

        info!(output_bytes = output.len(), "PDF saved");
        Ok(output)
    }

    // -- Helpers --------------------------------------------------------------

    fn pages_root(&self) -> Result<ObjectId> {
        let catalog = self
            .document
            .catalog()
            .map_err(|err| BlattwerkError::DecodeError(format!("no catalog: {err}")))?;
        match catalog.get(b"Pages") {
            Ok(Object::Reference(id)) => Ok(*id),
            _ => Err(BlattwerkError::DecodeError(
                "catalog /Pages is not a reference".to_string(),
            )),
        }
    }

    fn append_kid(&mut self, pages_root: ObjectId, page_id: ObjectId) -> Result<()> {
        let pages = self
            .document
            .get_dictionary_mut(pages_root)
            .map_err(|err| BlattwerkError::DecodeError(format!("page tree root: {err}")))?;

        match pages.get_mut(b"Kids") {
            Ok(Object::Array(kids)) => kids.push(Object::Reference(page_id)),
            _ => pages.set("Kids", Object::Array(vec![Object::Reference(page_id)])),
        }
        let count = match pages.get(b"Count") {
            Ok(Object::Integer(count)) => *count,
            _ => 0,
        };
        pages.set("Count", Object::Integer(count + 1));
        Ok(())
    }

    fn page_dict_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary> {
        self.document
            .get_dictionary_mut(page_id)
            .map_err(|err| BlattwerkError::DecodeError(format!("page {page_id:?}: {err}")))
    }

    fn info_dict(&self) -> Option<&Dictionary> {
        match self.document.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.document.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Id of the `/Info` dictionary, creating an indirect one if needed.
    fn info_id(&mut self) -> ObjectId {
        if let Ok(Object::Reference(id)) = self.document.trailer.get(b"Info") {
            let id = *id;
            if self.document.get_dictionary(id).is_ok() {
                return id;
            }
        }
        let existing = match self.document.trailer.get(b"Info") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        let id = self.document.add_object(existing);
        self.document.trailer.set("Info", Object::Reference(id));
        id
    }
}

// -- Object graph copying -----------------------------------------------------

/// Deep-copies objects from one document into another, remembering every
/// source id it has already copied so shared resources stay shared and
/// reference cycles terminate.
struct ObjectCloner<'a> {
    source: &'a Document,
    copied: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCloner<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            copied: HashMap::new(),
        }
    }

    /// Copy one page dictionary, materialising inherited attributes onto it.
    fn clone_page(&mut self, target: &mut Document, page_id: ObjectId) -> Result<ObjectId> {
        let source = self.source;
        let page = source.get_dictionary(page_id).map_err(|err| {
            BlattwerkError::DecodeError(format!("cannot read page object {page_id:?}: {err}"))
        })?;

        // A fresh id per copy; references back to the page (annotation /P)
        // resolve to the newest copy.
        let new_id = target.new_object_id();
        self.copied.insert(page_id, new_id);

        let mut cloned = self.clone_dictionary(target, page);
        for key in INHERITABLE {
            if !cloned.has(key)
                && let Some(value) = inherited(source, page_id, key)
            {
                let value = self.clone_object(target, value);
                cloned.set(key.to_vec(), value);
            }
        }

        target.objects.insert(new_id, Object::Dictionary(cloned));
        Ok(new_id)
    }

    fn clone_reference(&mut self, target: &mut Document, id: ObjectId) -> Object {
        if let Some(&existing) = self.copied.get(&id) {
            return Object::Reference(existing);
        }
        let source = self.source;
        match source.get_object(id) {
            Ok(object) => {
                let new_id = target.new_object_id();
                self.copied.insert(id, new_id);
                let cloned = self.clone_object(target, object);
                target.objects.insert(new_id, cloned);
                Object::Reference(new_id)
            }
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using Null");
                Object::Null
            }
        }
    }

    fn clone_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut out = Dictionary::new();
        for (key, value) in dict.iter() {
            // The owning page tree is rebuilt by the caller.
            if key == b"Parent" {
                continue;
            }
            let value = self.clone_object(target, value);
            out.set(key.clone(), value);
        }
        out
    }

    fn clone_object(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.clone_reference(target, *id),
            Object::Dictionary(dict) => Object::Dictionary(self.clone_dictionary(target, dict)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.clone_object(target, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let dict = self.clone_dictionary(target, &stream.dict);
                let mut copy = Stream::new(dict, stream.content.clone());
                copy.allows_compression = stream.allows_compression;
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }
}

// -- Free helpers -------------------------------------------------------------

/// Look up `key` on a page, walking up `/Parent` for inheritable attributes.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        match current.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = doc.get_dictionary(*parent).ok()?,
            _ => return None,
        }
    }
    None
}

/// Resolve one level of indirection.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn rect_from(doc: &Document, object: &Object) -> Option<[f32; 4]> {
    let Object::Array(items) = resolve(doc, object) else {
        return None;
    };
    if items.len() != 4 {
        return None;
    }
    let mut rect = [0.0; 4];
    for (slot, item) in rect.iter_mut().zip(items) {
        *slot = number(resolve(doc, item))?;
    }
    // Normalise so x0 <= x1 and y0 <= y1.
    Some([
        rect[0].min(rect[2]),
        rect[1].min(rect[3]),
        rect[0].max(rect[2]),
        rect[1].max(rect[3]),
    ])
}

pub(crate) fn rect_object(rect: [f32; 4]) -> Object {
    Object::Array(rect.iter().map(|v| Object::Real(*v)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_page_doc() -> DocumentHandle {
        let mut handle = DocumentHandle::create_empty();
        handle.add_blank_page(612.0, 792.0).unwrap();
        handle.add_blank_page(595.0, 842.0).unwrap();
        handle.add_blank_page(842.0, 595.0).unwrap();
        handle
    }

    #[test]
    fn create_empty_has_no_pages() {
        let handle = DocumentHandle::create_empty();
        assert_eq!(handle.page_count(), 0);
    }

    #[test]
    fn blank_pages_keep_their_size() {
        let handle = three_page_doc();
        assert_eq!(handle.page_count(), 3);
        let geometry = handle.page_geometry(1).unwrap();
        assert_eq!(geometry.width(), 595.0);
        assert_eq!(geometry.height(), 842.0);
        assert_eq!(geometry.rotation, 0);
        assert!(geometry.crop_box.is_none());
    }

    #[test]
    fn save_then_load_round_trip() {
        let bytes = three_page_doc().save(SaveOptions::default()).unwrap();
        let reloaded = DocumentHandle::load(&bytes, LoadOptions::default()).unwrap();
        assert_eq!(reloaded.page_count(), 3);
        assert_eq!(reloaded.page_geometry(2).unwrap().width(), 842.0);
    }

    #[test]
    fn load_garbage_names_the_file() {
        let err = DocumentHandle::load_named("notes.pdf", b"not a pdf", LoadOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, BlattwerkError::LoadError { .. }));
        assert!(err.to_string().contains("notes.pdf"));
    }

    #[test]
    fn copy_pages_repeats_and_orders() {
        let source = three_page_doc();
        let mut target = DocumentHandle::create_empty();
        target.copy_pages_from(&source, &[2, 0, 2]).unwrap();
        assert_eq!(target.page_count(), 3);
        assert_eq!(target.page_geometry(0).unwrap().width(), 842.0);
        assert_eq!(target.page_geometry(1).unwrap().width(), 612.0);
        assert_eq!(target.page_geometry(2).unwrap().width(), 842.0);
        assert_ne!(target.page_id(0).unwrap(), target.page_id(2).unwrap());
    }

    #[test]
    fn copy_rejects_out_of_range() {
        let source = three_page_doc();
        let mut target = DocumentHandle::create_empty();
        assert!(target.copy_pages_from(&source, &[0, 3]).is_err());
        assert_eq!(target.page_count(), 0);
    }

    #[test]
    fn copied_page_materialises_inherited_media_box() {
        let mut handle = DocumentHandle::create_empty();
        handle.add_blank_page(100.0, 200.0).unwrap();
        let page_id = handle.page_id(0).unwrap();
        let pages_root = handle.pages_root().unwrap();
        {
            let doc = handle.document_mut();
            let media = doc.get_dictionary_mut(page_id).unwrap().remove(b"MediaBox").unwrap();
            doc.get_dictionary_mut(pages_root).unwrap().set("MediaBox", media);
        }
        assert_eq!(handle.page_geometry(0).unwrap().height(), 200.0);

        let mut copy = DocumentHandle::create_empty();
        copy.copy_pages_from(&handle, &[0]).unwrap();
        let copied = copy.page_id(0).unwrap();
        assert!(copy.document().get_dictionary(copied).unwrap().has(b"MediaBox"));
    }

    #[test]
    fn rotation_is_normalised() {
        let mut handle = three_page_doc();
        handle.set_rotation(0, -90).unwrap();
        assert_eq!(handle.page_geometry(0).unwrap().rotation, 270);
    }

    #[test]
    fn metadata_round_trip() {
        let mut handle = three_page_doc();
        handle
            .set_metadata(&Metadata {
                title: Some("Quarterly report".into()),
                author: Some("Blattwerk".into()),
                ..Metadata::default()
            })
            .unwrap();
        let bytes = handle.save(SaveOptions::default()).unwrap();
        let reloaded = DocumentHandle::load(&bytes, LoadOptions::default()).unwrap();
        let metadata = reloaded.metadata();
        assert_eq!(metadata.title.as_deref(), Some("Quarterly report"));
        assert_eq!(metadata.author.as_deref(), Some("Blattwerk"));
        assert_eq!(metadata.subject, None);
    }

    #[test]
    fn clear_metadata_empties_info() {
        let mut handle = three_page_doc();
        handle.set_info("Title", "x").unwrap();
        handle.clear_metadata();
        assert_eq!(handle.metadata(), Metadata::default());
    }

    #[test]
    fn object_stream_save_prunes_and_reloads() {
        let mut handle = three_page_doc();
        handle.document_mut().add_object(Object::Integer(42));
        let bytes = handle
            .save(SaveOptions {
                use_object_streams: true,
                compress: true,
            })
            .unwrap();
        let reloaded = DocumentHandle::load(&bytes, LoadOptions::default()).unwrap();
        assert_eq!(reloaded.page_count(), 3);
    }
}
