//! PDF rendering with `lopdf`.
//!
//! Blank-canvas pages are built from scratch. Overlay pages reuse the
//! first page of the base document: its existing content is wrapped in
//! `q … Q` and the slot drawing is appended as one more content stream.

use std::path::Path;

use jigprint_core::geometry::{PageSize, Rect};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::content::SlotContent;
use crate::error::ComposeError;
use crate::layout::{CompositionMode, Grid, PageLayout, PlannedSlot};

const FONT_NAME: &str = "JigF1";
const IMAGE_PREFIX: &str = "JigLbl";
const MAX_INHERIT_DEPTH: usize = 32;

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn number(object: &Object) -> Option<f64> {
    match *object {
        Object::Integer(i) => Some(i as f64),
        Object::Real(r) => Some(r as f64),
        _ => None,
    }
}

fn op(operator: &str, operands: Vec<Object>) -> Operation {
    Operation::new(operator, operands)
}

// ---------------------------------------------------------------------------
// Base layer
// ---------------------------------------------------------------------------

/// The first page of a base-layer PDF, ready to be drawn over.
pub struct BaseLayer {
    doc: Document,
    page_id: ObjectId,
    media_box: [f64; 4],
}

impl BaseLayer {
    pub fn load(path: &Path) -> Result<Self, ComposeError> {
        let doc = Document::load(path).map_err(|source| ComposeError::BaseLayer {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_document(doc, path)
    }

    fn from_document(mut doc: Document, path: &Path) -> Result<Self, ComposeError> {
        let pages = doc.get_pages();
        let Some((&first, &page_id)) = pages.iter().next() else {
            return Err(ComposeError::BaseLayerEmpty(path.to_path_buf()));
        };

        let media_box = inherited(&doc, page_id, b"MediaBox")
            .and_then(|obj| media_box(&doc, &obj))
            .ok_or_else(|| ComposeError::BaseLayerMediaBox(path.to_path_buf()))?;

        let extra: Vec<u32> = pages.keys().copied().filter(|n| *n != first).collect();
        if !extra.is_empty() {
            tracing::debug!(dropped = extra.len(), "Base layer has extra pages; keeping the first");
            doc.delete_pages(&extra);
        }

        Ok(Self {
            doc,
            page_id,
            media_box,
        })
    }

    pub fn page_size(&self) -> PageSize {
        let [x0, y0, x1, y1] = self.media_box;
        PageSize {
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }
}

/// Look up a page attribute, following `Parent` links for inheritable keys.
fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn media_box(doc: &Document, object: &Object) -> Option<[f64; 4]> {
    let values = resolve(doc, object)?.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = number(resolve(doc, value)?)?;
    }
    (out[2] != out[0] && out[3] != out[1]).then_some(out)
}

fn resolved_dict(doc: &Document, object: Option<&Object>) -> Dictionary {
    object
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
        .cloned()
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

/// Accumulates drawing operations plus the resources they reference.
#[derive(Default)]
struct Canvas {
    ops: Vec<Operation>,
    xobjects: Dictionary,
    font: Option<ObjectId>,
}

impl Canvas {
    fn grid(&mut self, grid: &Grid, page: PageSize) {
        self.ops.push(op("q", vec![]));
        self.ops.push(op("RG", vec![real(0.9), real(0.9), real(0.9)]));
        self.ops.push(op("w", vec![real(0.5)]));
        for &x in &grid.xs {
            self.ops.push(op("m", vec![real(x), real(0.0)]));
            self.ops.push(op("l", vec![real(x), real(page.height)]));
        }
        for &y in &grid.ys {
            self.ops.push(op("m", vec![real(0.0), real(y)]));
            self.ops.push(op("l", vec![real(page.width), real(y)]));
        }
        self.ops.push(op("S", vec![]));
        self.ops.push(op("Q", vec![]));
    }

    fn slot(&mut self, doc: &mut Document, slot: &PlannedSlot, content: &SlotContent) {
        if let Some(matrix) = slot.transform {
            self.ops.push(op("q", vec![]));
            self.ops.push(op("cm", matrix.iter().map(|v| real(*v)).collect()));
        }

        match content {
            SlotContent::Raster(img) => {
                let (w, h) = img.dimensions();
                let target = slot.fit(f64::from(w), f64::from(h));
                self.image(doc, img, target);
            }
            SlotContent::Placeholder(text) => self.placeholder(doc, slot.rect, text),
        }

        if slot.transform.is_some() {
            self.ops.push(op("Q", vec![]));
        }
    }

    fn image(&mut self, doc: &mut Document, img: &image::RgbaImage, target: Rect) {
        let (width, height) = img.dimensions();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in img.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(i64::from(width)),
            "Height" => Object::Integer(i64::from(height)),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => Object::Integer(8),
        };
        if alpha.iter().any(|a| *a < u8::MAX) {
            let mask = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => Object::Integer(i64::from(width)),
                    "Height" => Object::Integer(i64::from(height)),
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => Object::Integer(8),
                },
                alpha,
            );
            dict.set("SMask", doc.add_object(mask));
        }

        let image_id = doc.add_object(Stream::new(dict, rgb));
        let name = format!("{IMAGE_PREFIX}{}", self.xobjects.len() + 1);
        self.xobjects.set(name.as_bytes().to_vec(), image_id);

        self.ops.push(op("q", vec![]));
        self.ops.push(op(
            "cm",
            vec![
                real(target.width),
                real(0.0),
                real(0.0),
                real(target.height),
                real(target.x),
                real(target.y),
            ],
        ));
        self.ops.push(op("Do", vec![Object::Name(name.into_bytes())]));
        self.ops.push(op("Q", vec![]));
    }

    fn placeholder(&mut self, doc: &mut Document, rect: Rect, text: &str) {
        if self.font.is_none() {
            self.font = Some(doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            }));
        }

        let size = (rect.height / 4.0).clamp(4.0, 10.0);
        let text_width = 0.5 * size * text.chars().count() as f64;
        let tx = rect.x + (rect.width - text_width).max(0.0) / 2.0;
        let ty = rect.y + (rect.height - size) / 2.0;

        self.ops.extend([
            op("q", vec![]),
            op("RG", vec![real(0.8), real(0.8), real(0.8)]),
            op("rg", vec![real(0.95), real(0.95), real(0.95)]),
            op("w", vec![real(1.0)]),
            op(
                "re",
                vec![real(rect.x), real(rect.y), real(rect.width), real(rect.height)],
            ),
            op("B", vec![]),
            op("BT", vec![]),
            op("Tf", vec![Object::Name(FONT_NAME.as_bytes().to_vec()), real(size)]),
            op("g", vec![real(0.5)]),
            op("Td", vec![real(tx), real(ty)]),
            op("Tj", vec![Object::string_literal(text)]),
            op("ET", vec![]),
            op("Q", vec![]),
        ]);
    }

    /// Resource entries this canvas adds to its page.
    fn resources(&self) -> (Dictionary, Dictionary) {
        let mut fonts = Dictionary::new();
        if let Some(id) = self.font {
            fonts.set(FONT_NAME, id);
        }
        (self.xobjects.clone(), fonts)
    }

    fn into_stream(self) -> Result<Stream, ComposeError> {
        let bytes = Content {
            operations: self.ops,
        }
        .encode()?;
        Ok(Stream::new(Dictionary::new(), bytes))
    }
}

fn paint(
    doc: &mut Document,
    canvas: &mut Canvas,
    layout: &PageLayout,
    contents: &[Option<SlotContent>],
) {
    if let Some(grid) = &layout.grid {
        canvas.grid(grid, layout.page);
    }
    for slot in &layout.slots {
        if let Some(Some(content)) = contents.get(slot.index) {
            canvas.slot(doc, slot, content);
        }
    }
}

// ---------------------------------------------------------------------------
// Page assembly
// ---------------------------------------------------------------------------

/// Render the planned page. `contents[i]` is the loaded content for
/// placement `i`, or `None` when that slot was skipped.
pub fn render(
    layout: &PageLayout,
    base: Option<BaseLayer>,
    contents: &[Option<SlotContent>],
) -> Result<Vec<u8>, ComposeError> {
    let mut doc = match (layout.mode, base) {
        (CompositionMode::Overlay, Some(base)) => render_overlay(layout, base, contents)?,
        _ => render_blank(layout, contents)?,
    };

    doc.prune_objects();
    doc.compress();
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn render_blank(
    layout: &PageLayout,
    contents: &[Option<SlotContent>],
) -> Result<Document, ComposeError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut canvas = Canvas::default();
    paint(&mut doc, &mut canvas, layout, contents);

    let (xobjects, fonts) = canvas.resources();
    let mut resources = Dictionary::new();
    if !xobjects.is_empty() {
        resources.set("XObject", xobjects);
    }
    if !fonts.is_empty() {
        resources.set("Font", fonts);
    }

    let content_id = doc.add_object(canvas.into_stream()?);
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![real(0.0), real(0.0), real(layout.page.width), real(layout.page.height)],
        "Contents" => content_id,
        "Resources" => resources,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}

fn render_overlay(
    layout: &PageLayout,
    base: BaseLayer,
    contents: &[Option<SlotContent>],
) -> Result<Document, ComposeError> {
    let BaseLayer {
        mut doc,
        page_id,
        media_box,
    } = base;

    let mut canvas = Canvas::default();
    let [x0, y0, ..] = media_box;
    if x0 != 0.0 || y0 != 0.0 {
        canvas.ops.push(op(
            "cm",
            vec![real(1.0), real(0.0), real(0.0), real(1.0), real(x0), real(y0)],
        ));
    }
    paint(&mut doc, &mut canvas, layout, contents);
    let (xobjects, fonts) = canvas.resources();

    let mut resources = resolved_dict(&doc, inherited(&doc, page_id, b"Resources").as_ref());
    for (key, additions) in [("XObject", xobjects), ("Font", fonts)] {
        if additions.is_empty() {
            continue;
        }
        let mut merged = resolved_dict(&doc, resources.get(key.as_bytes()).ok());
        for (name, value) in additions.iter() {
            merged.set(name.clone(), value.clone());
        }
        resources.set(key, merged);
    }

    let existing = existing_contents(&doc, page_id)?;
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
    let overlay_id = doc.add_object(canvas.into_stream()?);

    let mut contents_array = Vec::with_capacity(existing.len() + 3);
    contents_array.push(Object::Reference(save_id));
    contents_array.extend(existing);
    contents_array.push(Object::Reference(restore_id));
    contents_array.push(Object::Reference(overlay_id));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", contents_array);
    page.set("Resources", resources);
    page.set(
        "MediaBox",
        media_box.iter().map(|v| real(*v)).collect::<Vec<_>>(),
    );

    Ok(doc)
}

/// The page's content streams as a flat list of references.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, ComposeError> {
    let page = doc.get_dictionary(page_id)?;
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };
    let flattened = match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(items) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Object::Array(items) => items.clone(),
        _ => Vec::new(),
    };
    Ok(flattened)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_page(media_box: Vec<Object>, on_parent: bool) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        };
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Count" => Object::Integer(1),
        };
        if on_parent {
            pages.set("MediaBox", media_box);
        } else {
            page.set("MediaBox", media_box);
        }
        let page_id = doc.add_object(page);
        pages.set("Kids", vec![Object::Reference(page_id)]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn media_box_is_inherited_from_parent() {
        let doc = single_page(
            vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), real(792.0)],
            true,
        );
        let base = BaseLayer::from_document(doc, Path::new("base.pdf")).unwrap();
        assert_eq!(base.page_size(), PageSize { width: 612.0, height: 792.0 });
    }

    #[test]
    fn degenerate_media_box_is_rejected() {
        let doc = single_page(
            vec![Object::Integer(0), Object::Integer(0), Object::Integer(0), Object::Integer(0)],
            false,
        );
        let err = BaseLayer::from_document(doc, Path::new("base.pdf"))
            .err()
            .unwrap();
        assert!(matches!(err, ComposeError::BaseLayerMediaBox(_)));
    }

    #[test]
    fn page_without_contents_flattens_to_nothing() {
        let doc = single_page(
            vec![Object::Integer(0), Object::Integer(0), Object::Integer(100), Object::Integer(100)],
            false,
        );
        let page_id = *doc.get_pages().values().next().unwrap();
        assert!(existing_contents(&doc, page_id).unwrap().is_empty());
    }
}
