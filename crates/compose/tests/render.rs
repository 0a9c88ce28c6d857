//! End-to-end rendering tests: compose to bytes, then parse the result
//! back with lopdf and inspect the page.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use jigprint_compose::{
    compose, compose_to_bytes, ComposeError, CompositionMode, CompositionRequest, Placement,
};
use jigprint_core::geometry::{mm_to_pt, BedSize, SlotRect};
use lopdf::content::Content;
use lopdf::{dictionary, Document, Object};

fn slot(label: &str, x: f64, y: f64, w: f64, h: f64, content: Option<PathBuf>) -> Placement {
    Placement {
        label: label.to_string(),
        rect: SlotRect {
            x_mm: x,
            y_mm: y,
            width_mm: w,
            height_mm: h,
        },
        rotation_deg: 0.0,
        content,
    }
}

fn write_png(dir: &Path, name: &str, alpha: u8) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_pixel(8, 4, Rgba([10, 20, 30, alpha]))
        .save(&path)
        .unwrap();
    path
}

fn write_base(dir: &Path, width: f64, height: f64) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(lopdf::Stream::new(
        dictionary! {},
        b"0 0 1 rg 0 0 10 10 re f".to_vec(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {},
    });
    let second_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id), Object::Reference(second_id)],
            "Count" => Object::Integer(2),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width as f32),
                Object::Real(height as f32),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join("base.pdf");
    doc.save(&path).unwrap();
    path
}

fn first_page(bytes: &[u8]) -> (Document, lopdf::ObjectId) {
    let doc = Document::load_mem(bytes).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1, "composition always yields one page");
    let id = *pages.values().next().unwrap();
    (doc, id)
}

fn operators(doc: &Document, page_id: lopdf::ObjectId) -> Vec<String> {
    let bytes = doc.get_page_content(page_id).unwrap();
    Content::decode(&bytes)
        .unwrap()
        .operations
        .into_iter()
        .map(|op| op.operator)
        .collect()
}

fn media_box(doc: &Document, page_id: lopdf::ObjectId) -> Vec<f64> {
    doc.get_dictionary(page_id)
        .unwrap()
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|o| match o {
            Object::Integer(i) => *i as f64,
            Object::Real(r) => *r as f64,
            other => panic!("unexpected MediaBox entry {other:?}"),
        })
        .collect()
}

#[test]
fn blank_canvas_page_matches_bed() {
    let dir = tempfile::tempdir().unwrap();
    let label = write_png(dir.path(), "a.png", 255);
    let request = CompositionRequest {
        bed: BedSize::new(329.0, 483.0).unwrap(),
        base_layer: None,
        placements: vec![
            slot("A", 32.9, 38.64, 82.25, 144.9, Some(label)),
            slot("B", 180.0, 38.64, 82.25, 144.9, None),
        ],
    };

    let (bytes, report) = compose_to_bytes(&request).unwrap();
    assert_eq!(report.mode, CompositionMode::BlankCanvas);
    assert_eq!(report.placed, 1);
    assert_eq!(report.placeholders, 0);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].index, 1);
    assert_eq!(report.skipped[0].label, "B");

    let (doc, page_id) = first_page(&bytes);
    let mbox = media_box(&doc, page_id);
    assert!((mbox[2] - mm_to_pt(329.0)).abs() < 0.01);
    assert!((mbox[3] - mm_to_pt(483.0)).abs() < 0.01);

    let ops = operators(&doc, page_id);
    assert!(ops.iter().filter(|o| *o == "l").count() >= 33 + 49);
    assert_eq!(ops.iter().filter(|o| *o == "Do").count(), 1);
}

#[test]
fn transparent_label_gets_soft_mask() {
    let dir = tempfile::tempdir().unwrap();
    let label = write_png(dir.path(), "clear.png", 128);
    let request = CompositionRequest {
        bed: BedSize::new(100.0, 100.0).unwrap(),
        base_layer: None,
        placements: vec![slot("A", 10.0, 10.0, 40.0, 40.0, Some(label))],
    };

    let (bytes, _) = compose_to_bytes(&request).unwrap();
    let doc = Document::load_mem(&bytes).unwrap();
    let has_mask = doc.objects.values().any(|obj| {
        obj.as_stream()
            .map(|s| s.dict.has(b"SMask"))
            .unwrap_or(false)
    });
    assert!(has_mask);
}

#[test]
fn pdf_label_renders_placeholder_text() {
    let dir = tempfile::tempdir().unwrap();
    let label = dir.path().join("label.pdf");
    std::fs::write(&label, b"%PDF-1.4\n").unwrap();
    let request = CompositionRequest {
        bed: BedSize::new(100.0, 100.0).unwrap(),
        base_layer: None,
        placements: vec![slot("A", 10.0, 10.0, 40.0, 40.0, Some(label))],
    };

    let (bytes, report) = compose_to_bytes(&request).unwrap();
    assert_eq!(report.placeholders, 1);
    assert_eq!(report.placed, 0);

    let (doc, page_id) = first_page(&bytes);
    let ops = operators(&doc, page_id);
    assert!(ops.contains(&"re".to_string()));
    assert!(ops.contains(&"Tj".to_string()));
}

#[test]
fn overlay_keeps_base_content_and_size() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_base(dir.path(), 612.0, 792.0);
    let label = write_png(dir.path(), "a.png", 255);
    let request = CompositionRequest {
        bed: BedSize::new(100.0, 200.0).unwrap(),
        base_layer: Some(base),
        placements: vec![slot("A", 10.0, 10.0, 30.0, 30.0, Some(label))],
    };

    let (bytes, report) = compose_to_bytes(&request).unwrap();
    assert_eq!(report.mode, CompositionMode::Overlay);
    assert!((report.page_width_pt - 612.0).abs() < 1e-6);
    assert!((report.page_height_pt - 792.0).abs() < 1e-6);

    let (doc, page_id) = first_page(&bytes);
    let ops = operators(&doc, page_id);
    assert!(ops.contains(&"f".to_string()), "base drawing survives");
    assert_eq!(ops.iter().filter(|o| *o == "Do").count(), 1);
    assert!(!ops.contains(&"S".to_string()), "no grid over a base layer");
}

#[test]
fn missing_base_layer_falls_back_to_blank_canvas() {
    let dir = tempfile::tempdir().unwrap();
    let request = CompositionRequest {
        bed: BedSize::new(100.0, 100.0).unwrap(),
        base_layer: Some(dir.path().join("absent.pdf")),
        placements: vec![],
    };
    let (_, report) = compose_to_bytes(&request).unwrap();
    assert_eq!(report.mode, CompositionMode::BlankCanvas);
}

#[test]
fn corrupt_base_layer_fails() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.pdf");
    std::fs::write(&base, b"not a pdf at all").unwrap();
    let request = CompositionRequest {
        bed: BedSize::new(100.0, 100.0).unwrap(),
        base_layer: Some(base),
        placements: vec![],
    };
    assert!(matches!(
        compose_to_bytes(&request),
        Err(ComposeError::BaseLayer { .. })
    ));
}

#[test]
fn invalid_bed_is_rejected() {
    let request = CompositionRequest {
        bed: BedSize {
            width_mm: 0.0,
            height_mm: 100.0,
        },
        base_layer: None,
        placements: vec![],
    };
    assert!(matches!(
        compose_to_bytes(&request),
        Err(ComposeError::InvalidBed(_))
    ));
}

#[test]
fn compose_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("composed").join("job_42.pdf");
    let request = CompositionRequest {
        bed: BedSize::new(100.0, 100.0).unwrap(),
        base_layer: None,
        placements: vec![slot("A", 0.0, 0.0, 10.0, 10.0, None)],
    };

    let report = compose(&request, &output).unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert!(output.is_file());
    assert!(!output.with_extension("pdf.tmp").exists());
    Document::load(&output).unwrap();
}
