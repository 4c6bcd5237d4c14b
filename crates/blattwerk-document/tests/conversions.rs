// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end checks of the registry and the page engine through the public
// API only.

use blattwerk_core::{
    ConversionRequest, ConversionResult, ConverterConfig, ErrorKind, InputFile, ResultKind,
};
use blattwerk_document::pdf::handle::{LoadOptions, SaveOptions};
use blattwerk_document::pdf::pages;
use blattwerk_document::pdf::{CompressionLevel, compress};
use blattwerk_document::text::{extract_text, page_runs, page_texts};
use blattwerk_document::{Capabilities, DocumentHandle, Registry, compare};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};

// -- Fixtures -----------------------------------------------------------------

/// A PDF whose pages are `(marker, width, height)`, each marker drawn in
/// Helvetica 12pt at (72, 700).
fn pdf(pages: &[(&str, f32, f32)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::new();
    for (marker, width, height) in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*marker)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(*width), Object::Real(*height)],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn letter(markers: &[&str]) -> Vec<u8> {
    let pages: Vec<(&str, f32, f32)> = markers.iter().map(|m| (*m, 612.0, 792.0)).collect();
    pdf(&pages)
}

fn open(bytes: &[u8]) -> DocumentHandle {
    DocumentHandle::load(bytes, LoadOptions::default()).unwrap()
}

fn registry() -> Registry {
    Registry::standard(Capabilities::standard(), ConverterConfig::default().without_delay())
}

async fn run(operation: &str, inputs: Vec<InputFile>, options: &[(&str, &str)]) -> Result<Vec<ConversionResult>, blattwerk_core::BlattwerkError> {
    let mut request = ConversionRequest::new(operation, inputs);
    for (key, value) in options {
        request = request.with_option(key, *value);
    }
    registry().execute(request).await
}

fn sizes(handle: &DocumentHandle) -> Vec<(f32, f32)> {
    (0..handle.page_count())
        .map(|i| {
            let geometry = handle.page_geometry(i).unwrap();
            (geometry.width(), geometry.height())
        })
        .collect()
}

// -- Page engine --------------------------------------------------------------

#[test]
fn split_then_merge_keeps_pages_and_sizes() {
    let original = open(&pdf(&[("A", 612.0, 792.0), ("B", 842.0, 595.0), ("C", 300.0, 400.0)]));
    let parts = pages::split(&original).unwrap();
    assert_eq!(parts.len(), 3);
    assert!(parts.iter().all(|part| part.page_count() == 1));

    let merged = pages::merge(&parts).unwrap();
    assert_eq!(sizes(&merged), sizes(&original));
    assert_eq!(page_texts(&merged).unwrap(), vec!["A", "B", "C"]);
}

#[test]
fn extract_and_remove_are_complements() {
    let handle = open(&letter(&["1", "2", "3", "4", "5"]));
    let selection = pages::parse_page_selection("2,4-5", handle.page_count()).unwrap();
    let kept = pages::extract_subset(&handle, &selection).unwrap();
    let dropped = pages::remove_subset(&handle, &selection).unwrap();
    assert_eq!(kept.page_count() + dropped.page_count(), handle.page_count());
    assert_eq!(page_texts(&kept).unwrap(), vec!["2", "4", "5"]);
    assert_eq!(page_texts(&dropped).unwrap(), vec!["1", "3"]);
}

#[test]
fn four_quarter_turns_restore_rotation() {
    let mut handle = open(&letter(&["A", "B"]));
    for _ in 0..4 {
        pages::rotate(&mut handle, 90).unwrap();
    }
    let saved = open(&handle.save(SaveOptions::default()).unwrap());
    for index in 0..saved.page_count() {
        assert_eq!(saved.page_geometry(index).unwrap().rotation, 0);
    }
}

#[test]
fn extreme_compression_shrinks_at_least_as_much_as_less() {
    let source = letter(&["A", "B", "C"]);
    let shrink = |level| {
        let mut handle = open(&source);
        let options = compress::apply(&mut handle, level).unwrap();
        let width = handle.page_geometry(0).unwrap().width();
        (width, handle.save(options).unwrap().len())
    };
    let (extreme_width, extreme_len) = shrink(CompressionLevel::Extreme);
    let (less_width, less_len) = shrink(CompressionLevel::Less);
    assert!(extreme_width < less_width);
    assert!(extreme_len <= less_len, "{extreme_len} > {less_len}");
}

#[test]
fn a_document_compares_identical_to_itself() {
    let doc = letter(&["alpha", "beta"]);
    let report = compare("d.pdf", &doc, "d.pdf", &doc).unwrap();
    assert!(report.is_identical());
    assert_eq!(report.delta, 0);
}

#[test]
fn text_runs_land_in_pixel_space() {
    let handle = open(&letter(&["A"]));
    let runs = page_runs(&handle, 0, 2.0).unwrap();
    assert_eq!(runs.len(), 1);
    assert!((runs[0].x - 144.0).abs() < 0.01, "{:?}", runs[0]);
    assert!((runs[0].baseline() - 184.0).abs() < 0.01, "{:?}", runs[0]);
}

// -- Registry -----------------------------------------------------------------

#[tokio::test]
async fn reorder_scenario_moves_the_last_page_first() {
    let input = InputFile::new("abc.pdf", letter(&["A", "B", "C"]));
    let results = run("reorder", vec![input], &[("order", "3,1,2")]).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].filename, "abc-reordered.pdf");
    assert_eq!(page_texts(&open(results[0].payload.as_bytes())).unwrap(), vec!["C", "A", "B"]);
}

#[tokio::test]
async fn split_parts_merge_back_in_the_given_order() {
    let input = InputFile::new("abc.pdf", letter(&["A", "B", "C"]));
    let parts = run("split", vec![input], &[]).await.unwrap();
    let names: Vec<&str> = parts.iter().map(|part| part.filename.as_str()).collect();
    assert_eq!(names, vec!["abc-page-1.pdf", "abc-page-2.pdf", "abc-page-3.pdf"]);

    let reordered = [2, 0, 1]
        .iter()
        .map(|&i| InputFile::new(parts[i].filename.clone(), parts[i].payload.as_bytes().to_vec()))
        .collect();
    let merged = run("merge", reordered, &[]).await.unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(page_texts(&open(merged[0].payload.as_bytes())).unwrap(), vec!["C", "A", "B"]);
}

#[tokio::test]
async fn draft_watermark_is_diagonal_translucent_and_centred() {
    let input = InputFile::new("memo.pdf", letter(&["body"]));
    let results = run("watermark", vec![input], &[("text", "DRAFT"), ("opacity", "0.4")])
        .await
        .unwrap();
    let handle = open(results[0].payload.as_bytes());

    let content = Content::decode(&handle.page_content(0).unwrap()).unwrap();
    let tm = content
        .operations
        .iter()
        .rev()
        .find(|op| op.operator == "Tm")
        .expect("watermark text matrix");
    let m: Vec<f32> = tm.operands.iter().map(|o| o.as_float().unwrap()).collect();
    let diagonal = std::f32::consts::FRAC_1_SQRT_2;
    assert!((m[0] - diagonal).abs() < 1e-3 && (m[1] - diagonal).abs() < 1e-3, "{m:?}");

    // The text box centre sits on the page centre: dy - dx equals the
    // rotated cap height.
    let (dx, dy) = (306.0 - m[4], 396.0 - m[5]);
    assert!(dx > 0.0 && dy > 0.0, "{m:?}");
    assert!((dy - dx - 2.0 * diagonal * 60.0 * 0.72 / 2.0).abs() < 0.05, "{m:?}");

    let gs = content
        .operations
        .iter()
        .find(|op| op.operator == "gs")
        .expect("graphics state");
    let gs_name = gs.operands[0].as_name().unwrap();
    let page = handle.document().get_dictionary(handle.page_id(0).unwrap()).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let states = resources.get(b"ExtGState").unwrap().as_dict().unwrap();
    let state = states.get(gs_name).unwrap().as_dict().unwrap();
    assert!((state.get(b"ca").unwrap().as_float().unwrap() - 0.4).abs() < 1e-3);
}

#[tokio::test]
async fn csv_defaults_to_landscape_pages() {
    let input = InputFile::new("table.csv", "name,qty\nbolts,40\nnuts,12\n");
    let results = run("convert:csv:pdf", vec![input], &[]).await.unwrap();
    assert_eq!(results[0].filename, "table.pdf");
    let (width, height) = sizes(&open(results[0].payload.as_bytes()))[0];
    assert!(width > height);
}

#[tokio::test]
async fn csv_rows_survive_as_aligned_text() {
    let input = InputFile::new("grid.csv", "a,b,c\n1,2,3\n");
    let results = run("convert:csv:pdf", vec![input], &[]).await.unwrap();
    let text = page_texts(&open(results[0].payload.as_bytes())).unwrap().join("\n");
    assert!(text.contains("a  |  b  |  c"), "{text}");
    assert!(text.contains("1  |  2  |  3"), "{text}");
}

#[tokio::test]
async fn markdown_bullets_and_accents_read_back() {
    let input = InputFile::new("list.md", "# Head\n- item \u{e9}\nbody text\n");
    let results = run("convert:md:pdf", vec![input], &[]).await.unwrap();
    let text = extract_text(results[0].payload.as_bytes()).unwrap();
    assert!(text.contains("\u{2022} item \u{e9}"), "{text}");
    assert!(!text.contains('\u{e2}'), "{text}");
}

#[tokio::test]
async fn unknown_operation_is_unsupported() {
    let err = run("convert:pdf:dwg", vec![InputFile::new("a.pdf", letter(&["A"]))], &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
}

#[tokio::test]
async fn simulated_results_are_labelled() {
    let simulated = run("convert:pptx:pdf", vec![InputFile::new("deck.pptx", vec![1u8; 8])], &[])
        .await
        .unwrap();
    assert_eq!(simulated[0].kind, ResultKind::Simulated);
    assert_eq!(simulated[0].filename, "deck.pdf");

    let converted = run("convert:txt:pdf", vec![InputFile::new("notes.txt", "hello")], &[])
        .await
        .unwrap();
    assert_eq!(converted[0].kind, ResultKind::Converted);
}

#[tokio::test]
async fn rendering_without_a_renderer_is_dependency_unavailable() {
    let input = InputFile::new("a.pdf", letter(&["A"]));
    for operation in ["convert:pdf:png", "preview"] {
        let err = run(operation, vec![input.clone()], &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DependencyUnavailable, "{operation}");
    }
}

#[tokio::test]
async fn pdf_to_text_round_trips_markers() {
    let input = InputFile::new("abc.pdf", letter(&["first", "second"]));
    let results = run("convert:pdf:txt", vec![input], &[]).await.unwrap();
    let text = results[0].payload.as_text().unwrap();
    assert!(text.contains("first") && text.contains("second"), "{text}");
    assert_eq!(results[0].sha256.len(), 64);
}
