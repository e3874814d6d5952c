// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the bildwerk-document image engines: decoding a
// Flate-compressed RGB image with a soft mask, and locating images on a page
// that draws one image many times.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use bildwerk_document::{PdfSession, materialize};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Add a `size` x `size` gradient image with a matching soft mask.
fn add_masked_image(doc: &mut Document, size: i64) -> ObjectId {
    let pixels = (size * size) as usize;
    let mut mask = Stream::new(
        dictionary! {
            "Type" => "XObject", "Subtype" => "Image",
            "Width" => size, "Height" => size,
            "ColorSpace" => "DeviceGray", "BitsPerComponent" => 8,
        },
        (0..pixels).map(|i| (i % 256) as u8).collect(),
    );
    let _ = mask.compress();
    let mask_id = doc.add_object(mask);

    let mut image = Stream::new(
        dictionary! {
            "Type" => "XObject", "Subtype" => "Image",
            "Width" => size, "Height" => size,
            "ColorSpace" => "DeviceRGB", "BitsPerComponent" => 8,
            "Decode" => vec![
                Object::Integer(1), Object::Integer(0),
                Object::Integer(1), Object::Integer(0),
                Object::Integer(1), Object::Integer(0),
            ],
            "SMask" => mask_id,
        },
        (0..pixels * 3).map(|i| (i % 251) as u8).collect(),
    );
    let _ = image.compress();
    doc.add_object(image)
}

/// One-page document drawing a single image `draws` times on a grid.
fn busy_page(draws: usize) -> Document {
    let mut doc = Document::with_version("1.5");
    let image = add_masked_image(&mut doc, 4);

    let mut ops = String::new();
    for i in 0..draws {
        let (x, y) = ((i % 20) * 30, (i / 20) * 30);
        ops.push_str(&format!("q 25 0 0 25 {} {} cm /Im0 Do Q\n", x, y));
    }
    let content = doc.add_object(Stream::new(dictionary! {}, ops.into_bytes()));

    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
        "Resources" => dictionary! { "XObject" => dictionary! { "Im0" => image } },
        "Contents" => content,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog);
    doc
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Full materialization of a 256x256 inverted RGB image with soft mask:
/// inflate, sample unpacking, Decode inversion and alpha attachment.
fn bench_materialize(c: &mut Criterion) {
    let mut doc = Document::with_version("1.5");
    let id = add_masked_image(&mut doc, 256);

    c.bench_function("materialize (256x256 RGB + SMask)", |b| {
        b.iter(|| {
            let image = materialize(black_box(&doc), black_box(id)).expect("materialize failed");
            black_box(image);
        });
    });
}

/// Content-stream walk for a page that draws one image 400 times.
fn bench_locate(c: &mut Criterion) {
    let session = PdfSession::from_document(busy_page(400)).expect("session failed");

    c.bench_function("locate_images (400 draws)", |b| {
        b.iter(|| {
            let placements = session.locate_images(black_box(0)).expect("locate failed");
            assert_eq!(placements.len(), 400);
            black_box(placements);
        });
    });
}

criterion_group!(benches, bench_materialize, bench_locate);
criterion_main!(benches);
