use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use notedown_engine::bridge::{from_markdown, to_markdown};
use notedown_engine::NodeKind;
use notedown_engine::outline::{collapse, collapsed_headings, compute_visibility};
use pulldown_cmark::Parser;
mod common;

fn bench_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("import");
    group.sample_size(10);

    for size in [10, 100] {
        let content = common::generate_markdown_content(size);
        group.bench_with_input(BenchmarkId::new("from_markdown", size), &content, |b, content| {
            b.iter(|| std::hint::black_box(from_markdown(std::hint::black_box(content))));
        });
        group.bench_with_input(BenchmarkId::new("pulldown_cmark", size), &content, |b, content| {
            b.iter(|| {
                let events: Vec<_> = Parser::new(std::hint::black_box(content)).collect();
                std::hint::black_box(events);
            });
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    group.sample_size(10);

    let doc = from_markdown(&common::generate_markdown_content(100));
    group.bench_function("to_markdown", |b| {
        b.iter(|| std::hint::black_box(to_markdown(std::hint::black_box(&doc))));
    });

    group.finish();
}

fn bench_visibility(c: &mut Criterion) {
    let mut doc = from_markdown(&common::generate_sections(50, 4));
    let second_level: Vec<_> = doc
        .root_children()
        .iter()
        .copied()
        .filter(|k| matches!(doc.kind(*k), Some(NodeKind::Heading { level: 2 })))
        .collect();
    for key in second_level {
        collapse(&mut doc, key).expect("top-level heading");
    }
    let collapsed = collapsed_headings(&doc);
    c.bench_function("compute_visibility", |b| {
        b.iter(|| std::hint::black_box(compute_visibility(&doc, &collapsed)));
    });
}

criterion_group!(benches, bench_import, bench_export, bench_visibility);
criterion_main!(benches);
