//! Benchmarks for ragsift core operations

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ragsift::backend::{IndexEntry, MemoryIndex, VectorIndexClient};
use ragsift::chunker::SimpleChunker;
use ragsift::embedding::HashedEmbedding;
use ragsift::retrieval::{
    passes, plan_fetch_width, rank, Chunk, ChunkId, ChunkSnapshot, DocumentId, Metadata,
    MetadataValue, QuerySettings, ScoredCandidate, TagSet,
};

const TAGS: &[&str] = &["research", "ai", "biz", "other", "draft"];

fn make_chunk(i: usize) -> Arc<Chunk> {
    let document_id = DocumentId::new();
    let tags: TagSet = [TAGS[i % TAGS.len()], TAGS[(i / 2) % TAGS.len()]]
        .iter()
        .map(|t| t.to_string())
        .collect();
    let mut metadata = Metadata::new();
    metadata.insert("year".to_string(), MetadataValue::from(2020 + (i % 5) as i64));
    metadata.insert("author".to_string(), MetadataValue::from(format!("author-{}", i % 7)));

    Arc::new(Chunk {
        id: ChunkId::new(document_id, 0),
        document_id,
        index: 0,
        text: format!("Chunk {} about vector retrieval and metadata filtering", i),
        snapshot: Arc::new(ChunkSnapshot::new(
            document_id,
            format!("doc-{}.md", i),
            tags,
            metadata,
        )),
    })
}

/// Candidate pool in descending score order
fn make_pool(size: usize) -> Vec<ScoredCandidate> {
    (0..size)
        .map(|i| ScoredCandidate {
            chunk: make_chunk(i),
            score: 1.0 - i as f32 / size as f32,
        })
        .collect()
}

fn bench_plan(c: &mut Criterion) {
    let unfiltered = QuerySettings::new(8, 0.0);
    let filtered = QuerySettings::new(8, 0.0)
        .with_tags(["research"])
        .with_metadata("year", 2024);

    c.bench_function("plan_fetch_width", |bencher| {
        bencher.iter(|| {
            black_box(plan_fetch_width(black_box(&unfiltered)));
            black_box(plan_fetch_width(black_box(&filtered)))
        });
    });
}

fn bench_filter(c: &mut Criterion) {
    let chunk = make_chunk(3);
    let tag_filter: TagSet = ["ai", "other"].iter().map(|t| t.to_string()).collect();
    let mut metadata_filter = Metadata::new();
    metadata_filter.insert("year".to_string(), MetadataValue::from(2023));
    metadata_filter.insert("author".to_string(), MetadataValue::from("author-3"));

    c.bench_function("filter_passes", |bencher| {
        bencher.iter(|| {
            black_box(passes(
                black_box(&chunk.snapshot),
                black_box(&tag_filter),
                black_box(&metadata_filter),
            ))
        });
    });
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    let pool = make_pool(20);

    let unfiltered = QuerySettings::new(10, 0.0);
    group.bench_function("unfiltered_20", |bencher| {
        bencher.iter(|| black_box(rank(pool.clone(), &unfiltered)));
    });

    let filtered = QuerySettings::new(10, 0.2).with_tags(["research", "ai"]);
    group.bench_function("filtered_20", |bencher| {
        bencher.iter(|| black_box(rank(pool.clone(), &filtered)));
    });

    let mut shuffled = pool.clone();
    shuffled.reverse();
    group.bench_function("unsorted_20", |bencher| {
        bencher.iter(|| black_box(rank(shuffled.clone(), &filtered)));
    });

    group.finish();
}

fn bench_chunking(c: &mut Criterion) {
    let text = "Retrieval quality depends on chunk boundaries. ".repeat(250);
    let chunker = SimpleChunker::new(256, 32);

    c.bench_function("simple_chunk_12kb", |bencher| {
        bencher.iter(|| black_box(chunker.chunk(black_box(&text))));
    });
}

fn bench_hashed_embedding(c: &mut Criterion) {
    let model = HashedEmbedding::new(384).unwrap();
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);

    c.bench_function("hashed_embed_384d", |bencher| {
        bencher.iter(|| black_box(model.embed_one(black_box(&text))));
    });
}

fn bench_memory_search(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let model = HashedEmbedding::new(384).unwrap();
    let query = model.embed_one("vector retrieval with metadata");

    let mut group = c.benchmark_group("memory_search");

    for size in [1000, 10000].iter() {
        let index = MemoryIndex::new(384);
        let entries: Vec<IndexEntry> = (0..*size)
            .map(|i| {
                let chunk = make_chunk(i);
                let vector = model.embed_one(&chunk.text);
                IndexEntry { chunk, vector }
            })
            .collect();
        rt.block_on(index.upsert(entries)).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(rt.block_on(index.search(&query, 20)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_plan,
    bench_filter,
    bench_rank,
    bench_chunking,
    bench_hashed_embedding,
    bench_memory_search,
);

criterion_main!(benches);
