//! Indexing round trips and snapshot sources

mod common;

use common::*;
use leakgraph_core::config::AnalysisConfig;
use leakgraph_core::features::analysis::HeapAnalyzer;
use leakgraph_core::features::heap_graph::HeapGraph;
use leakgraph_core::features::hprof::{
    FieldType, FileSnapshotSource, GcRoot, HeapDumpBuilder, HeapValue, IdentifierSize,
    MmapSnapshotSource, PrimitiveArrayValues, PrimitiveType, SnapshotSource,
};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

/// A little of everything: strings, arrays, statics, a thread
fn mixed_dump(builder: &mut HeapDumpBuilder) -> (u64, u64, u64) {
    let config = builder.class(
        "com.example.Config",
        &[
            ("name", FieldType::Object),
            ("retries", FieldType::Primitive(PrimitiveType::Int)),
            ("timeout", FieldType::Primitive(PrimitiveType::Long)),
        ],
    );
    let name = builder.string("primary");
    let instance = builder.instance(
        config,
        &[
            ("name", HeapValue::Object(name)),
            ("retries", HeapValue::Int(3)),
            ("timeout", HeapValue::Long(30_000)),
        ],
    );
    let ints = builder.primitive_array(PrimitiveArrayValues::Int(vec![1, 2, 3, 4]));
    let array = builder.object_array("com.example.Config", &[instance, 0, instance]);
    builder
        .static_field(config, "DEFAULT", HeapValue::Object(array))
        .unwrap();
    builder.root(GcRoot::StickyClass { id: config });
    builder.thread("main");
    (instance, ints, array)
}

fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_indexed_objects_hydrate_to_what_was_written() {
    for id_size in [IdentifierSize::U4, IdentifierSize::U8] {
        let mut builder = HeapDumpBuilder::with_identifier_size(id_size);
        let (instance, ints, array) = mixed_dump(&mut builder);
        let graph = graph_of(&builder);

        assert_eq!(graph.id_size(), id_size);
        let config = graph.instance(instance).unwrap();
        assert_eq!(config.field("retries"), Some(HeapValue::Int(3)));
        assert_eq!(config.field("timeout"), Some(HeapValue::Long(30_000)));
        let name = config.object_field("name").unwrap();
        assert_eq!(graph.read_string_by_id(name).unwrap().as_deref(), Some("primary"));

        let ints = graph.object(ints).unwrap();
        assert_eq!(ints.as_primitive_array().unwrap().len(), 4);
        let array = graph.object(array).unwrap();
        assert_eq!(array.as_object_array().unwrap().element_ids, vec![instance, 0, instance]);
    }
}

#[test]
fn test_segmented_dump_indexes_the_same() {
    let mut single = HeapDumpBuilder::new();
    mixed_dump(&mut single);
    let mut split = HeapDumpBuilder::new().records_per_segment(2);
    mixed_dump(&mut split);

    let a = graph_of(&single);
    let b = graph_of(&split);
    assert_eq!(a.index().counts(), b.index().counts());
    assert_eq!(a.gc_roots().len(), b.gc_roots().len());
    assert_eq!(a.object_count(), b.object_count());
}

#[test]
fn test_file_and_mmap_sources_match_memory() {
    let StaticLeak { builder, leak, .. } = static_field_leak();
    let bytes = builder.build().unwrap();
    let file = write_temp(&bytes);

    let sources: Vec<Box<dyn SnapshotSource>> = vec![
        Box::new(source_of(&builder)),
        Box::new(FileSnapshotSource::open(file.path()).unwrap()),
        Box::new(MmapSnapshotSource::open(file.path()).unwrap()),
    ];

    let mut signatures = Vec::new();
    for source in sources {
        assert_eq!(source.len(), bytes.len() as u64);
        let result = HeapAnalyzer::new().analyze(source, &fixed_finder(&[leak]), &[], true, &[]);
        let success = assert_success(&result);
        assert!(success.metadata.source_stats.bytes_read > 0);
        signatures.push(success.application_leaks[0].signature.clone());
    }
    assert_eq!(signatures[0], signatures[1]);
    assert_eq!(signatures[1], signatures[2]);
}

#[test]
fn test_file_source_reports_its_path() {
    let StaticLeak { builder, .. } = static_field_leak();
    let file = write_temp(&builder.build().unwrap());
    let graph = HeapGraph::open(
        Box::new(FileSnapshotSource::open(file.path()).unwrap()),
        &AnalysisConfig::default(),
    )
    .unwrap();
    assert!(graph.description().contains(&file.path().display().to_string()));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = FileSnapshotSource::open(dir.path().join("absent.hprof")).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}
