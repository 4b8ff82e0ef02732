//! Heap dump fixtures
//!
//! Each fixture returns the builder plus the ids tests assert on, so a test
//! can still add objects before encoding.

use leakgraph_core::features::hprof::{FieldType, GcRoot, HeapDumpBuilder, HeapValue, PrimitiveType};
use leakgraph_core::shared::constants::watcher;

pub struct StaticLeak {
    pub builder: HeapDumpBuilder,
    pub holder_class: u64,
    pub leak: u64,
}

/// `Registry.INSTANCE -> Session`, with Registry a system class
pub fn static_field_leak() -> StaticLeak {
    let mut builder = HeapDumpBuilder::new();
    let holder_class = builder.class("com.example.Registry", &[]);
    let session = builder.class("com.example.Session", &[("id", FieldType::Primitive(PrimitiveType::Int))]);
    let leak = builder.instance(session, &[("id", HeapValue::Int(7))]);
    builder
        .static_field(holder_class, "INSTANCE", HeapValue::Object(leak))
        .expect("class declared above");
    builder.root(GcRoot::StickyClass { id: holder_class });
    StaticLeak { builder, holder_class, leak }
}

pub struct ExclusionLeak {
    pub builder: HeapDumpBuilder,
    pub leak: u64,
    /// Root to leak through `Node.next`, five elements
    pub long_path: Vec<u64>,
}

/// Two ways to the leak: `WeakHolder.weak` (two elements) and a chain of
/// `Node.next` (five elements)
pub fn excluded_shortcut() -> ExclusionLeak {
    let mut builder = HeapDumpBuilder::new();
    let weak_holder = builder.class("com.example.WeakHolder", &[("weak", FieldType::Object)]);
    let node = builder.class("com.example.Node", &[("next", FieldType::Object)]);
    let leak_class = builder.class("com.example.Activity", &[]);

    let leak = builder.instance(leak_class, &[]);
    let n3 = builder.instance(node, &[("next", HeapValue::Object(leak))]);
    let n2 = builder.instance(node, &[("next", HeapValue::Object(n3))]);
    let n1 = builder.instance(node, &[("next", HeapValue::Object(n2))]);
    let holder = builder.instance(weak_holder, &[("weak", HeapValue::Object(leak))]);

    builder.root(GcRoot::JniGlobal { id: holder, jni_global_ref_id: 1 });
    builder.root(GcRoot::JniGlobal { id: n1, jni_global_ref_id: 2 });
    ExclusionLeak {
        builder,
        leak,
        long_path: vec![n1, n2, n3, leak],
    }
}

pub struct Diamond {
    pub builder: HeapDumpBuilder,
    pub root: u64,
    pub left: u64,
    pub right: u64,
    pub bottom: u64,
}

/// `root.left -> bottom`, `root.right -> bottom`
///
/// Shallow sizes with 4-byte ids: root 8, left 4, right 4, bottom 4.
pub fn diamond() -> Diamond {
    let mut builder = HeapDumpBuilder::new();
    let top = builder.class("com.example.Top", &[("left", FieldType::Object), ("right", FieldType::Object)]);
    let side = builder.class("com.example.Side", &[("bottom", FieldType::Object)]);
    let leaf = builder.class("com.example.Bottom", &[("value", FieldType::Primitive(PrimitiveType::Int))]);

    let bottom = builder.instance(leaf, &[("value", HeapValue::Int(1))]);
    let left = builder.instance(side, &[("bottom", HeapValue::Object(bottom))]);
    let right = builder.instance(side, &[("bottom", HeapValue::Object(bottom))]);
    let root = builder.instance(top, &[("left", HeapValue::Object(left)), ("right", HeapValue::Object(right))]);
    builder.root(GcRoot::Unknown { id: root });
    Diamond { builder, root, left, right, bottom }
}

/// Keyed weak reference to `referent`, as the watcher leaves it once the
/// object has been retained for `retained_uptime_millis`
pub fn keyed_reference(builder: &mut HeapDumpBuilder, referent: u64, retained_uptime_millis: i64) -> u64 {
    let keyed = builder.class(
        watcher::KEYED_WEAK_REFERENCE,
        &[
            ("referent", FieldType::Object),
            (watcher::RETAINED_UPTIME_FIELD, FieldType::Primitive(PrimitiveType::Long)),
        ],
    );
    builder.instance(
        keyed,
        &[
            ("referent", HeapValue::Object(referent)),
            (watcher::RETAINED_UPTIME_FIELD, HeapValue::Long(retained_uptime_millis)),
        ],
    )
}

/// `Holder.items -> Item[]` holding `count` items
pub fn growing_list(count: usize) -> HeapDumpBuilder {
    let mut builder = HeapDumpBuilder::new();
    let holder = builder.class("com.example.Holder", &[]);
    let item = builder.class("com.example.Item", &[]);
    let items: Vec<u64> = (0..count).map(|_| builder.instance(item, &[])).collect();
    let array = builder.object_array("com.example.Item", &items);
    builder
        .static_field(holder, "items", HeapValue::Object(array))
        .expect("class declared above");
    builder.root(GcRoot::StickyClass { id: holder });
    builder
}
