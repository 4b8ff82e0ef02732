//! Well-known names and numeric defaults
//!
//! Class names are in the normalized dotted form produced by the indexer.

/// JDK class names the analysis relies on
pub mod jdk {
    pub const OBJECT: &str = "java.lang.Object";
    pub const STRING: &str = "java.lang.String";
    pub const THREAD: &str = "java.lang.Thread";
    pub const REFERENCE: &str = "java.lang.ref.Reference";
    pub const FINALIZER_REFERENCE: &str = "java.lang.ref.FinalizerReference";
    pub const FINALIZER: &str = "java.lang.ref.Finalizer";

    /// `java.lang.String` coder for Latin-1 encoded `byte[]` values
    pub const STRING_CODER_LATIN1: i8 = 0;
}

/// Defaults for the keyed weak reference watcher convention
pub mod watcher {
    /// Reference subclass placed by instrumentation around watched objects
    pub const KEYED_WEAK_REFERENCE: &str = "leakcanary.KeyedWeakReference";

    /// Legacy name of the same class
    pub const LEGACY_KEYED_WEAK_REFERENCE: &str = "com.squareup.leakcanary.KeyedWeakReference";

    /// Field set to -1 while the object is still expected to be garbage collected
    pub const RETAINED_UPTIME_FIELD: &str = "retainedUptimeMillis";
}

/// Edge names used in traces and structural paths
pub mod edges {
    /// Structural name for any array element (indices are not stable)
    pub const ARRAY_ELEMENT: &str = "[]";
}
