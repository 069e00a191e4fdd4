//! Shared fixtures for the integration suite.

// Each test binary compiles its own copy of this module and calls a subset.
#![allow(dead_code)]

use openpmd::prelude::*;

/// Route log output through the per-test capture buffer.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A fresh series over an in-memory backend, plus an observer handle
/// sharing that backend's state.
pub fn create_series(name: &str, encoding: IterationEncoding) -> (Series, MemoryBackend) {
    init_tracing();
    let backend = MemoryBackend::new();
    let observer = backend.clone();
    let series = Series::create(Box::new(backend), name, encoding);
    (series, observer)
}

/// Open the series stored in the state behind `observer`.
pub fn open_series(
    name: &str,
    encoding: IterationEncoding,
    observer: &MemoryBackend,
) -> Result<Series> {
    init_tracing();
    Series::open(Box::new(observer.clone()), name, encoding)
}

/// Root attributes a well-formed group-based file carries.
///
/// Read-path tests seed state directly through the [`Backend`] trait, the
/// way a foreign writer would have produced it.
pub fn seed_group_based_root(backend: &mut MemoryBackend, file: &str, version: &str) {
    init_tracing();
    let root = backend.create_file(file).unwrap();
    backend
        .write_attribute(root, "openPMD", &Value::String(version.into()))
        .unwrap();
    backend
        .write_attribute(root, "openPMDextension", &Value::Uint32(0))
        .unwrap();
    backend
        .write_attribute(root, "basePath", &Value::String("/data/%T/".into()))
        .unwrap();
    backend
        .write_attribute(root, "iterationEncoding", &Value::String("groupBased".into()))
        .unwrap();
    backend
        .write_attribute(root, "iterationFormat", &Value::String("/data/%T/".into()))
        .unwrap();
}

/// Add an iteration group with the three required time attributes.
pub fn seed_iteration(backend: &mut MemoryBackend, file: &str, label: &str) {
    let root = backend.open_file(file).unwrap();
    let group = backend.create_path(root, &format!("data/{label}")).unwrap();
    backend
        .write_attribute(group, "dt", &Value::Double(1.0))
        .unwrap();
    backend
        .write_attribute(group, "time", &Value::Double(0.0))
        .unwrap();
    backend
        .write_attribute(group, "timeUnitSI", &Value::Double(1.0))
        .unwrap();
}
