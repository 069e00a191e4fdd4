//! Malformed stored state surfaces as structured errors on open.

mod common;

use common::{open_series, seed_group_based_root, seed_iteration};
use openpmd::prelude::*;

fn seed_time_attributes(
    backend: &mut MemoryBackend,
    label: &str,
    attributes: &[(&str, Value)],
) {
    let root = backend.open_file("run.h5").unwrap();
    let group = backend.create_path(root, &format!("data/{label}")).unwrap();
    for (name, value) in attributes {
        backend.write_attribute(group, name, value).unwrap();
    }
}

// =============================================================================
// Iteration-level violations
// =============================================================================

#[test]
fn integral_dt_is_rejected_with_its_location() {
    let mut backend = MemoryBackend::new();
    seed_group_based_root(&mut backend, "run.h5", "1.0.1");
    seed_time_attributes(
        &mut backend,
        "5",
        &[
            ("dt", Value::Int32(3)),
            ("time", Value::Double(0.0)),
            ("timeUnitSI", Value::Double(1.0)),
        ],
    );

    let err = open_series("run.h5", IterationEncoding::GroupBased, &backend).unwrap_err();
    match err {
        Error::FormatViolation { path, reason } => {
            assert_eq!(path, "/5");
            assert!(reason.contains("`dt`"), "reason was: {reason}");
            assert!(reason.contains("Int32"), "reason was: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_time_unit_si_is_reported_by_name() {
    let mut backend = MemoryBackend::new();
    seed_group_based_root(&mut backend, "run.h5", "1.0.1");
    seed_time_attributes(
        &mut backend,
        "5",
        &[("dt", Value::Double(1.0)), ("time", Value::Double(0.0))],
    );

    let err = open_series("run.h5", IterationEncoding::GroupBased, &backend).unwrap_err();
    match err {
        Error::MissingAttribute { attribute, path } => {
            assert_eq!(attribute, "timeUnitSI");
            assert_eq!(path, "/5");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn non_decimal_iteration_groups_are_rejected() {
    let mut backend = MemoryBackend::new();
    seed_group_based_root(&mut backend, "run.h5", "1.0.1");
    let root = backend.open_file("run.h5").unwrap();
    backend.create_path(root, "data/banana").unwrap();

    let err = open_series("run.h5", IterationEncoding::GroupBased, &backend).unwrap_err();
    match err {
        Error::FormatViolation { path, reason } => {
            assert_eq!(path, "/");
            assert!(reason.contains("banana"), "reason was: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// Series-level violations
// =============================================================================

#[test]
fn foreign_base_paths_are_rejected() {
    let mut backend = MemoryBackend::new();
    seed_group_based_root(&mut backend, "run.h5", "1.0.1");
    let root = backend.open_file("run.h5").unwrap();
    backend
        .write_attribute(root, "basePath", &Value::String("/other/%T/".into()))
        .unwrap();
    seed_iteration(&mut backend, "run.h5", "0");

    let err = open_series("run.h5", IterationEncoding::GroupBased, &backend).unwrap_err();
    match err {
        Error::FormatViolation { path, reason } => {
            assert_eq!(path, "/");
            assert!(reason.contains("/other/%T/"), "reason was: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn root_attribute_types_are_checked() {
    let mut backend = MemoryBackend::new();
    seed_group_based_root(&mut backend, "run.h5", "1.0.1");
    let root = backend.open_file("run.h5").unwrap();
    backend
        .write_attribute(root, "openPMDextension", &Value::String("0".into()))
        .unwrap();
    seed_iteration(&mut backend, "run.h5", "0");

    let err = open_series("run.h5", IterationEncoding::GroupBased, &backend).unwrap_err();
    match err {
        Error::FormatViolation { path, reason } => {
            assert_eq!(path, "/");
            assert!(reason.contains("openPMDextension"), "reason was: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_root_attributes_are_reported_by_name() {
    // Everything but iterationFormat.
    common::init_tracing();
    let mut backend = MemoryBackend::new();
    let root = backend.create_file("run.h5").unwrap();
    for (name, value) in [
        ("openPMD", Value::String("1.0.1".into())),
        ("openPMDextension", Value::Uint32(0)),
        ("basePath", Value::String("/data/%T/".into())),
        ("iterationEncoding", Value::String("groupBased".into())),
    ] {
        backend.write_attribute(root, name, &value).unwrap();
    }

    let err = open_series("run.h5", IterationEncoding::GroupBased, &backend).unwrap_err();
    match err {
        Error::MissingAttribute { attribute, path } => {
            assert_eq!(attribute, "iterationFormat");
            assert_eq!(path, "/");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn stored_encoding_must_match_the_requested_one() {
    let mut backend = MemoryBackend::new();
    seed_group_based_root(&mut backend, "run.h5", "1.0.1");
    let root = backend.open_file("run.h5").unwrap();
    backend
        .write_attribute(root, "iterationEncoding", &Value::String("fileBased".into()))
        .unwrap();

    let err = open_series("run.h5", IterationEncoding::GroupBased, &backend).unwrap_err();
    assert!(err.is_format_violation());
}

#[test]
fn unknown_encodings_are_a_violation_not_a_crash() {
    let mut backend = MemoryBackend::new();
    seed_group_based_root(&mut backend, "run.h5", "1.0.1");
    let root = backend.open_file("run.h5").unwrap();
    backend
        .write_attribute(root, "iterationEncoding", &Value::String("variableBased".into()))
        .unwrap();

    let err = open_series("run.h5", IterationEncoding::GroupBased, &backend).unwrap_err();
    match err {
        Error::FormatViolation { reason, .. } => {
            assert!(reason.contains("variableBased"), "reason was: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}
