//! Placeholder handling in file-based filename patterns.
//!
//! Creating a file substitutes the first `%T` of the pattern; reopening
//! substitutes the last. With a single placeholder the two agree; with
//! more than one the series writes files it cannot find again, which is
//! why creation warns about such patterns.

mod common;

use common::{create_series, open_series};
use openpmd::prelude::*;
use openpmd::BackendError;

// =============================================================================
// Substitution
// =============================================================================

#[test]
fn creation_substitutes_the_first_placeholder() {
    let (mut series, observer) = create_series("sim_%T_%T.h5", IterationEncoding::FileBased);
    series.iterations.get_or_create(7);
    series.flush().unwrap();
    assert_eq!(observer.files(), vec!["sim_7_%T.h5".to_string()]);
}

#[test]
fn reopening_substitutes_the_last_placeholder() {
    let (mut series, _observer) = create_series("sim_%T_%T.h5", IterationEncoding::FileBased);
    series.iterations.get_or_create(7);
    series.flush().unwrap();

    // The file on disk is named after the first placeholder, so the
    // reopen lookup misses.
    let err = series.flush().unwrap_err();
    assert!(matches!(
        err,
        Error::Backend(BackendError::NoSuchFile(name)) if name == "sim_%T_7.h5"
    ));
}

#[test]
fn single_placeholder_patterns_reopen_cleanly() {
    let (mut series, observer) = create_series("sim_%T.h5", IterationEncoding::FileBased);
    series.iterations.get_or_create(7).0.set_time(1.0f64);
    series.flush().unwrap();

    series.iterations.get_mut(&7).unwrap().set_time(2.0f64);
    series.flush().unwrap();

    assert_eq!(observer.files(), vec!["sim_7.h5".to_string()]);
    assert_eq!(
        observer.attribute("sim_7.h5", "data/7", "time"),
        Some(Value::Double(2.0))
    );
}

// =============================================================================
// Discovery
// =============================================================================

#[test]
fn discovery_matches_around_the_first_placeholder() {
    let (mut series, observer) = create_series("sim_%T_%T.h5", IterationEncoding::FileBased);
    series.iterations.get_or_create(7);
    series.flush().unwrap();

    // "sim_7_%T.h5" has prefix "sim_", digits, then the literal suffix.
    let reread = open_series("sim_%T_%T.h5", IterationEncoding::FileBased, &observer).unwrap();
    assert_eq!(reread.iterations.len(), 1);
    assert!(reread.iterations.contains(&7));
}

#[test]
fn discovery_ignores_foreign_files() {
    let (mut series, observer) = create_series("sim_%T.h5", IterationEncoding::FileBased);
    series.iterations.get_or_create(12);
    series.flush().unwrap();

    // None of these match the pattern; matching any would fail the open
    // since they carry no root attributes.
    let mut stray = observer.clone();
    stray.create_file("other_34.h5").unwrap();
    stray.create_file("sim_34a.h5").unwrap();
    stray.create_file("sim_.h5").unwrap();

    let reread = open_series("sim_%T.h5", IterationEncoding::FileBased, &observer).unwrap();
    let keys: Vec<u64> = reread.iterations.keys().copied().collect();
    assert_eq!(keys, vec![12]);
}

#[test]
fn open_without_any_match_names_the_pattern() {
    common::init_tracing();
    let err = Series::open(
        Box::new(MemoryBackend::new()),
        "nothing_%T.h5",
        IterationEncoding::FileBased,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Backend(BackendError::NoSuchFile(name)) if name == "nothing_%T.h5"
    ));
}
