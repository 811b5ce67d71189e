//! Precedence tests for the include/ignore/structural combinator.

use std::fs;

use flowsync_core::SyncConfig;
use flowsync_filter::{FilterError, PathFilter, PathMatcher};
use rstest::rstest;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn includes(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Source precedence
// ---------------------------------------------------------------------------

#[test]
fn include_miss_excludes_file() {
    let list = includes(&["f/foo/*"]);
    let filter = PathFilter::new(Some(list.as_slice()), None).expect("filter");
    assert!(filter.is_excluded("f/bar/x.script.json", false));
    assert!(!filter.is_excluded("f/foo/x.script.json", false));
}

#[test]
fn deny_hit_excludes_file() {
    let filter = PathFilter::new(None, Some("f/bar/*\n")).expect("filter");
    assert!(filter.is_excluded("f/bar/x.script.json", false));
    assert!(!filter.is_excluded("f/baz/x.script.json", false));
}

#[test]
fn structural_rule_applies_without_sources() {
    let filter = PathFilter::structural_only();
    assert!(filter.is_excluded("other/x.json", false));
    assert!(filter.is_excluded("other", true));
    assert!(!filter.is_excluded("f/bar/x.script.json", false));
}

#[test]
fn both_sources_is_a_configuration_error() {
    let list = includes(&["f/**"]);
    let err = PathFilter::new(Some(list.as_slice()), Some("*.lock")).unwrap_err();
    assert!(matches!(err, FilterError::ConflictingSources));
}

#[test]
fn malformed_glob_is_a_configuration_error() {
    let list = includes(&["f/[unclosed"]);
    let err = PathFilter::new(Some(list.as_slice()), None).unwrap_err();
    assert!(matches!(err, FilterError::InvalidGlob { .. }));
}

// ---------------------------------------------------------------------------
// Structural rule
// ---------------------------------------------------------------------------

#[rstest]
#[case("", true, false)]
#[case("./", true, false)]
#[case("u", true, false)]
#[case("f", true, false)]
#[case("g", true, false)]
#[case("f/team", true, false)]
#[case("u/alice/nested", true, false)]
#[case(".wmill", true, true)]
#[case("node_modules", true, true)]
#[case("wmill.yaml", false, true)]
#[case("u/alice/job.py", false, false)]
#[case("g/all/sched.schedule.yaml", false, false)]
#[case("x/c.resource-type.yaml", false, false)]
#[case("c.resource-type.yaml", false, true)]
#[case("misc/", true, false)]
fn structural_cases(#[case] path: &str, #[case] is_dir: bool, #[case] excluded: bool) {
    assert_eq!(PathFilter::structural_only().is_excluded(path, is_dir), excluded, "{path}");
}

// ---------------------------------------------------------------------------
// Pattern semantics
// ---------------------------------------------------------------------------

#[rstest]
#[case("f/**", "f/a/b/c.flow/flow.yaml", false)]
#[case("f/*", "f/a/b.script.yaml", true)]
#[case("f/a/*.py", "f/a/job.py", false)]
#[case("u/**/*.variable.yaml", "f/a/x.variable.yaml", true)]
fn allow_list_globs(#[case] pattern: &str, #[case] path: &str, #[case] excluded: bool) {
    let list = includes(&[pattern]);
    let filter = PathFilter::new(Some(list.as_slice()), None).expect("filter");
    assert_eq!(filter.is_excluded(path, false), excluded, "{pattern} vs {path}");
}

#[rstest]
#[case("*.lock", "f/a/job.script.lock", true)]
#[case("f/private/", "f/private/deep/x.py", true)]
#[case("# comment\n\nf/x/*\n!f/x/keep.py", "f/x/keep.py", false)]
#[case("f/x/*", "f/y/x.py", false)]
fn deny_list_lines(#[case] ignore: &str, #[case] path: &str, #[case] excluded: bool) {
    let filter = PathFilter::new(None, Some(ignore)).expect("filter");
    assert_eq!(filter.is_excluded(path, false), excluded, "{ignore:?} vs {path}");
}

#[test]
fn custom_matchers_plug_into_the_combinator() {
    struct DenyLocks;
    impl PathMatcher for DenyLocks {
        fn is_match(&self, path: &str, _is_dir: bool) -> bool {
            path.ends_with(".lock")
        }
    }

    let filter = PathFilter::with_matchers(None, Some(Box::new(DenyLocks)));
    assert!(filter.is_excluded("f/a/job.script.lock", false));
    assert!(!filter.is_excluded("f/a/job.py", false));
}

// ---------------------------------------------------------------------------
// Sync root
// ---------------------------------------------------------------------------

#[test]
fn from_root_reads_wmillignore() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join(".wmillignore"), "f/secret/*\n").expect("write");
    let filter = PathFilter::from_root(dir.path(), &SyncConfig::default()).expect("filter");
    assert!(filter.is_excluded("f/secret/x.py", false));
}

#[test]
fn from_root_rejects_includes_with_wmillignore() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join(".wmillignore"), "*.lock\n").expect("write");
    let config = SyncConfig {
        includes: Some(vec!["f/**".to_string()]),
        ..SyncConfig::default()
    };
    let err = PathFilter::from_root(dir.path(), &config).unwrap_err();
    assert!(matches!(err, FilterError::ConflictingSources));
}
