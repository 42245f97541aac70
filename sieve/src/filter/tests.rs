//! Tests for term resolution and end-to-end filtering.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;

use super::*;
use crate::index::{IdSet, MemoryIndex};

fn set(ids: &[i64]) -> IdSet {
    ids.iter().copied().collect()
}

fn animals() -> MemoryIndex {
    MemoryIndex::from_sets([
        ("ns_cat", vec![1, 2, 3]),
        ("ns_category", vec![3, 4]),
        ("ns_dog", vec![5]),
        ("ns_doghouse", vec![6]),
        ("other_cat", vec![99]),
    ])
}

fn filter() -> TermFilter<MemoryIndex> {
    TermFilter::new(animals(), "ns_")
}

fn decide(raw: &str) -> Decision {
    filter().evaluate(Some(raw)).unwrap().unwrap()
}

/// Index whose every call fails, as an unreachable backend would.
struct DownIndex;

impl IndexStore for DownIndex {
    fn exact_members(&self, _key: &str) -> Result<IdSet> {
        Err(Error::IndexUnavailable("connection refused".to_string()))
    }

    fn keys_matching_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
        Err(Error::IndexUnavailable("connection refused".to_string()))
    }

    fn union_members(&self, _keys: &[String]) -> Result<IdSet> {
        Err(Error::IndexUnavailable("connection refused".to_string()))
    }
}

/// Counts calls so tests can see which lookups a term issues.
#[derive(Default)]
struct CountingIndex {
    inner: MemoryIndex,
    exact: AtomicUsize,
    scans: AtomicUsize,
    unions: AtomicUsize,
}

impl IndexStore for CountingIndex {
    fn exact_members(&self, key: &str) -> Result<IdSet> {
        self.exact.fetch_add(1, Ordering::SeqCst);
        self.inner.exact_members(key)
    }

    fn keys_matching_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.inner.keys_matching_prefix(prefix)
    }

    fn union_members(&self, keys: &[String]) -> Result<IdSet> {
        self.unions.fetch_add(1, Ordering::SeqCst);
        self.inner.union_members(keys)
    }
}

/// Records which threads issued lookups.
#[derive(Default)]
struct ThreadTrackingIndex {
    inner: MemoryIndex,
    threads: parking_lot::Mutex<HashSet<std::thread::ThreadId>>,
}

impl ThreadTrackingIndex {
    fn seen(&self) {
        self.threads.lock().insert(std::thread::current().id());
    }
}

impl IndexStore for ThreadTrackingIndex {
    fn exact_members(&self, key: &str) -> Result<IdSet> {
        self.seen();
        self.inner.exact_members(key)
    }

    fn keys_matching_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.seen();
        self.inner.keys_matching_prefix(prefix)
    }

    fn union_members(&self, keys: &[String]) -> Result<IdSet> {
        self.seen();
        self.inner.union_members(keys)
    }
}

/// In-memory record collection for exercising the adapter.
#[derive(Debug, Clone, PartialEq)]
struct Records(Vec<i64>);

impl Restrict for Records {
    fn keep_ids(self, ids: &IdSet) -> Self {
        Records(self.0.into_iter().filter(|id| ids.contains(id)).collect())
    }

    fn drop_ids(self, ids: &IdSet) -> Self {
        Records(self.0.into_iter().filter(|id| !ids.contains(id)).collect())
    }
}

#[test]
fn test_prefix_include_unions_all_matching_keys() {
    assert_eq!(decide("cat"), Decision::keep_only(set(&[1, 2, 3, 4])));
}

#[test]
fn test_exact_include_ignores_longer_keys() {
    assert_eq!(decide("!cat"), Decision::keep_only(set(&[1, 2, 3])));
}

#[test]
fn test_prefix_and_exact_intersect() {
    assert_eq!(decide("cat,!cat"), Decision::keep_only(set(&[1, 2, 3])));
}

#[test]
fn test_exclusion_alone_drops() {
    assert_eq!(decide("-dog"), Decision::drop_only(set(&[5, 6])));
}

#[test]
fn test_intersection_then_subtraction() {
    let index = MemoryIndex::from_sets([
        ("ns_a", vec![1, 2, 3, 4]),
        ("ns_ab", vec![5]),
        ("ns_b", vec![2, 3, 5]),
        ("ns_bc", vec![1]),
        ("ns_c", vec![3]),
    ]);
    let decision = TermFilter::new(index, "ns_")
        .evaluate(Some("a,!b,-c"))
        .unwrap()
        .unwrap();
    // ({1,2,3,4,5} ∩ {2,3,5}) − {3}
    assert_eq!(decision, Decision::keep_only(set(&[2, 5])));
}

#[test]
fn test_pure_exclusion_unions() {
    assert_eq!(decide("-cat,-dog"), Decision::drop_only(set(&[1, 2, 3, 4, 5, 6])));
}

#[test]
fn test_unmatched_prefix_does_not_collapse_intersection() {
    assert_eq!(decide("cat,zebra"), Decision::keep_only(set(&[1, 2, 3, 4])));
}

#[test]
fn test_unmatched_exclusion_is_ignored() {
    assert_eq!(decide("cat,-zebra"), Decision::keep_only(set(&[1, 2, 3, 4])));
}

#[test]
fn test_unmatched_exact_collapses_intersection() {
    assert_eq!(decide("cat,!ca"), Decision::keep_only(IdSet::new()));
}

#[test]
fn test_only_unmatched_exclusions_drop_nothing() {
    let decision = decide("-zebra,-yak");
    assert_eq!(decision, Decision::drop_only(IdSet::new()));
}

#[test]
fn test_only_unmatched_inclusions_drop_nothing() {
    assert_eq!(decide("zebra"), Decision::drop_only(IdSet::new()));
}

#[test]
fn test_empty_word_scans_whole_namespace() {
    assert_eq!(decide(","), Decision::keep_only(set(&[1, 2, 3, 4, 5, 6])));
}

#[test]
fn test_namespace_isolates_keys() {
    let d = decide("cat");
    assert!(!d.ids.contains(&99));
}

#[test]
fn test_empty_query_is_no_restriction() {
    let f = filter();
    assert_eq!(f.evaluate(None).unwrap(), None);
    assert_eq!(f.evaluate(Some("")).unwrap(), None);
}

#[test]
fn test_resolve_exact_never_scans() {
    let f = TermFilter::new(CountingIndex::default(), "ns_");
    f.resolve(&Term::ExactInclude("cat".to_string())).unwrap();
    assert_eq!(f.index().exact.load(Ordering::SeqCst), 1);
    assert_eq!(f.index().scans.load(Ordering::SeqCst), 0);
}

#[test]
fn test_resolve_prefix_skips_union_without_keys() {
    let f = TermFilter::new(CountingIndex::default(), "ns_");
    let c = f.resolve(&Term::PrefixInclude("cat".to_string())).unwrap();
    assert_eq!(c, Contribution::Nothing);
    assert_eq!(f.index().scans.load(Ordering::SeqCst), 1);
    assert_eq!(f.index().unions.load(Ordering::SeqCst), 0);
}

#[test]
fn test_resolve_tags_exclusion() {
    let c = filter()
        .resolve(&Term::PrefixExclude("dog".to_string()))
        .unwrap();
    assert_eq!(c, Contribution::Exclude(set(&[5, 6])));
}

#[test]
fn test_unavailable_index_fails_evaluation() {
    for parallel in [true, false] {
        let f = TermFilter::new(DownIndex, "ns_").with_parallel(parallel);
        let result = f.evaluate(Some("cat,-dog"));
        assert!(matches!(result, Err(Error::IndexUnavailable(_))));
    }
}

#[test]
fn test_unavailable_index_still_allows_empty_query() {
    let f = TermFilter::new(DownIndex, "ns_");
    assert_eq!(f.evaluate(Some("")).unwrap(), None);
}

#[test]
fn test_sequential_matches_parallel() {
    let index = animals();
    let parallel = TermFilter::new(&index, "ns_");
    let sequential = TermFilter::new(&index, "ns_").with_parallel(false);

    for raw in ["cat,!cat,-category", "-dog,-cat", "do,c", "!dog,cat"] {
        assert_eq!(
            parallel.evaluate(Some(raw)).unwrap(),
            sequential.evaluate(Some(raw)).unwrap(),
            "query {raw}"
        );
    }
}

#[test]
fn test_filter_keep_only() {
    let records = Records((1..=8).collect());
    let out = filter().filter(Some("cat,-category"), records).unwrap();
    assert_eq!(out, Records(vec![1, 2]));
}

#[test]
fn test_filter_drop_only() {
    let records = Records((1..=8).collect());
    let out = filter().filter(Some("-dog"), records).unwrap();
    assert_eq!(out, Records(vec![1, 2, 3, 4, 7, 8]));
}

#[test]
fn test_filter_empty_query_passes_through() {
    let records = Records((1..=8).collect());
    let out = filter().filter(None, records.clone()).unwrap();
    assert_eq!(out, records);
}

#[test]
fn test_decision_apply_matches_filter() {
    let records = Records((0..10).collect());
    let decision = decide("do,-doghouse");
    assert_eq!(decision.apply(records.clone()), Records(vec![5]));
    assert_eq!(filter().filter(Some("do,-doghouse"), records).unwrap(), Records(vec![5]));
}

#[test]
fn test_thousands_of_terms_resolve() {
    let raw = vec!["cat"; 20_000].join(",");
    assert_eq!(decide(&raw), Decision::keep_only(set(&[1, 2, 3, 4])));

    let mixed: Vec<&str> = (0..5_000)
        .map(|i| if i % 2 == 0 { "-dog" } else { "!cat" })
        .collect();
    assert_eq!(decide(&mixed.join(",")), Decision::keep_only(set(&[1, 2, 3])));
}

#[test]
fn test_workers_bounded_by_available_parallelism() {
    let f = TermFilter::new(ThreadTrackingIndex::default(), "ns_");
    let raw = vec!["cat"; 2_000].join(",");
    f.evaluate(Some(&raw)).unwrap();

    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let threads = f.index().threads.lock().len();
    assert!(threads >= 1);
    assert!(threads <= cores, "{} threads for {} cores", threads, cores);
}

#[test]
fn test_explain_pairs_terms_with_contributions() {
    let query = parse_terms(Some("cat,-zebra,!dog"));
    let explanation = filter().explain(&query).unwrap();

    assert_eq!(
        explanation.terms,
        vec![
            (Term::PrefixInclude("cat".to_string()), Contribution::Include(set(&[1, 2, 3, 4]))),
            (Term::PrefixExclude("zebra".to_string()), Contribution::Nothing),
            (Term::ExactInclude("dog".to_string()), Contribution::Include(set(&[5]))),
        ]
    );
    assert_eq!(explanation.decision, Some(Decision::keep_only(IdSet::new())));
    assert_eq!(explanation.decision, filter().decide(&query).unwrap());
}

#[test]
fn test_explain_empty_query() {
    let explanation = filter().explain(&parse_terms(None)).unwrap();
    assert!(explanation.terms.is_empty());
    assert_eq!(explanation.decision, None);
}

fn arb_token() -> impl Strategy<Value = String> {
    let word = prop_oneof![
        Just("cat"),
        Just("categ"),
        Just("c"),
        Just("dog"),
        Just("do"),
        Just("zebra"),
        Just(""),
    ];
    let marker = prop_oneof![Just(""), Just("!"), Just("-")];
    (marker, word).prop_map(|(m, w)| format!("{}{}", m, w))
}

fn arb_permuted_tokens() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    prop::collection::vec(arb_token(), 1..6).prop_flat_map(|tokens| {
        let original = tokens.clone();
        Just(tokens)
            .prop_shuffle()
            .prop_map(move |shuffled| (original.clone(), shuffled))
    })
}

proptest! {
    #[test]
    fn prop_decision_ignores_token_order((tokens, shuffled) in arb_permuted_tokens()) {
        let f = filter();
        let a = f.evaluate(Some(&tokens.join(","))).unwrap();
        let b = f.evaluate(Some(&shuffled.join(","))).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_duplicate_terms_are_idempotent(
        token in arb_token().prop_filter("non-empty token", |t| !t.is_empty()),
    ) {
        let f = filter();
        let once = f.evaluate(Some(&token)).unwrap();
        let twice = f.evaluate(Some(&format!("{},{}", token, token))).unwrap();
        prop_assert_eq!(once, twice);
    }
}
