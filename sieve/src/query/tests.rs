//! Tests for the term parser.

use super::*;

fn terms(input: &str) -> Vec<Term> {
    parse_terms(Some(input)).terms
}

#[test]
fn test_absent_query() {
    let q = parse_terms(None);
    assert!(q.is_match_all());
}

#[test]
fn test_empty_query() {
    let q = parse_terms(Some(""));
    assert!(q.is_match_all());
    assert_eq!(q.len(), 0);
}

#[test]
fn test_bare_word_is_prefix_include() {
    assert_eq!(terms("cat"), vec![Term::PrefixInclude("cat".to_string())]);
}

#[test]
fn test_bang_is_exact_include() {
    assert_eq!(terms("!cat"), vec![Term::ExactInclude("cat".to_string())]);
}

#[test]
fn test_dash_is_prefix_exclude() {
    assert_eq!(terms("-dog"), vec![Term::PrefixExclude("dog".to_string())]);
}

#[test]
fn test_mixed_terms_keep_input_order() {
    assert_eq!(
        terms("a,!b,-c"),
        vec![
            Term::PrefixInclude("a".to_string()),
            Term::ExactInclude("b".to_string()),
            Term::PrefixExclude("c".to_string()),
        ]
    );
}

#[test]
fn test_whitespace_trimmed_around_tokens() {
    assert_eq!(
        terms("  cat , ! dog ,-  bird  "),
        vec![
            Term::PrefixInclude("cat".to_string()),
            Term::ExactInclude("dog".to_string()),
            Term::PrefixExclude("bird".to_string()),
        ]
    );
}

#[test]
fn test_marker_after_leading_space_still_classifies() {
    assert_eq!(terms(" !cat"), vec![Term::ExactInclude("cat".to_string())]);
    assert_eq!(terms(" -cat"), vec![Term::PrefixExclude("cat".to_string())]);
}

#[test]
fn test_only_leading_marker_stripped() {
    assert_eq!(terms("!!cat"), vec![Term::ExactInclude("!cat".to_string())]);
    assert_eq!(terms("--cat"), vec![Term::PrefixExclude("-cat".to_string())]);
    assert_eq!(terms("well-known"), vec![Term::PrefixInclude("well-known".to_string())]);
}

#[test]
fn test_empty_tokens_are_kept() {
    assert_eq!(
        terms("cat,,"),
        vec![
            Term::PrefixInclude("cat".to_string()),
            Term::PrefixInclude(String::new()),
            Term::PrefixInclude(String::new()),
        ]
    );
}

#[test]
fn test_bare_markers_yield_empty_words() {
    assert_eq!(
        terms("!,-"),
        vec![
            Term::ExactInclude(String::new()),
            Term::PrefixExclude(String::new()),
        ]
    );
}

#[test]
fn test_whitespace_only_query_is_one_empty_term() {
    let q = parse_terms(Some("   "));
    assert!(!q.is_match_all());
    assert_eq!(q.terms, vec![Term::PrefixInclude(String::new())]);
}

#[test]
fn test_duplicates_permitted() {
    assert_eq!(terms("cat,cat").len(), 2);
}

#[test]
fn test_term_accessors() {
    let exact = Term::ExactInclude("cat".to_string());
    let exclude = Term::PrefixExclude("dog".to_string());
    let prefix = Term::PrefixInclude("bird".to_string());

    assert_eq!(exact.word(), "cat");
    assert_eq!(exact.kind(), "exact");
    assert_eq!(exclude.kind(), "exclude");
    assert_eq!(prefix.kind(), "prefix");
}

#[test]
fn test_inner_markers_stay_in_word() {
    assert_eq!(
        terms("-well-known,!e-mail,co-op!"),
        vec![
            Term::PrefixExclude("well-known".to_string()),
            Term::ExactInclude("e-mail".to_string()),
            Term::PrefixInclude("co-op!".to_string()),
        ]
    );
}

#[test]
fn test_term_display_reparses() {
    let q = parse_terms(Some("a, !b , -c"));
    let rendered: Vec<String> = q.iter().map(|t| t.to_string()).collect();
    assert_eq!(rendered.join(","), "a,!b,-c");
    assert_eq!(parse_terms(Some(&rendered.join(","))), q);
}
