//! Note search ranking and degradation behavior.

mod common;

use std::sync::Arc;

use common::*;
use noteflow::event::EventKind;
use noteflow::node::{Node, NodeContext, NodeOutcome};
use noteflow::nodes::search::{rank_files, NoteSearch, TOP_K_FILES};
use noteflow::state::{FoundFile, QueryType, StateSnapshot, WorkflowState};
use noteflow::types::NodeKind;
use proptest::prelude::*;

fn search_snapshot(project_id: &str, query: &str) -> StateSnapshot {
    let mut state = WorkflowState::builder()
        .user_message("q")
        .project_id(project_id)
        .build();
    state.query_type = QueryType::Search;
    state.search_query = query.to_string();
    state.snapshot()
}

async fn run_search(store: MemoryNoteStore, snapshot: StateSnapshot) -> noteflow::node::NodePartial {
    let node = NoteSearch::new(Arc::new(store));
    let ctx = NodeContext::new("t1", NodeKind::NoteSearch);
    match node.run(snapshot, ctx).await.unwrap() {
        NodeOutcome::Advance(partial) => partial,
        NodeOutcome::Suspend { .. } => panic!("search never suspends"),
    }
}

#[tokio::test]
async fn ranks_matches_descending_excludes_zero_and_keeps_tie_order() {
    let store = MemoryNoteStore::new().with_project(
        "study",
        &[
            ("one", "alpha"),                  // 1 match
            ("three", "alpha beta gamma"),     // 3 matches
            ("none", "delta"),                 // 0 matches
            ("one-bis", "beta"),               // 1 match, enumerated after "one"
        ],
    );
    let partial = run_search(store, search_snapshot("study", "alpha,beta,gamma")).await;

    let files = partial.found_files.unwrap();
    let names: Vec<_> = files.iter().map(|f| f.file.as_str()).collect();
    assert_eq!(names, vec!["three", "one", "one-bis"]);
    let scores: Vec<_> = files.iter().map(|f| f.relevance).collect();
    assert_eq!(scores, vec![3, 1, 1]);
}

#[tokio::test]
async fn result_is_truncated_but_the_count_reports_all_matches() {
    let files: Vec<(String, String)> = (0..7)
        .map(|i| (format!("f{i}"), "needle".to_string()))
        .collect();
    let refs: Vec<(&str, &str)> = files
        .iter()
        .map(|(a, b)| (a.as_str(), b.as_str()))
        .collect();
    let store = MemoryNoteStore::new().with_project("study", &refs);

    let partial = run_search(store, search_snapshot("study", "needle")).await;
    assert_eq!(partial.found_files.unwrap().len(), TOP_K_FILES);
    assert!(partial
        .events
        .iter()
        .any(|e| e.content.starts_with("Found 7 relevant file(s)")));
}

#[tokio::test]
async fn non_search_queries_pass_through_untouched() {
    let store = MemoryNoteStore::new().with_project("study", &[("a", "content")]);
    let mut state = WorkflowState::builder().project_id("study").build();
    state.query_type = QueryType::General;

    let node = NoteSearch::new(Arc::new(store));
    let ctx = NodeContext::new("t1", NodeKind::NoteSearch);
    let NodeOutcome::Advance(partial) = node.run(state.snapshot(), ctx).await.unwrap() else {
        panic!("search never suspends");
    };
    assert!(partial.events.is_empty());
    assert!(partial.found_files.is_none());
    assert!(partial.file_contents.is_none());
}

#[tokio::test]
async fn unreadable_files_are_skipped_not_fatal() {
    let store = MemoryNoteStore::new()
        .with_project("study", &[("good", "needle here")])
        .with_unreadable_file("study", "broken");
    let partial = run_search(store, search_snapshot("study", "needle")).await;

    let files = partial.found_files.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file, "good");
}

#[tokio::test]
async fn missing_project_reports_and_degrades() {
    let partial = run_search(MemoryNoteStore::new(), search_snapshot("ghost", "term")).await;
    assert_eq!(partial.file_contents.as_deref(), Some(""));
    assert!(partial
        .events
        .iter()
        .any(|e| e.kind == EventKind::Step && e.content == "Project not found: ghost"));
}

#[tokio::test]
async fn empty_terms_are_skipped() {
    let store = MemoryNoteStore::new().with_project("study", &[("a", "energy notes")]);
    // Leading/empty comma segments must not match everything.
    let partial = run_search(store, search_snapshot("study", ",energy,")).await;
    let files = partial.found_files.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].relevance, 1);
}

fn arb_candidates() -> impl Strategy<Value = Vec<FoundFile>> {
    prop::collection::vec(0u32..5, 0..20).prop_map(|scores| {
        scores
            .into_iter()
            .enumerate()
            .map(|(i, relevance)| FoundFile {
                project: "p".to_string(),
                file: format!("f{i}"),
                path: format!("p/f{i}.md"),
                content: String::new(),
                relevance,
            })
            .collect()
    })
}

proptest! {
    /// Ranking invariants: bounded length, no zero-relevance entries,
    /// descending order, and stable tie-breaking by enumeration order.
    #[test]
    fn rank_files_invariants(candidates in arb_candidates()) {
        let matching = candidates.iter().filter(|f| f.relevance > 0).count();
        let (kept, matched) = rank_files(candidates);

        prop_assert_eq!(matched, matching);
        prop_assert!(kept.len() <= TOP_K_FILES);
        prop_assert!(kept.iter().all(|f| f.relevance > 0));
        for pair in kept.windows(2) {
            prop_assert!(pair[0].relevance >= pair[1].relevance);
            if pair[0].relevance == pair[1].relevance {
                // File names encode the enumeration index.
                let left: usize = pair[0].file[1..].parse().unwrap();
                let right: usize = pair[1].file[1..].parse().unwrap();
                prop_assert!(left < right);
            }
        }
    }
}
