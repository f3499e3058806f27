//! Keyword search over the project's note files.
//!
//! Deliberately simple ranking: a file's relevance is the number of distinct
//! query terms occurring anywhere in its lowercased content. The store's
//! enumeration order breaks relevance ties, which keeps result ordering
//! deterministic run to run. A smarter retrieval engine can replace this
//! node behind the same interface.

use std::sync::Arc;

use async_trait::async_trait;

use crate::event::OutputEvent;
use crate::node::{Node, NodeContext, NodeError, NodeOutcome, NodePartial};
use crate::notes::{NoteStore, NoteStoreError};
use crate::state::{FoundFile, QueryType, StateSnapshot};

/// Maximum number of files forwarded to response generation.
pub const TOP_K_FILES: usize = 5;

/// Split a comma-joined search query into distinct lowercase terms.
///
/// Empty terms are skipped; duplicates are dropped so a repeated keyword
/// cannot inflate relevance.
#[must_use]
pub fn search_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in query.split(',') {
        let term = term.to_lowercase();
        if !term.is_empty() && !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// Count the distinct terms occurring as substrings of the content.
///
/// Each term contributes at most 1, however often it repeats in the file.
#[must_use]
pub fn relevance(terms: &[String], content: &str) -> u32 {
    let content = content.to_lowercase();
    terms.iter().filter(|term| content.contains(term.as_str())).count() as u32
}

/// Rank candidate files: keep matches, sort by relevance descending with
/// ties in input order, truncate to [`TOP_K_FILES`].
///
/// Returns the kept files and the total match count before truncation.
#[must_use]
pub fn rank_files(mut candidates: Vec<FoundFile>) -> (Vec<FoundFile>, usize) {
    candidates.retain(|f| f.relevance > 0);
    let matched = candidates.len();
    // Stable sort: equal relevance keeps enumeration order.
    candidates.sort_by(|a, b| b.relevance.cmp(&a.relevance));
    candidates.truncate(TOP_K_FILES);
    (candidates, matched)
}

/// Build the labeled content blocks handed to response generation.
#[must_use]
pub fn build_file_contents(files: &[FoundFile]) -> String {
    files
        .iter()
        .map(|f| format!("File: {}\nContent: {}\n---", f.file, f.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Searches the project's notes for the classifier's keywords.
///
/// No-op pass-through on every path except `SEARCH`. Store failures degrade
/// to an empty context rather than aborting: the run still reaches response
/// generation, just without grounding.
pub struct NoteSearch {
    store: Arc<dyn NoteStore>,
}

impl NoteSearch {
    #[must_use]
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    async fn collect_candidates(
        &self,
        project_id: &str,
        terms: &[String],
    ) -> Result<Vec<FoundFile>, NoteStoreError> {
        let file_ids = self.store.list_files(project_id).await?;
        let mut candidates = Vec::new();
        for file_id in file_ids {
            let note = match self.store.read_file(project_id, &file_id).await {
                Ok(note) => note,
                Err(err) => {
                    tracing::debug!(file = %file_id, error = %err, "skipping unreadable note");
                    continue;
                }
            };
            candidates.push(FoundFile {
                project: project_id.to_string(),
                file: file_id,
                path: note.path,
                relevance: relevance(terms, &note.content),
                content: note.content,
            });
        }
        Ok(candidates)
    }
}

#[async_trait]
impl Node for NoteSearch {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        if snapshot.query_type != QueryType::Search {
            return Ok(NodeOutcome::advance(NodePartial::default()));
        }

        let mut partial = NodePartial::new().with_event(OutputEvent::step(format!(
            "Searching for: {}",
            snapshot.search_query
        )));

        let terms = search_terms(&snapshot.search_query);
        match self.collect_candidates(&snapshot.project_id, &terms).await {
            Ok(candidates) => {
                let (found, matched) = rank_files(candidates);
                if found.is_empty() {
                    partial = partial
                        .with_event(OutputEvent::step("No relevant files found in your project."))
                        .with_found_files(Vec::new())
                        .with_file_contents("");
                } else {
                    partial = partial
                        .with_event(OutputEvent::step(format!(
                            "Found {matched} relevant file(s). Analyzing the content..."
                        )))
                        .with_file_contents(build_file_contents(&found))
                        .with_found_files(found);
                }
            }
            Err(NoteStoreError::ProjectNotFound { project_id }) => {
                partial = partial
                    .with_event(OutputEvent::step(format!("Project not found: {project_id}")))
                    .with_found_files(Vec::new())
                    .with_file_contents("");
            }
            Err(err) => {
                tracing::warn!(error = %err, "note enumeration failed");
                partial = partial
                    .with_event(OutputEvent::step(
                        "Had trouble searching files, but I'll do my best to help.",
                    ))
                    .with_found_files(Vec::new())
                    .with_file_contents("");
            }
        }

        Ok(NodeOutcome::advance(partial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, relevance: u32) -> FoundFile {
        FoundFile {
            project: "p".to_string(),
            file: name.to_string(),
            path: format!("p/{name}.md"),
            content: String::new(),
            relevance,
        }
    }

    #[test]
    fn terms_are_lowercased_distinct_and_nonempty() {
        assert_eq!(
            search_terms("Mitochondria,,energy,ENERGY"),
            vec!["mitochondria".to_string(), "energy".to_string()]
        );
        assert!(search_terms("").is_empty());
        assert!(search_terms(",,,").is_empty());
    }

    #[test]
    fn relevance_counts_each_term_once() {
        let terms = search_terms("energy,cell");
        assert_eq!(relevance(&terms, "Energy energy ENERGY"), 1);
        assert_eq!(relevance(&terms, "the cell stores energy"), 2);
        assert_eq!(relevance(&terms, "nothing here"), 0);
    }

    #[test]
    fn ranking_filters_sorts_and_keeps_tie_order() {
        let (kept, matched) = rank_files(vec![
            file("a", 1),
            file("b", 3),
            file("c", 0),
            file("d", 1),
        ]);
        assert_eq!(matched, 3);
        let names: Vec<_> = kept.iter().map(|f| f.file.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "d"]);
    }

    #[test]
    fn ranking_truncates_to_top_k() {
        let candidates = (0..7).map(|i| file(&format!("f{i}"), 1)).collect();
        let (kept, matched) = rank_files(candidates);
        assert_eq!(matched, 7);
        assert_eq!(kept.len(), TOP_K_FILES);
    }

    #[test]
    fn content_blocks_are_labeled_and_separated() {
        let mut a = file("bio", 2);
        a.content = "mitochondria".to_string();
        let mut b = file("physics", 1);
        b.content = "energy".to_string();
        assert_eq!(
            build_file_contents(&[a, b]),
            "File: bio\nContent: mitochondria\n---\nFile: physics\nContent: energy\n---"
        );
        assert_eq!(build_file_contents(&[]), "");
    }
}
