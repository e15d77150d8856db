//! Search semantics shared by every storage engine.
//!
//! Engines only decide how candidate notes are fetched. Matching, snippet
//! derivation and ordering live here so that two engines holding the same
//! notes always return the same hits in the same order.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{Note, NoteId};

/// Maximum number of characters kept in a snippet.
pub const SNIPPET_MAX_CHARS: usize = 100;

/// A parsed search query.
///
/// The raw text is split on whitespace into lowercase tokens. A note matches
/// when every token occurs somewhere in its content, ignoring case. A query
/// without tokens matches every note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    tokens: Vec<String>,
}

impl SearchQuery {
    /// Parse a free-text query.
    pub fn new(raw: &str) -> Self {
        Self {
            tokens: raw.split_whitespace().map(str::to_lowercase).collect(),
        }
    }

    /// A query matching every note.
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether this query matches every note.
    pub fn is_match_all(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Whether `content` satisfies this query.
    pub fn matches(&self, content: &str) -> bool {
        if self.is_match_all() {
            return true;
        }
        let haystack = content.to_lowercase();
        self.tokens.iter().all(|token| haystack.contains(token.as_str()))
    }
}

/// One search match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub uid: NoteId,
    /// Derived from content at query time, never stored.
    pub snippet: String,
    pub updated_at: DateTime<Utc>,
    pub revision: u64,
}

impl SearchHit {
    fn from_note(note: &Note) -> Self {
        Self {
            uid: note.uid,
            snippet: snippet(&note.content),
            updated_at: note.updated_at,
            revision: note.revision,
        }
    }
}

/// Ordered, finite search results.
///
/// The results are a snapshot: iterating them any number of times yields
/// the same hits in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SearchResults {
    hits: Vec<SearchHit>,
}

impl SearchResults {
    /// Filter `notes` by `query` and order the matches.
    pub fn collect<I>(query: &SearchQuery, notes: I) -> Self
    where
        I: IntoIterator<Item = Note>,
    {
        let mut hits: Vec<SearchHit> = notes
            .into_iter()
            .filter(|note| query.matches(&note.content))
            .map(|note| SearchHit::from_note(&note))
            .collect();
        hits.sort_by(recency_order);
        Self { hits }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchHit> {
        self.hits.iter()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Uids of the hits, in order.
    pub fn uids(&self) -> Vec<NoteId> {
        self.hits.iter().map(|hit| hit.uid).collect()
    }
}

impl IntoIterator for SearchResults {
    type Item = SearchHit;
    type IntoIter = std::vec::IntoIter<SearchHit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

impl<'a> IntoIterator for &'a SearchResults {
    type Item = &'a SearchHit;
    type IntoIter = std::slice::Iter<'a, SearchHit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

/// Most recently modified first, uid ascending on ties.
pub fn recency_order(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.revision.cmp(&a.revision).then_with(|| a.uid.cmp(&b.uid))
}

/// Derive a one-line snippet from note content.
///
/// Takes the first non-blank line, drops leading markdown heading markers,
/// collapses whitespace and caps the length at [`SNIPPET_MAX_CHARS`].
pub fn snippet(content: &str) -> String {
    let line = content
        .lines()
        .map(|line| line.trim().trim_start_matches('#').trim())
        .find(|line| !line.is_empty())
        .unwrap_or_default();

    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= SNIPPET_MAX_CHARS {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(SNIPPET_MAX_CHARS).collect();
    truncated.push_str("...");
    truncated
}
