use crate::error::{HealthError, Result};
use crate::io;
use crate::paths;
use crate::plan::{ImprovementPlan, PLAN_MARKER};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

// ---------------------------------------------------------------------------
// Section merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionChange {
    Replaced,
    Appended,
}

/// Line text with up to three leading spaces removed; `None` for indented code.
fn block_text(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    (indent < 4).then(|| &line[indent..])
}

/// Level of an ATX heading (`#` through `######`).
fn atx_level(line: &str) -> Option<usize> {
    let text = block_text(line)?;
    let level = text.len() - text.trim_start_matches('#').len();
    let rest = &text[level..];
    ((1..=6).contains(&level) && (rest.is_empty() || rest.starts_with([' ', '\t'])))
        .then_some(level)
}

/// A run of `=` (level 1) or `-` (level 2) under a paragraph.
fn is_setext_underline(line: &str) -> bool {
    match block_text(line).map(str::trim_end) {
        Some(text) if !text.is_empty() => {
            text.bytes().all(|b| b == b'=') || text.bytes().all(|b| b == b'-')
        }
        _ => false,
    }
}

fn is_thematic_break(text: &str) -> bool {
    let marks: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    marks.len() >= 3 && matches!(marks[0], '-' | '*' | '_') && marks.iter().all(|c| *c == marks[0])
}

fn is_list_item(text: &str) -> bool {
    let mut chars = text.chars();
    if matches!(chars.next(), Some('-' | '*' | '+')) && matches!(chars.next(), None | Some(' ')) {
        return true;
    }
    let digits = text.len() - text.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let rest = &text[digits..];
    (1..=9).contains(&digits) && (rest.starts_with(". ") || rest.starts_with(") "))
}

/// Opening code fence: marker char and run length.
fn fence_open(line: &str) -> Option<(char, usize)> {
    let text = block_text(line)?;
    let ch = text.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = text.len() - text.trim_start_matches(ch).len();
    (len >= 3).then_some((ch, len))
}

fn closes_fence(line: &str, (ch, len): (char, usize)) -> bool {
    block_text(line).map(str::trim_end).is_some_and(|text| {
        text.len() >= len && text.chars().all(|c| c == ch)
    })
}

/// Byte offset of the line that is exactly `heading`, if any.
fn find_heading(content: &str, heading: &str) -> Option<usize> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if line.trim_end_matches(['\n', '\r']) == heading {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

/// Offset of the first level 1 or 2 heading at or after `from`, or the end.
/// Setext headings end the section at the start of their text. Headings
/// inside fenced code blocks do not count.
fn section_end(content: &str, from: usize) -> usize {
    let mut offset = from;
    let mut fence = None;
    // First line of the open paragraph, which an underline turns into a heading.
    let mut paragraph = None;
    let mut in_list = false;
    for raw in content[from..].split_inclusive('\n') {
        let line = raw.trim_end_matches(['\n', '\r']);
        if let Some(open) = fence {
            if closes_fence(line, open) {
                fence = None;
            }
        } else if line.trim().is_empty() {
            paragraph = None;
            in_list = false;
        } else if atx_level(line).is_some_and(|level| level <= 2) {
            return offset;
        } else if let Some(start) = paragraph.filter(|_| is_setext_underline(line)) {
            return start;
        } else if let Some(text) = block_text(line) {
            if let Some(open) = fence_open(line) {
                fence = Some(open);
                paragraph = None;
            } else if is_list_item(text) {
                in_list = true;
                paragraph = None;
            } else if is_thematic_break(text)
                || text.starts_with('>')
                || atx_level(line).is_some()
            {
                paragraph = None;
            } else if !in_list && paragraph.is_none() {
                paragraph = Some(offset);
            }
        }
        offset += raw.len();
    }
    content.len()
}

/// Merge `block` into `content`. An existing marked section is replaced in
/// place; otherwise the block is appended after a blank line. Bytes outside
/// the marked section are left untouched.
pub fn merge_section(content: &str, block: &str) -> (String, SectionChange) {
    let block = block.trim_end_matches('\n');

    if let Some(start) = find_heading(content, PLAN_MARKER) {
        let marker_line_end = content[start..]
            .find('\n')
            .map(|i| start + i + 1)
            .unwrap_or(content.len());
        let end = section_end(content, marker_line_end);
        let (before, after) = (&content[..start], &content[end..]);
        let separator = if after.is_empty() { "\n" } else { "\n\n" };
        let merged = format!("{before}{block}{separator}{after}");
        return (merged, SectionChange::Replaced);
    }

    let separator = if content.is_empty() {
        ""
    } else if content.ends_with("\n\n") {
        ""
    } else if content.ends_with('\n') {
        "\n"
    } else {
        "\n\n"
    };
    (format!("{content}{separator}{block}\n"), SectionChange::Appended)
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

/// Opaque fingerprint of a document's content at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision(u64);

impl Revision {
    pub fn of(content: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        Revision(hasher.finish())
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub revision: Revision,
}

/// Externally owned storage for agent definition documents.
pub trait DocumentStore: Send + Sync {
    /// `Ok(None)` when the document does not exist.
    fn read(&self, id: &str) -> Result<Option<Document>>;

    /// Replace the document's content, failing with
    /// [`HealthError::DocumentWriteConflict`] if it no longer matches
    /// `expected`. Never creates a document.
    fn write(&self, id: &str, content: &str, expected: Revision) -> Result<()>;
}

/// Markdown files in one directory, `{id}.md`.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    dir: PathBuf,
}

impl FsDocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> Result<PathBuf> {
        paths::validate_slug(id)?;
        Ok(self
            .dir
            .join(format!("{id}.{}", paths::DOCUMENT_EXTENSION)))
    }
}

impl DocumentStore for FsDocumentStore {
    fn read(&self, id: &str) -> Result<Option<Document>> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Some(Document {
            id: id.to_string(),
            revision: Revision::of(&content),
            content,
        }))
    }

    fn write(&self, id: &str, content: &str, expected: Revision) -> Result<()> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Err(HealthError::DocumentNotFound(id.to_string()));
        }
        let current = std::fs::read_to_string(&path)?;
        if Revision::of(&current) != expected {
            return Err(HealthError::DocumentWriteConflict(id.to_string()));
        }
        io::atomic_write(&path, content.as_bytes())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process store, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: Mutex<HashMap<String, String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: impl Into<String>, content: impl Into<String>) {
        lock(&self.docs).insert(id.into(), content.into());
    }

    pub fn get(&self, id: &str) -> Option<String> {
        lock(&self.docs).get(id).cloned()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn read(&self, id: &str) -> Result<Option<Document>> {
        Ok(lock(&self.docs).get(id).map(|content| Document {
            id: id.to_string(),
            revision: Revision::of(content),
            content: content.clone(),
        }))
    }

    fn write(&self, id: &str, content: &str, expected: Revision) -> Result<()> {
        let mut docs = lock(&self.docs);
        let current = docs
            .get_mut(id)
            .ok_or_else(|| HealthError::DocumentNotFound(id.to_string()))?;
        if Revision::of(current) != expected {
            return Err(HealthError::DocumentWriteConflict(id.to_string()));
        }
        *current = content.to_string();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DocumentMutator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationReport {
    pub document_id: String,
    pub agent_key: String,
    pub change: SectionChange,
    pub applied_at: DateTime<Utc>,
}

/// Applies plans to definition documents, one writer per document id.
pub struct DocumentMutator<S: DocumentStore> {
    store: S,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    improved: Mutex<BTreeSet<String>>,
}

impl<S: DocumentStore> DocumentMutator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
            improved: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn document_lock(&self, id: &str) -> Arc<Mutex<()>> {
        lock(&self.locks)
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Merge `plan` into the document `document_id`. The read-modify-write
    /// runs under that document's lock; other documents are not blocked.
    pub fn apply_plan(&self, plan: &ImprovementPlan, document_id: &str) -> Result<MutationReport> {
        let doc_lock = self.document_lock(document_id);
        let _guard = match doc_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::debug!(document = document_id, "waiting for document lock");
                lock(&doc_lock)
            }
        };

        let document = self
            .store
            .read(document_id)?
            .ok_or_else(|| HealthError::DocumentNotFound(document_id.to_string()))?;

        let (updated, change) = merge_section(&document.content, &plan.instructions);
        if updated != document.content {
            self.store.write(document_id, &updated, document.revision)?;
        }

        lock(&self.improved).insert(plan.agent.key.clone());
        tracing::info!(
            document = document_id,
            agent = %plan.agent.key,
            change = ?change,
            "improvement plan applied"
        );

        Ok(MutationReport {
            document_id: document_id.to_string(),
            agent_key: plan.agent.key.clone(),
            change,
            applied_at: Utc::now(),
        })
    }

    /// Keys of agents whose documents this mutator has updated.
    pub fn improved_agents(&self) -> Vec<String> {
        lock(&self.improved).iter().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
