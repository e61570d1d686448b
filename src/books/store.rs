//! In-memory library of book texts.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use tracing::{info, warn};

use super::docx;

/// Most matches a single search returns.
pub const MAX_SEARCH_RESULTS: usize = 5;

/// Length of the quiz excerpt, in characters.
pub const EXCERPT_CHARS: usize = 1000;

/// Quiz input used when no documents are loaded.
pub const NO_TEXT_PLACEHOLDER: &str = "No text is available.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub document: String,
    pub line: String,
}

/// Documents keyed by file name, iterated in name order. Read-only once built.
#[derive(Debug, Default)]
pub struct Library {
    documents: Vec<Document>,
}

impl Library {
    pub fn from_documents<I, N, T>(documents: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        let by_name: BTreeMap<String, String> = documents
            .into_iter()
            .map(|(name, text)| (name.into(), text.into()))
            .collect();

        Self {
            documents: by_name
                .into_iter()
                .map(|(name, text)| Document { name, text })
                .collect(),
        }
    }

    /// Load every supported document in `dir`.
    ///
    /// A missing directory is created and yields an empty library. Files that
    /// fail to extract are logged and skipped.
    pub fn load_all(dir: &Path) -> io::Result<Self> {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            warn!("Books directory {} did not exist; created it empty", dir.display());
            return Ok(Self::default());
        }

        let mut loaded = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                warn!("Skipping file with non UTF-8 name: {}", path.display());
                continue;
            };
            let Some(kind) = DocumentKind::from_path(&path) else {
                continue;
            };

            match kind.load(&path) {
                Ok(text) => {
                    info!("📖 Loaded {name} ({} chars)", text.chars().count());
                    loaded.push((name, text));
                }
                Err(e) => warn!("Skipping {name}: {e}"),
            }
        }

        let library = Self::from_documents(loaded);
        if library.is_empty() {
            warn!("No books found in {}", dir.display());
        } else {
            info!("Loaded {} book(s) from {}", library.len(), dir.display());
        }
        Ok(library)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.documents
            .binary_search_by(|d| d.name.as_str().cmp(name))
            .ok()
            .map(|i| self.documents[i].text.as_str())
    }

    /// Case-sensitive substring search over every line, in document then
    /// line order. Returns at most [`MAX_SEARCH_RESULTS`] hits.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        self.documents
            .iter()
            .flat_map(|doc| {
                doc.text
                    .split('\n')
                    .filter(move |line| line.contains(query))
                    .map(move |line| SearchHit {
                        document: doc.name.clone(),
                        line: line.to_string(),
                    })
            })
            .take(MAX_SEARCH_RESULTS)
            .collect()
    }

    /// Leading slice of the first document, used as quiz input.
    pub fn excerpt(&self) -> String {
        match self.documents.first() {
            Some(doc) => doc.text.chars().take(EXCERPT_CHARS).collect(),
            None => NO_TEXT_PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Docx,
    PlainText,
}

impl DocumentKind {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::PlainText),
            _ => None,
        }
    }

    fn load(self, path: &Path) -> Result<String, String> {
        let data = std::fs::read(path).map_err(|e| format!("failed to read file: {e}"))?;
        let paragraphs = match self {
            Self::Docx => docx::extract_paragraphs(&data)?,
            Self::PlainText => {
                let text = String::from_utf8(data).map_err(|e| format!("not valid UTF-8: {e}"))?;
                text.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect()
            }
        };
        Ok(paragraphs.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Library {
        Library::from_documents([
            ("b.docx", "second book\nworld two\nmore world"),
            ("a.docx", "Hello world\nFoo bar"),
        ])
    }

    #[test]
    fn test_documents_sorted_by_name() {
        let lib = sample();
        let names: Vec<_> = lib.documents().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.docx", "b.docx"]);
        assert_eq!(lib.get("a.docx"), Some("Hello world\nFoo bar"));
        assert_eq!(lib.get("missing.docx"), None);
    }

    #[test]
    fn test_search_single_match() {
        let lib = Library::from_documents([("a.doc", "Hello world\nFoo bar")]);
        assert_eq!(
            lib.search("world"),
            vec![SearchHit { document: "a.doc".into(), line: "Hello world".into() }]
        );
    }

    #[test]
    fn test_search_order_document_then_line() {
        let hits = sample().search("world");
        let pairs: Vec<_> = hits.iter().map(|h| (h.document.as_str(), h.line.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("a.docx", "Hello world"),
                ("b.docx", "world two"),
                ("b.docx", "more world"),
            ]
        );
    }

    #[test]
    fn test_search_is_case_sensitive() {
        assert!(sample().search("WORLD").is_empty());
        assert_eq!(sample().search("Hello").len(), 1);
    }

    #[test]
    fn test_search_truncates_to_limit() {
        let text = (0..20).map(|i| format!("line {i} match")).collect::<Vec<_>>().join("\n");
        let lib = Library::from_documents([("big.docx", text)]);
        let hits = lib.search("match");
        assert_eq!(hits.len(), MAX_SEARCH_RESULTS);
        assert_eq!(hits[0].line, "line 0 match");
        assert_eq!(hits[4].line, "line 4 match");
    }

    #[test]
    fn test_search_only_returns_matching_lines() {
        for hit in sample().search("o") {
            assert!(hit.line.contains('o'));
        }
    }

    #[test]
    fn test_search_no_match() {
        assert!(sample().search("absent").is_empty());
        assert!(Library::default().search("anything").is_empty());
    }

    #[test]
    fn test_excerpt_uses_first_document() {
        assert_eq!(sample().excerpt(), "Hello world\nFoo bar");
    }

    #[test]
    fn test_excerpt_truncates_by_chars() {
        let lib = Library::from_documents([("fa.docx", "س".repeat(1500))]);
        let excerpt = lib.excerpt();
        assert_eq!(excerpt.chars().count(), EXCERPT_CHARS);
    }

    #[test]
    fn test_excerpt_placeholder_when_empty() {
        assert_eq!(Library::default().excerpt(), NO_TEXT_PLACEHOLDER);
    }

    #[test]
    fn test_document_kind() {
        assert_eq!(DocumentKind::from_path(Path::new("x/book.DOCX")), Some(DocumentKind::Docx));
        assert_eq!(DocumentKind::from_path(Path::new("notes.txt")), Some(DocumentKind::PlainText));
        assert_eq!(DocumentKind::from_path(Path::new("scan.pdf")), None);
        assert_eq!(DocumentKind::from_path(Path::new("README")), None);
    }
}
