//! File orchestration: split, classify, resolve and reconcile each document,
//! then write the file back if anything changed.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::directive::reconcile;
use crate::document::{join_documents, split_documents, Document};
use crate::error::AnnotateError;
use crate::query::{JmespathEngine, QueryEngine};
use crate::resource::{classify, Classification};
use crate::schema::resolve_schema;

/// Status of a processed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Nothing needed to change.
    Unchanged,
    /// The file was rewritten.
    Updated,
    /// The path does not exist; skipped.
    Missing,
    /// The file could not be processed completely.
    Error,
}

/// A problem found while processing a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based document number, when the problem is tied to one document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<usize>,
    pub message: String,
}

/// Result of processing a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// No changes and no errors.
    Clean,
    /// At least one file was rewritten.
    Changed,
    /// At least one file or document failed.
    Error,
}

impl RunStatus {
    /// Returns the process exit code for this status.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Clean => 0,
            RunStatus::Changed => 1,
            RunStatus::Error => 2,
        }
    }
}

/// Result of processing a list of files.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn updated(&self) -> usize {
        self.count(FileStatus::Updated)
    }

    pub fn errors(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Error || !f.diagnostics.is_empty())
            .count()
    }

    /// Errors take precedence over changes.
    pub fn status(&self) -> RunStatus {
        if self.errors() > 0 {
            RunStatus::Error
        } else if self.updated() > 0 {
            RunStatus::Changed
        } else {
            RunStatus::Clean
        }
    }

    fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }
}

/// Outcome of annotating in-memory text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOutcome {
    pub text: String,
    /// True if at least one document was reconciled with a change.
    pub changed: bool,
    /// Per-document parse problems; those documents are left as they were.
    pub diagnostics: Vec<Diagnostic>,
}

/// Annotates files according to a [`Config`].
pub struct Annotator<'a> {
    config: &'a Config,
    engine: &'a dyn QueryEngine,
}

impl<'a> Annotator<'a> {
    /// Create an annotator using JMESPath for structured queries.
    pub fn new(config: &'a Config) -> Self {
        Self::with_engine(config, &JmespathEngine)
    }

    pub fn with_engine(config: &'a Config, engine: &'a dyn QueryEngine) -> Self {
        Self { config, engine }
    }

    /// Annotate every resource document in `text`.
    ///
    /// `file` is the path used for `file_regex` rules and the `{file}`
    /// variable. A template error aborts the whole text.
    pub fn annotate_text(&self, text: &str, file: &Path) -> Result<TextOutcome, AnnotateError> {
        let file_posix = normalize_path(file);
        let mut changed = false;
        let mut diagnostics = Vec::new();
        let mut documents = Vec::new();

        for (index, Document { marker, body }) in split_documents(text).into_iter().enumerate() {
            let resource = match classify(&body, self.config) {
                Ok(Classification::Resource(resource)) => resource,
                Ok(Classification::Passthrough) => {
                    documents.push(Document { marker, body });
                    continue;
                }
                Err(e) => {
                    diagnostics.push(Diagnostic {
                        document: Some(index + 1),
                        message: e.to_string(),
                    });
                    documents.push(Document { marker, body });
                    continue;
                }
            };

            let expected = resolve_schema(self.config, &resource, &file_posix, self.engine)?;
            let (body, doc_changed) = reconcile(&body, &expected);
            if doc_changed {
                tracing::debug!(file = %file_posix, document = index + 1, schema = %expected, "directive updated");
            }
            changed |= doc_changed;
            documents.push(Document { marker, body });
        }

        Ok(TextOutcome {
            text: join_documents(&documents),
            changed,
            diagnostics,
        })
    }

    /// Annotate one file in place.
    ///
    /// The file is written at most once, and only if its content changed.
    pub fn annotate_file(&self, path: &Path) -> FileReport {
        match self.try_annotate_file(path) {
            Ok(report) => report,
            Err(e) => FileReport {
                file: path.to_path_buf(),
                status: FileStatus::Error,
                diagnostics: vec![Diagnostic {
                    document: None,
                    message: e.to_string(),
                }],
            },
        }
    }

    fn try_annotate_file(&self, path: &Path) -> Result<FileReport, AnnotateError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "skipping missing file");
            return Ok(FileReport {
                file: path.to_path_buf(),
                status: FileStatus::Missing,
                diagnostics: Vec::new(),
            });
        }

        let text = std::fs::read_to_string(path).map_err(|source| AnnotateError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let outcome = self.annotate_text(&text, path)?;

        let status = if outcome.changed && outcome.text != text {
            std::fs::write(path, &outcome.text).map_err(|source| AnnotateError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            FileStatus::Updated
        } else if outcome.diagnostics.is_empty() {
            FileStatus::Unchanged
        } else {
            FileStatus::Error
        };

        Ok(FileReport {
            file: path.to_path_buf(),
            status,
            diagnostics: outcome.diagnostics,
        })
    }

    /// Annotate files in order; failures never stop the batch.
    pub fn run<P: AsRef<Path>>(&self, paths: &[P]) -> RunReport {
        RunReport {
            files: paths.iter().map(|p| self.annotate_file(p.as_ref())).collect(),
        }
    }
}

/// Render a path with forward slashes for rule matching.
pub fn normalize_path(path: &Path) -> String {
    let display = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        display.into_owned()
    } else {
        display.replace(std::path::MAIN_SEPARATOR, "/")
    }
}
