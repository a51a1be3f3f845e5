//! Lossless splitting of a YAML stream into `---` separated documents.
//!
//! Only a column-0 `---` line (optionally followed by whitespace) counts as a
//! marker, which is the common form in Kubernetes manifests. Markers are kept
//! verbatim so that [`join_documents`] reproduces the input byte for byte.

/// One document of a multi-document YAML stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Separator line preceding the body, including its line terminator.
    /// Empty for the first document.
    pub marker: String,
    /// Document text up to (not including) the next marker.
    pub body: String,
}

impl Document {
    pub fn new(marker: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            body: body.into(),
        }
    }
}

/// Returns true if `line` (terminator included) is a document marker.
fn is_marker_line(line: &str) -> bool {
    line.strip_prefix("---")
        .map(|rest| rest.trim_end().is_empty())
        .unwrap_or(false)
}

/// Split `text` into documents.
///
/// Always yields at least one document; empty input yields a single document
/// with an empty marker and empty body.
pub fn split_documents(text: &str) -> Vec<Document> {
    let mut documents = Vec::new();
    let mut marker = String::new();
    let mut body_start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        if is_marker_line(line) {
            documents.push(Document::new(
                std::mem::take(&mut marker),
                &text[body_start..line_start],
            ));
            marker = line.to_string();
            body_start = offset;
        }
    }

    documents.push(Document::new(marker, &text[body_start..]));
    documents
}

/// Concatenate documents back into a single stream.
pub fn join_documents(documents: &[Document]) -> String {
    let capacity = documents
        .iter()
        .map(|d| d.marker.len() + d.body.len())
        .sum();
    documents
        .iter()
        .fold(String::with_capacity(capacity), |mut out, d| {
            out.push_str(&d.marker);
            out.push_str(&d.body);
            out
        })
}
