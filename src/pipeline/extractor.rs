use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::LimitsConfig;
use crate::pipeline::collector::Evidence;
use crate::snapshot::RepositorySnapshot;

/// Appended whenever content is cut at the size bound. Truncation is always
/// explicit, never silent.
const TRUNCATION_MARKER: &str = "\n\n[content truncated]\n";

/// Bytes sniffed for the binary check.
const BINARY_SNIFF_LEN: usize = 8192;

/// One extracted document, normalized and named for the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentationUnit {
    pub source_path: PathBuf,
    pub canonical_name: String,
    pub content: String,
}

/// Find the largest byte index <= `index` that is a char boundary in `s`.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Extract documentation units from the ranked candidates.
///
/// Unreadable or binary-looking candidates are skipped with a log record;
/// zero documentation is a valid result, not an error. Re-running against
/// the same snapshot yields byte-identical units.
pub fn extract(
    snapshot: &RepositorySnapshot,
    evidence: &Evidence,
    limits: &LimitsConfig,
) -> Vec<DocumentationUnit> {
    let mut units = Vec::new();
    let mut seen: HashMap<&'static str, usize> = HashMap::new();

    for candidate in &evidence.doc_candidates {
        let bytes = match snapshot.read(&candidate.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Skipping unreadable candidate: {}", err);
                continue;
            }
        };
        if looks_binary(&bytes) {
            warn!(
                "Skipping binary-looking candidate: {}",
                candidate.path.display()
            );
            continue;
        }

        let text = String::from_utf8_lossy(&bytes);
        let content = normalize(&text, limits.max_doc_bytes);

        let collisions = seen.entry(candidate.canonical).or_insert(0);
        let canonical_name = if *collisions == 0 {
            candidate.canonical.to_string()
        } else {
            suffixed_name(candidate.canonical, *collisions)
        };
        *collisions += 1;

        units.push(DocumentationUnit {
            source_path: candidate.path.clone(),
            canonical_name,
            content,
        });
    }

    info!("Extracted {} documentation unit(s)", units.len());
    units
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .take(BINARY_SNIFF_LEN)
        .any(|&b| b == 0)
}

/// Strip control characters unsafe for markdown (keep `\n` and `\t`, drop
/// `\r` so line endings collapse to LF), then bound the size.
fn normalize(text: &str, max_bytes: usize) -> String {
    let mut cleaned: String = text
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect();

    if cleaned.len() > max_bytes {
        let end = floor_char_boundary(&cleaned, max_bytes);
        cleaned.truncate(end);
        cleaned.push_str(TRUNCATION_MARKER);
    }
    cleaned
}

/// `README.md` + collision 1 → `README-1.md`; extensionless names get a
/// plain `-1` suffix.
fn suffixed_name(canonical: &str, n: usize) -> String {
    match canonical.rsplit_once('.') {
        Some((stem, ext)) => format!("{}-{}.{}", stem, n, ext),
        None => format!("{}-{}", canonical, n),
    }
}
