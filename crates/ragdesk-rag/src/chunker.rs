//! Document chunking
//!
//! Two modes share one packing rule: units are appended to a running buffer
//! and the buffer is flushed when the next unit would push it past the size
//! budget. Plain mode packs sentences. Section-aware mode walks lines, tracks
//! the current section title and emits every content line both on its own and
//! prefixed with its title, plus the complete section once it ends. Lines
//! before the first title are packed like plain text, and a document with no
//! title line at all is chunked in plain mode.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ragdesk_core::{Chunk, ChunkKind, Error, Result, SourceDocument};

/// Longest line still considered a section title
const MAX_TITLE_CHARS: usize = 80;

/// Configuration for chunking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Character budget per chunk
    pub max_chunk_chars: usize,
    /// Chunks shorter than this are dropped
    pub min_chunk_chars: usize,
    /// Use section-aware chunking for documents that support it
    pub structured: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 500,
            min_chunk_chars: 50,
            structured: true,
        }
    }
}

/// Splits raw text into retrieval chunks
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
    title_pattern: Regex,
}

/// A chunk before filtering and id assignment
struct Draft {
    kind: ChunkKind,
    section_title: Option<String>,
    text: String,
}

impl Draft {
    fn new(kind: ChunkKind, section_title: Option<&str>, text: String) -> Self {
        Self {
            kind,
            section_title: section_title.map(str::to_string),
            text,
        }
    }
}

impl Chunker {
    /// Create a chunker, rejecting a zero size budget
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        if config.max_chunk_chars == 0 {
            return Err(Error::Configuration(
                "chunk size must be a positive number of characters".to_string(),
            ));
        }

        let title_pattern = Regex::new(
            r"^(?:\*\*.+\*\*|#{1,6}\s+\S.*|\d{1,2}\.(?:\s+\S.*|[^\d\s].*))$",
        )
        .map_err(|e| Error::Configuration(format!("invalid title pattern: {}", e)))?;

        Ok(Self {
            config,
            title_pattern,
        })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunk a document, using section-aware mode when both the config and
    /// the document kind allow it
    pub fn chunk_document(&self, document: &SourceDocument) -> Vec<Chunk> {
        let structured = self.config.structured && document.kind.is_structured();
        self.chunk_with_mode(&document.filename, &document.text, structured)
    }

    /// Chunk raw text in the configured mode
    pub fn chunk(&self, source_filename: &str, raw_text: &str) -> Vec<Chunk> {
        self.chunk_with_mode(source_filename, raw_text, self.config.structured)
    }

    fn chunk_with_mode(&self, source_filename: &str, raw_text: &str, structured: bool) -> Vec<Chunk> {
        if raw_text.trim().is_empty() {
            return Vec::new();
        }

        let lines: Vec<&str> = raw_text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let structured = structured && lines.iter().any(|line| self.is_title_line(line));

        let drafts = if structured {
            self.section_drafts(&lines)
        } else {
            self.pack_drafts(&split_sentences(raw_text), " ")
        };

        let doc_hash = document_hash(source_filename, raw_text);
        let total = drafts.len();
        let chunks: Vec<Chunk> = drafts
            .into_iter()
            .filter(|draft| draft.text.chars().count() >= self.config.min_chunk_chars)
            .enumerate()
            .map(|(sequence_index, draft)| Chunk {
                id: format!("{}-{:04}", doc_hash, sequence_index),
                text: draft.text,
                section_title: draft.section_title,
                source_filename: source_filename.to_string(),
                sequence_index,
                kind: draft.kind,
            })
            .collect();

        debug!(
            source = source_filename,
            structured,
            kept = chunks.len(),
            dropped = total - chunks.len(),
            "chunked document"
        );
        chunks
    }

    /// Whether a trimmed line looks like a section heading
    pub fn is_title_line(&self, line: &str) -> bool {
        let line = line.trim();
        !line.is_empty()
            && line.chars().count() <= MAX_TITLE_CHARS
            && self.title_pattern.is_match(line)
    }

    fn pack_drafts(&self, units: &[String], separator: &str) -> Vec<Draft> {
        pack_units(units, self.config.max_chunk_chars, separator)
            .into_iter()
            .map(|text| Draft::new(ChunkKind::Fragment, None, text))
            .collect()
    }

    fn section_drafts(&self, lines: &[&str]) -> Vec<Draft> {
        let mut drafts = Vec::new();
        let mut current_title: Option<String> = None;
        let mut section_lines: Vec<String> = Vec::new();
        let mut preamble: Vec<String> = Vec::new();

        for &line in lines {
            if self.is_title_line(line) {
                match current_title.as_deref() {
                    Some(title) => self.flush_section(title, &section_lines, &mut drafts),
                    None => drafts.extend(self.pack_drafts(&std::mem::take(&mut preamble), "\n")),
                }
                let title = clean_title(line);
                drafts.push(Draft::new(ChunkKind::Title, Some(&title), title.clone()));
                current_title = Some(title);
                section_lines.clear();
                continue;
            }

            match current_title.as_deref() {
                Some(title) => {
                    drafts.push(Draft::new(ChunkKind::Standalone, Some(title), line.to_string()));
                    drafts.push(Draft::new(
                        ChunkKind::Item,
                        Some(title),
                        format!("{}\n{}", title, line),
                    ));
                    section_lines.push(line.to_string());
                }
                None => preamble.push(line.to_string()),
            }
        }

        if let Some(title) = current_title.as_deref() {
            self.flush_section(title, &section_lines, &mut drafts);
        }
        drafts
    }

    fn flush_section(&self, title: &str, lines: &[String], drafts: &mut Vec<Draft>) {
        if lines.is_empty() {
            return;
        }

        let mut units = Vec::with_capacity(lines.len() + 1);
        units.push(title.to_string());
        units.extend(lines.iter().cloned());

        let pieces = pack_units(&units, self.config.max_chunk_chars, "\n");
        if pieces.len() == 1 {
            drafts.extend(
                pieces
                    .into_iter()
                    .map(|text| Draft::new(ChunkKind::CompleteSection, Some(title), text)),
            );
        } else {
            // oversized section: keep the parts, but they are no longer complete
            drafts.extend(
                pieces
                    .into_iter()
                    .map(|text| Draft::new(ChunkKind::Fragment, Some(title), text)),
            );
        }
    }
}

/// Split text into sentence units: a unit ends at a line break or at a
/// sentence terminator followed by whitespace
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' || c == '\r' {
            push_unit(&mut units, &mut current);
            continue;
        }

        current.push(c);
        let terminator = matches!(c, '.' | '!' | '?' | '。' | '！' | '？');
        if terminator && chars.peek().is_none_or(|next| next.is_whitespace()) {
            push_unit(&mut units, &mut current);
        }
    }
    push_unit(&mut units, &mut current);
    units
}

fn push_unit(units: &mut Vec<String>, current: &mut String) {
    let unit = current.trim();
    if !unit.is_empty() {
        units.push(unit.to_string());
    }
    current.clear();
}

/// Pack units into chunks of at most `max_chars` characters
///
/// A unit that does not fit starts a new chunk; a single unit longer than the
/// budget becomes a chunk of its own.
pub fn pack_units(units: &[String], max_chars: usize, separator: &str) -> Vec<String> {
    let separator_len = separator.chars().count();
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0usize;

    for unit in units {
        let unit_len = unit.chars().count();
        if !buffer.is_empty() && buffer_len + separator_len + unit_len > max_chars {
            chunks.push(std::mem::take(&mut buffer));
            buffer_len = 0;
        }

        if !buffer.is_empty() {
            buffer.push_str(separator);
            buffer_len += separator_len;
        }
        buffer.push_str(unit);
        buffer_len += unit_len;
    }

    if !buffer.is_empty() {
        chunks.push(buffer);
    }
    chunks
}

fn clean_title(line: &str) -> String {
    line.trim_start_matches('#').replace("**", "").trim().to_string()
}

/// Stable per-version hash of a document
fn document_hash(source_filename: &str, raw_text: &str) -> String {
    let mut context = md5::Context::new();
    context.consume(source_filename.as_bytes());
    context.consume([0u8]);
    context.consume(raw_text.as_bytes());
    let digest = format!("{:x}", context.compute());
    digest[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_chunker(max_chunk_chars: usize, min_chunk_chars: usize) -> Chunker {
        Chunker::new(ChunkerConfig {
            max_chunk_chars,
            min_chunk_chars,
            structured: false,
        })
        .unwrap()
    }

    fn section_chunker(min_chunk_chars: usize) -> Chunker {
        Chunker::new(ChunkerConfig {
            max_chunk_chars: 500,
            min_chunk_chars,
            structured: true,
        })
        .unwrap()
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let err = Chunker::new(ChunkerConfig {
            max_chunk_chars: 0,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_blank_input_yields_nothing() {
        let chunker = plain_chunker(100, 1);
        assert!(chunker.chunk("empty.txt", "").is_empty());
        assert!(chunker.chunk("empty.txt", "   \n\t\n").is_empty());
    }

    #[test]
    fn test_split_sentences() {
        let units = split_sentences("Printer IP is 192.168.1.50. Ask IT! Really?\nNext line");
        assert_eq!(
            units,
            vec!["Printer IP is 192.168.1.50.", "Ask IT!", "Really?", "Next line"]
        );
    }

    #[test]
    fn test_pack_units_respects_budget() {
        let units: Vec<String> = ["aaaa", "bbbb", "cccc", "dd"].iter().map(|s| s.to_string()).collect();
        let packed = pack_units(&units, 9, " ");
        assert_eq!(packed, vec!["aaaa bbbb", "cccc dd"]);
    }

    #[test]
    fn test_oversized_unit_stands_alone() {
        let units: Vec<String> = ["short", "a-very-long-unit-that-overflows", "tail"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let packed = pack_units(&units, 10, " ");
        assert_eq!(packed, vec!["short", "a-very-long-unit-that-overflows", "tail"]);
    }

    #[test]
    fn test_chunks_stay_within_budget_plus_one_unit() {
        let text = "The office opens at nine. Visitors sign in at the front desk. \
                    Badges are issued by security. The cafeteria closes at two. \
                    Parking is on level minus one. Bicycles go in the courtyard.";
        let max = 60;
        let chunker = plain_chunker(max, 1);
        let units = split_sentences(text);
        let longest_unit = units.iter().map(|u| u.chars().count()).max().unwrap();

        let chunks = chunker.chunk("office.txt", text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= max + longest_unit);
            assert_eq!(chunk.kind, ChunkKind::Fragment);
        }

        let rebuilt: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        assert_eq!(rebuilt.join(" "), units.join(" "));
    }

    #[test]
    fn test_short_chunks_are_dropped() {
        let chunker = plain_chunker(40, 20);
        let text = "Hi.\n\nThe guest network password is Welcome2024 today.";
        let chunks = chunker.chunk("guest.txt", text);

        assert!(chunks.iter().all(|c| c.text.chars().count() >= 20));
        assert!(chunks.iter().all(|c| c.text != "Hi."));
        assert_eq!(chunks[0].sequence_index, 0);
    }

    #[test]
    fn test_ids_are_stable_and_unique() {
        let chunker = plain_chunker(30, 1);
        let text = "First sentence is here. Second sentence is here. Third one too.";
        let first = chunker.chunk("a.txt", text);
        let second = chunker.chunk("a.txt", text);
        assert_eq!(first, second);

        let mut ids: Vec<&str> = first.iter().map(|c| c.id.as_str()).collect();
        ids.dedup();
        assert_eq!(ids.len(), first.len());

        let other = chunker.chunk("b.txt", text);
        assert_ne!(first[0].id, other[0].id);
    }

    #[test]
    fn test_title_detection() {
        let chunker = section_chunker(1);
        assert!(chunker.is_title_line("**Company Google account**"));
        assert!(chunker.is_title_line("## Wi-Fi"));
        assert!(chunker.is_title_line("1. Printer"));
        assert!(chunker.is_title_line("2.Adobe"));
        assert!(!chunker.is_title_line("10.0.0.1 is the gateway"));
        assert!(!chunker.is_title_line("192.168.1.50"));
        assert!(!chunker.is_title_line("-Id : pstorm2019@gmail.com"));
        assert!(!chunker.is_title_line(&format!("**{}**", "x".repeat(90))));
    }

    #[test]
    fn test_section_aware_chunking() {
        let chunker = section_chunker(1);
        let text = "Internal IT notes\n\
                    **Company Google account**\n\
                    -Id : office@gmail.com\n\
                    -Pw : Google123!\n\
                    **Wi-Fi**\n\
                    SSID CorpNet / Corp2024!\n";

        let chunks = chunker.chunk("it.docx", text);
        let summary: Vec<(ChunkKind, &str)> =
            chunks.iter().map(|c| (c.kind, c.text.as_str())).collect();

        assert_eq!(
            summary,
            vec![
                (ChunkKind::Fragment, "Internal IT notes"),
                (ChunkKind::Title, "Company Google account"),
                (ChunkKind::Standalone, "-Id : office@gmail.com"),
                (ChunkKind::Item, "Company Google account\n-Id : office@gmail.com"),
                (ChunkKind::Standalone, "-Pw : Google123!"),
                (ChunkKind::Item, "Company Google account\n-Pw : Google123!"),
                (
                    ChunkKind::CompleteSection,
                    "Company Google account\n-Id : office@gmail.com\n-Pw : Google123!"
                ),
                (ChunkKind::Title, "Wi-Fi"),
                (ChunkKind::Standalone, "SSID CorpNet / Corp2024!"),
                (ChunkKind::Item, "Wi-Fi\nSSID CorpNet / Corp2024!"),
                (ChunkKind::CompleteSection, "Wi-Fi\nSSID CorpNet / Corp2024!"),
            ]
        );

        assert_eq!(chunks[0].section_title, None);
        assert_eq!(chunks[3].section_title.as_deref(), Some("Company Google account"));
        let indices: Vec<usize> = chunks.iter().map(|c| c.sequence_index).collect();
        assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_headingless_text_is_packed() {
        let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
        let text = "WiFi network: CorpNet, password: Corp2024!\nPrinter IP: 192.168.1.50\n";
        let chunks = chunker.chunk("it.txt", text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::Fragment);
        assert_eq!(
            chunks[0].text,
            "WiFi network: CorpNet, password: Corp2024! Printer IP: 192.168.1.50"
        );
    }

    #[test]
    fn test_preamble_is_packed_before_first_title() {
        let chunker = section_chunker(40);
        let text = "Welcome to the office.\n\
                    Read this before your first day.\n\
                    ## Printer\n\
                    The second floor printer lives at 192.168.1.50\n";
        let chunks = chunker.chunk("onboarding.md", text);

        assert_eq!(chunks[0].kind, ChunkKind::Fragment);
        assert_eq!(
            chunks[0].text,
            "Welcome to the office.\nRead this before your first day."
        );
        assert_eq!(chunks[0].section_title, None);
        assert!(chunks.iter().any(|c| c.kind == ChunkKind::CompleteSection));
    }

    #[test]
    fn test_section_minimum_length_filters_titles() {
        let chunker = section_chunker(30);
        let text = "## Printer\nThe second floor printer lives at 192.168.1.50\n";
        let chunks = chunker.chunk("printer.md", text);

        assert!(chunks.iter().all(|c| c.kind != ChunkKind::Title));
        assert!(chunks.iter().any(|c| c.kind == ChunkKind::CompleteSection));
        assert!(chunks.iter().all(|c| c.text.chars().count() >= 30));
    }

    #[test]
    fn test_oversized_section_is_split() {
        let chunker = Chunker::new(ChunkerConfig {
            max_chunk_chars: 40,
            min_chunk_chars: 1,
            structured: true,
        })
        .unwrap();
        let text = "**Servers**\nbuild01 runs the nightly jobs\nbuild02 mirrors build01\nbackup01 keeps snapshots\n";
        let chunks = chunker.chunk("servers.txt", text);

        assert!(chunks.iter().all(|c| c.kind != ChunkKind::CompleteSection));
        let parts: Vec<&Chunk> = chunks
            .iter()
            .filter(|c| c.kind == ChunkKind::Fragment)
            .collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].text.starts_with("Servers\n"));
        assert!(parts.iter().all(|c| c.section_title.as_deref() == Some("Servers")));
    }

    #[test]
    fn test_pdf_documents_use_plain_mode() {
        let chunker = section_chunker(1);
        let document = SourceDocument::new(
            "manual.pdf",
            "## Heading\nBody text follows.",
            ragdesk_core::DocumentKind::Pdf,
        );
        let chunks = chunker.chunk_document(&document);
        assert!(chunks.iter().all(|c| c.kind == ChunkKind::Fragment));
    }
}
