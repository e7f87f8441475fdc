//! Document chunking strategies.
//!
//! Three splitters, matching the shapes retrieval quality tends to want:
//! sentence-packed chunks with a size ceiling, paragraph chunks with a size
//! floor, and markdown-section chunks (split on `##` headings) with a
//! sliding sentence window and overlap.

/// Split `text` into sentences on `.`, `!`, `?` boundaries. Keeps the
/// terminator with the sentence; trims whitespace; drops empties.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Pack whole sentences into chunks of at most `max_chars` characters.
/// A single sentence longer than the ceiling becomes its own chunk rather
/// than being split mid-sentence.
pub fn chunk_by_sentences(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for sentence in split_sentences(text) {
        if !current.is_empty() && current.len() + 1 + sentence.len() > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if current.is_empty() {
            current = sentence;
        } else {
            current.push(' ');
            current.push_str(&sentence);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Split on blank lines, keeping only paragraphs of at least `min_chars`
/// characters. Short fragments (headings, stray lines) are dropped.
pub fn chunk_by_paragraphs(text: &str, min_chars: usize) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| p.len() >= min_chars)
        .map(str::to_string)
        .collect()
}

/// A markdown section: heading title plus sentence-window chunks of its body.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionChunk {
    pub section: String,
    pub text: String,
}

/// Split a markdown document on `##` headings, then window each section's
/// sentences (`window` sentences per chunk, `overlap` sentences carried into
/// the next chunk). Text before the first heading falls under an empty
/// section title.
pub fn chunk_by_sections(text: &str, window: usize, overlap: usize) -> Vec<SectionChunk> {
    let window = window.max(1);
    let stride = window.saturating_sub(overlap).max(1);

    let mut sections: Vec<(String, String)> = Vec::new();
    let mut title = String::new();
    let mut body = String::new();
    for line in text.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            if !body.trim().is_empty() {
                sections.push((title.clone(), std::mem::take(&mut body)));
            } else {
                body.clear();
            }
            title = heading.trim().to_string();
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }
    if !body.trim().is_empty() {
        sections.push((title, body));
    }

    let mut chunks = Vec::new();
    for (section, body) in sections {
        let sentences = split_sentences(&body);
        if sentences.is_empty() {
            continue;
        }
        let mut start = 0;
        loop {
            let end = (start + window).min(sentences.len());
            chunks.push(SectionChunk {
                section: section.clone(),
                text: sentences[start..end].join(" "),
            });
            if end == sentences.len() {
                break;
            }
            start += stride;
        }
    }
    chunks
}
