use std::collections::VecDeque;

use crate::rag::document::Document;

pub const DEFAULT_CHUNK_SIZE: usize = 1024;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Markdown-friendly recursive splitter. Sizes are counted in characters.
///
/// Text is cut at the coarsest separator that yields pieces no longer than
/// `chunk_size` (headings, paragraphs, lines, words, then characters). Pieces are
/// then packed into chunks, each chunk starting with the tail of the previous one
/// up to `chunk_overlap` characters.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    separators: Vec<&'static str>,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: vec!["\n## ", "\n### ", "\n\n", "\n", " "],
        }
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        self.pieces(text, 0, &mut pieces);
        self.merge(pieces)
    }

    /// Split every document, chunks inherit the metadata of their source
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Document> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.page_content)
                    .into_iter()
                    .map(move |chunk| Document {
                        page_content: chunk,
                        metadata: doc.metadata.clone(),
                        score: None,
                    })
            })
            .collect()
    }

    fn pieces<'a>(&self, text: &'a str, level: usize, out: &mut Vec<&'a str>) {
        if char_len(text) <= self.chunk_size {
            out.push(text);
            return;
        }

        let Some(separator) = self.separators.get(level) else {
            self.hard_split(text, out);
            return;
        };

        for piece in split_keeping(text, separator) {
            if char_len(piece) <= self.chunk_size {
                out.push(piece);
            } else {
                self.pieces(piece, level + 1, out);
            }
        }
    }

    fn hard_split<'a>(&self, text: &'a str, out: &mut Vec<&'a str>) {
        let mut start = 0;
        let mut count = 0;
        for (index, _) in text.char_indices() {
            if count == self.chunk_size {
                out.push(&text[start..index]);
                start = index;
                count = 0;
            }
            count += 1;
        }
        if start < text.len() {
            out.push(&text[start..]);
        }
    }

    fn merge(&self, pieces: Vec<&str>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: VecDeque<(&str, usize)> = VecDeque::new();
        let mut current_len = 0;

        for piece in pieces {
            let len = char_len(piece);
            if current_len + len > self.chunk_size && !current.is_empty() {
                push_chunk(&mut chunks, &current);
                // keep a tail no longer than the overlap that still leaves room for `piece`
                while let Some((_, front_len)) = current.front().copied() {
                    if current_len > self.chunk_overlap || current_len + len > self.chunk_size {
                        current.pop_front();
                        current_len -= front_len;
                    } else {
                        break;
                    }
                }
            }
            current.push_back((piece, len));
            current_len += len;
        }
        push_chunk(&mut chunks, &current);

        chunks
    }
}

fn push_chunk(chunks: &mut Vec<String>, current: &VecDeque<(&str, usize)>) {
    let chunk: String = current.iter().map(|(piece, _)| *piece).collect();
    let chunk = chunk.trim();
    if !chunk.is_empty() {
        chunks.push(chunk.to_string());
    }
}

/// Split before every occurrence of `separator`, the separator stays at the start
/// of the following piece so concatenating the pieces gives back `text`
fn split_keeping<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(separator) {
        if index > start {
            pieces.push(&text[start..index]);
            start = index;
        }
    }
    pieces.push(&text[start..]);
    pieces
}
