use ragpipe_core::{Chunk, Error, RawDocument, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 500;

/// Boundary preference, largest unit first. A window that contains none of
/// these is hard-cut at exactly `chunk_size` characters.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Splits documents into overlapping character windows.
///
/// All sizes are measured in characters, never bytes; slicing walks char
/// boundaries so multi-byte text cannot panic. Pure function of its input.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            // An overlap as large as the window would never advance.
            return Err(Error::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk indices restart at 0 for every source document; source order
    /// is preserved and metadata is inherited from the parent document.
    pub fn split(&self, documents: &[RawDocument]) -> Vec<Chunk> {
        let mut out = Vec::new();
        for doc in documents {
            for (chunk_index, text) in self.split_text(&doc.content).into_iter().enumerate() {
                out.push(Chunk {
                    text,
                    source_url: doc.source_url.clone(),
                    chunk_index,
                    metadata: doc.metadata.clone(),
                });
            }
        }
        out
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        // Byte offset of every char, plus a sentinel for the end, so any
        // char-indexed window maps to a valid byte slice.
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        let n = offsets.len() - 1;

        let mut out = Vec::new();
        let mut pos = 0usize;
        while pos < n {
            let limit = (pos + self.chunk_size).min(n);
            let end = if limit == n {
                n
            } else {
                self.window_end(text, &offsets, pos, limit)
            };

            let piece = &text[offsets[pos]..offsets[end]];
            if !piece.trim().is_empty() {
                out.push(piece.to_string());
            }
            if end == n {
                break;
            }
            // The next window re-covers the tail of this one.
            pos = end.saturating_sub(self.chunk_overlap).max(pos + 1);
        }
        out
    }

    /// End of the window starting at `pos`: just after the last occurrence
    /// of the largest separator inside `[pos, limit)`, else the hard cut.
    ///
    /// A boundary inside the overlap region would make the next window start
    /// at or before `pos` and stall the walk, so such cuts are rejected in
    /// favor of a smaller separator (or the hard cut).
    fn window_end(&self, text: &str, offsets: &[usize], pos: usize, limit: usize) -> usize {
        let window = &text[offsets[pos]..offsets[limit]];
        for sep in SEPARATORS {
            if let Some(rel) = window.rfind(sep) {
                let end = pos + window[..rel + sep.len()].chars().count();
                if end > pos + self.chunk_overlap {
                    return end;
                }
            }
        }
        limit
    }
}
