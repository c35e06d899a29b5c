use crate::schema::TextChunk;

/// Approximate analysis cost of a line: one unit per four characters.
pub fn estimate_cost(line: &str) -> usize {
    line.chars().count() / 4
}

/// Splits `text` into line-aligned chunks whose estimated cost stays within `max_size`.
///
/// Lines are never split, so a single line costing more than `max_size` becomes
/// its own oversized chunk. Joining the chunk contents with `'\n'` gives back the
/// original text.
pub fn chunk_text(text: &str, max_size: usize) -> Vec<TextChunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let max_size = max_size.max(1);
    let mut chunks = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    let mut running = 0usize;

    for line in text.split('\n') {
        let cost = estimate_cost(line);
        if !buffer.is_empty() && running + cost > max_size {
            chunks.push(TextChunk {
                index: chunks.len(),
                content: buffer.join("\n"),
            });
            buffer.clear();
            running = 0;
        }
        buffer.push(line);
        running += cost;
    }

    if !buffer.is_empty() {
        chunks.push(TextChunk {
            index: chunks.len(),
            content: buffer.join("\n"),
        });
    }

    chunks
}

/// Cost of a whole chunk, summed per line the same way [`chunk_text`] counts it.
pub fn chunk_cost(chunk: &TextChunk) -> usize {
    chunk.content.split('\n').map(estimate_cost).sum()
}
