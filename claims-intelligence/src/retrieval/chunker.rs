use std::collections::VecDeque;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", ".", " "];

/// Recursive character splitter. Sizes are counted in characters.
///
/// Text is split on the first separator present, pieces are packed into chunks
/// of at most `chunk_size` with up to `chunk_overlap` carried into the next
/// chunk, and pieces that are still too long are split again with the
/// remaining separators. Separators stay attached to the start of the piece
/// that follows them.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let Some(position) = separators.iter().position(|s| text.contains(s.as_str())) else {
            return self.split_fixed(text);
        };
        let separator = &separators[position];
        let finer = &separators[position + 1..];

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if finer.is_empty() {
                chunks.extend(self.split_fixed(piece));
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks
    }

    /// Pack small pieces into chunks, carrying a tail of up to `chunk_overlap` forward.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_trimmed(&mut chunks, &window);
                while total > self.chunk_overlap
                    || (total + len > self.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }
        push_trimmed(&mut chunks, &window);
        chunks
    }

    /// Fixed windows for text without any separator.
    fn split_fixed(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

fn push_trimmed(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_text() -> String {
        let mut text = String::new();
        for section in 1..=6 {
            text.push_str(&format!("Section {section}. Coverage terms\n"));
            for clause in 1..=8 {
                text.push_str(&format!(
                    "Clause {section}.{clause}: the insurer will pay reasonable hospitalisation expenses. "
                ));
            }
            text.push_str("\n\n");
        }
        text
    }

    #[test]
    fn short_text_is_one_chunk() {
        let splitter = TextSplitter::default();
        assert_eq!(splitter.split("  Room rent is capped.  "), vec!["Room rent is capped."]);
        assert!(splitter.split("   ").is_empty());
    }

    #[test]
    fn chunks_respect_the_size_limit() {
        let splitter = TextSplitter::default();
        let chunks = splitter.split(&policy_text());

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= DEFAULT_CHUNK_SIZE, "{}", chunk.len());
        }
    }

    #[test]
    fn paragraphs_are_preferred_boundaries() {
        let splitter = TextSplitter::new(60, 10);
        let chunks = splitter.split("First paragraph here.\n\nSecond paragraph here.");
        assert_eq!(chunks, vec!["First paragraph here.\n\nSecond paragraph here."]);

        let splitter = TextSplitter::new(30, 0);
        let chunks = splitter.split("First paragraph here.\n\nSecond paragraph here.");
        assert_eq!(chunks, vec!["First paragraph here.", "Second paragraph here."]);
    }

    #[test]
    fn neighbouring_chunks_overlap() {
        let splitter = TextSplitter::new(40, 15);
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
        let chunks = splitter.split(text);

        assert!(chunks.len() >= 2);
        let first_words: Vec<&str> = chunks[0].split(' ').collect();
        let last_of_first = first_words.last().unwrap();
        assert!(chunks[1].contains(last_of_first));
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 40);
        }
    }

    #[test]
    fn text_without_separators_uses_fixed_windows() {
        let splitter = TextSplitter::new(10, 2);
        let chunks = splitter.split("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(chunks, vec!["abcdefghij", "ijklmnopqr", "qrstuvwxyz"]);
    }

    #[test]
    fn separators_stay_with_the_following_piece() {
        assert_eq!(
            split_keeping_separator("a.b.c", "."),
            vec!["a", ".b", ".c"]
        );
        assert_eq!(split_keeping_separator(".a", "."), vec![".a"]);
    }
}
