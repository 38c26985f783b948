//! Speech chunk assembly.
//!
//! Merges consecutive speeches into chunks sized for one backend call.
//! The chunk text is the unit of idempotence: its SHA-256 digest keys the
//! gloss cache, so identical text never pays for generation twice.

use sha2::{Digest, Sha256};

use crate::parser::Speech;

/// One or more consecutive speeches merged into a single work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechChunk {
    /// The merged speeches, in source order. Never empty.
    pub speeches: Vec<Speech>,
    /// Speech texts, each right-trimmed, joined by one blank line.
    pub text: String,
    /// SHA-256 hex digest of `text`.
    pub hash: String,
    /// Source lines covered, headings included.
    pub line_count: usize,
}

impl SpeechChunk {
    fn new(speeches: Vec<Speech>) -> Self {
        let text = speeches
            .iter()
            .map(|s| s.text.trim_end())
            .collect::<Vec<_>>()
            .join("\n\n");
        let hash = content_hash(&text);
        let line_count = speeches.iter().map(|s| s.line_count()).sum();
        SpeechChunk {
            speeches,
            text,
            hash,
            line_count,
        }
    }

    /// First 8 hex digits of the hash, for logs and error context.
    pub fn hash_prefix(&self) -> &str {
        &self.hash[..8]
    }

    /// "HAMLET" for a monologue, "HAMLET ... OPHELIA (4 speeches)" for a
    /// merged chunk.
    pub fn speaker_summary(&self) -> String {
        match self.speeches.as_slice() {
            [] => String::new(),
            [only] => only.speaker.clone(),
            [first, .., last] => format!(
                "{} ... {} ({} speeches)",
                first.speaker,
                last.speaker,
                self.speeches.len()
            ),
        }
    }

    /// True when the chunk holds exactly one speech.
    pub fn is_monologue(&self) -> bool {
        self.speeches.len() == 1
    }
}

/// Deterministic content hash used as the cache key.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Merge speeches into chunks under a line-count threshold.
///
/// `threshold <= 0` disables merging: every speech becomes its own chunk.
/// Otherwise speeches accumulate greedily, with one exception: an empty
/// running chunk accepts the next speech unconditionally, so a monologue
/// longer than the threshold is never split. Multi-speech chunks never
/// exceed the threshold beyond the unavoidable size of their first speech.
pub fn assemble(speeches: Vec<Speech>, threshold: i64) -> Vec<SpeechChunk> {
    if threshold <= 0 {
        return speeches
            .into_iter()
            .map(|s| SpeechChunk::new(vec![s]))
            .collect();
    }

    let mut chunks = Vec::new();
    let mut running: Vec<Speech> = Vec::new();
    let mut running_lines = 0usize;

    for speech in speeches {
        let lines = speech.line_count();
        if !running.is_empty() && running_lines + lines > threshold as usize {
            chunks.push(SpeechChunk::new(std::mem::take(&mut running)));
            running_lines = 0;
        }
        running_lines += lines;
        running.push(speech);
    }

    if !running.is_empty() {
        chunks.push(SpeechChunk::new(running));
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::registry::CharacterRegistry;
    use crate::parser::segment::segment;
    use crate::parser::LineRange;

    fn speech(speaker: &str, body_lines: usize) -> Speech {
        let mut text: Vec<String> = vec![format!("{}.", speaker)];
        for i in 0..body_lines {
            text.push(format!("Line {} of {}.", i + 1, speaker));
        }
        let lines: Vec<String> = text.clone();
        let registry = CharacterRegistry::from_names([speaker]);
        let mut speeches = segment(&lines, LineRange::new(0, lines.len() - 1), &registry);
        speeches.remove(0)
    }

    // ============================================
    // Assembly Tests
    // ============================================

    #[test]
    fn zero_threshold_yields_singletons() {
        let chunks = assemble(vec![speech("A", 2), speech("B", 2), speech("C", 2)], 0);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.is_monologue()));
    }

    #[test]
    fn negative_threshold_yields_singletons() {
        let chunks = assemble(vec![speech("A", 2), speech("B", 2)], -5);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn merges_under_threshold() {
        // Each speech is 3 lines (heading + 2); threshold 10 fits three.
        let chunks = assemble(vec![speech("A", 2), speech("B", 2), speech("C", 2)], 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].speeches.len(), 3);
        assert_eq!(chunks[0].line_count, 9);
    }

    #[test]
    fn splits_at_threshold() {
        // 3 lines each; threshold 6 fits exactly two per chunk.
        let chunks = assemble(
            vec![speech("A", 2), speech("B", 2), speech("C", 2), speech("D", 2)],
            6,
        );
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].speeches.len(), 2);
        assert_eq!(chunks[1].speeches.len(), 2);
    }

    #[test]
    fn long_monologue_never_split() {
        // 21 lines against a threshold of 10: accepted whole.
        let chunks = assemble(vec![speech("A", 20), speech("B", 2)], 10);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].speeches[0].speaker, "A");
        assert_eq!(chunks[0].line_count, 21);
    }

    #[test]
    fn assembly_preserves_order_without_loss() {
        let speakers = ["A", "B", "C", "D", "E"];
        let input: Vec<Speech> = speakers.iter().map(|s| speech(s, 2)).collect();
        let chunks = assemble(input.clone(), 7);

        let flattened: Vec<Speech> = chunks.into_iter().flat_map(|c| c.speeches).collect();
        assert_eq!(flattened, input);
    }

    #[test]
    fn final_partial_chunk_flushed() {
        let chunks = assemble(vec![speech("A", 2), speech("B", 2), speech("C", 2)], 6);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].speeches.len(), 1);
    }

    #[test]
    fn no_chunk_is_empty() {
        for threshold in [-1, 0, 1, 5, 100] {
            let chunks = assemble(vec![speech("A", 4), speech("B", 1)], threshold);
            assert!(chunks.iter().all(|c| !c.speeches.is_empty()));
        }
    }

    // ============================================
    // Chunk Text and Hash Tests
    // ============================================

    #[test]
    fn text_joins_with_blank_line() {
        let chunks = assemble(vec![speech("A", 1), speech("B", 1)], 10);
        assert_eq!(chunks[0].text, "A.\nLine 1 of A.\n\nB.\nLine 1 of B.");
    }

    #[test]
    fn speech_texts_right_trimmed() {
        let lines: Vec<String> = vec!["A.".into(), "Some text.".into(), "".into(), "B.".into(), "More.".into()];
        let registry = CharacterRegistry::from_names(["A", "B"]);
        let speeches = segment(&lines, LineRange::new(0, 4), &registry);
        let chunks = assemble(speeches, 10);
        // The trailing blank inside A's speech does not produce a triple
        // newline in the joined text.
        assert_eq!(chunks[0].text, "A.\nSome text.\n\nB.\nMore.");
    }

    #[test]
    fn hash_is_deterministic() {
        let a = assemble(vec![speech("A", 2)], 0);
        let b = assemble(vec![speech("A", 2)], 0);
        assert_eq!(a[0].hash, b[0].hash);
        assert_eq!(a[0].hash.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_text() {
        let a = assemble(vec![speech("A", 2)], 0);
        let b = assemble(vec![speech("B", 2)], 0);
        assert_ne!(a[0].hash, b[0].hash);
    }

    #[test]
    fn hash_prefix_is_eight_chars() {
        let chunks = assemble(vec![speech("A", 1)], 0);
        assert_eq!(chunks[0].hash_prefix().len(), 8);
    }

    // ============================================
    // Speaker Summary Tests
    // ============================================

    #[test]
    fn summary_for_monologue() {
        let chunks = assemble(vec![speech("HAMLET", 3)], 0);
        assert_eq!(chunks[0].speaker_summary(), "HAMLET");
    }

    #[test]
    fn summary_for_merged_chunk() {
        let chunks = assemble(vec![speech("A", 1), speech("B", 1), speech("C", 1)], 100);
        assert_eq!(chunks[0].speaker_summary(), "A ... C (3 speeches)");
    }
}
