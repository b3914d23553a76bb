//! Huffman encoding over the frequency-sorted vocabulary.
//!
//! The generated codes and the parent-node paths are both consumed by the
//! hierarchical softmax portion of training.

use std::collections::HashMap;

use crate::error::{Result, Word2VecError};
use crate::progress::{CancelToken, ProgressListener, Stage};
use crate::vocab::Vocabulary;

/// Code assignment for one vocabulary token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanNode {
    /// Branch directions from the root, 0 or 1 per tree level.
    pub code: Vec<u8>,
    /// Indexes of the internal nodes along the path, in root-to-leaf order.
    /// One element longer than `code`; the final entry is unused by training.
    pub point: Vec<i32>,
    /// Row index of the token, equal to its vocabulary position.
    pub idx: usize,
    /// Frequency of the token.
    pub count: u64,
}

/// Builds the Huffman tree in linear time, relying on the vocabulary being
/// sorted by frequency descending.
pub struct HuffmanCoding<'a> {
    vocab: &'a Vocabulary,
    listener: &'a dyn ProgressListener,
    cancel: &'a CancelToken,
}

/// Progress is reported (and cancellation observed) every this many tokens.
const REPORT_INTERVAL: usize = 1_000;

impl<'a> HuffmanCoding<'a> {
    pub fn new(
        vocab: &'a Vocabulary,
        listener: &'a dyn ProgressListener,
        cancel: &'a CancelToken,
    ) -> HuffmanCoding<'a> {
        HuffmanCoding {
            vocab,
            listener,
            cancel,
        }
    }

    /// Assign a code to every vocabulary token.
    pub fn encode(&self) -> Result<HashMap<String, HuffmanNode>> {
        let num_tokens = self.vocab.len();
        if num_tokens == 0 {
            return Err(Word2VecError::EmptyVocabulary);
        }

        let mut count = vec![0u64; num_tokens * 2 + 1];
        let mut binary = vec![0u8; num_tokens * 2 + 1];
        let mut parent = vec![0usize; num_tokens * 2 + 1];
        for (i, entry) in self.vocab.entries().iter().enumerate() {
            count[i] = entry.count;
        }
        for c in count[num_tokens..].iter_mut() {
            *c = 1_000_000_000_000_000;
        }

        self.create_tree(num_tokens, &mut count, &mut binary, &mut parent)?;
        self.assign_codes(num_tokens, &binary, &parent)
    }

    /// Construct the tree by adding one internal node at a time. `pos1` walks
    /// down the leaves, `pos2` walks up the internal nodes created so far;
    /// both always point at the smallest unconsumed entry on their side.
    fn create_tree(
        &self,
        num_tokens: usize,
        count: &mut [u64],
        binary: &mut [u8],
        parent: &mut [usize],
    ) -> Result<()> {
        let mut pos1 = num_tokens as isize - 1;
        let mut pos2 = num_tokens;

        for a in 0..num_tokens.saturating_sub(1) {
            let min1i = if pos1 >= 0 && count[pos1 as usize] < count[pos2] {
                pos1 -= 1;
                (pos1 + 1) as usize
            } else {
                pos2 += 1;
                pos2 - 1
            };
            let min2i = if pos1 >= 0 && count[pos1 as usize] < count[pos2] {
                pos1 -= 1;
                (pos1 + 1) as usize
            } else {
                pos2 += 1;
                pos2 - 1
            };

            let new_node = num_tokens + a;
            count[new_node] = count[min1i] + count[min2i];
            parent[min1i] = new_node;
            parent[min2i] = new_node;
            binary[min2i] = 1;

            if a % REPORT_INTERVAL == 0 {
                if self.cancel.is_cancelled() {
                    return Err(Word2VecError::Cancelled("encoding huffman tree"));
                }
                self.listener
                    .update(Stage::CreateHuffmanEncoding, 0.5 * a as f64 / num_tokens as f64);
            }
        }
        Ok(())
    }

    /// Walk each leaf up to the root, then reverse the collected bits and
    /// node indexes so they read root-to-leaf.
    fn assign_codes(
        &self,
        num_tokens: usize,
        binary: &[u8],
        parent: &[usize],
    ) -> Result<HashMap<String, HuffmanNode>> {
        let root = num_tokens * 2 - 2;
        let mut result = HashMap::with_capacity(num_tokens);

        for (node_idx, entry) in self.vocab.entries().iter().enumerate() {
            let mut code: Vec<u8> = Vec::new();
            let mut points: Vec<usize> = Vec::new();
            let mut cur = node_idx;
            loop {
                code.push(binary[cur]);
                points.push(cur);
                cur = parent[cur];
                if cur == root {
                    break;
                }
            }

            let code_len = code.len();
            let mut raw_code = vec![0u8; code_len];
            let mut raw_points = vec![0i32; code_len + 1];
            raw_points[0] = num_tokens as i32 - 2;
            for i in 0..code_len {
                raw_code[code_len - i - 1] = code[i];
                raw_points[code_len - i] = points[i] as i32 - num_tokens as i32;
            }

            result.insert(
                entry.token.clone(),
                HuffmanNode {
                    code: raw_code,
                    point: raw_points,
                    idx: node_idx,
                    count: entry.count,
                },
            );

            if node_idx % REPORT_INTERVAL == 0 {
                if self.cancel.is_cancelled() {
                    return Err(Word2VecError::Cancelled("encoding huffman tree"));
                }
                self.listener.update(
                    Stage::CreateHuffmanEncoding,
                    0.5 + 0.5 * node_idx as f64 / num_tokens as f64,
                );
            }
        }
        Ok(result)
    }
}
