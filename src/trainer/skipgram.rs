//! Skip-gram update: the target predicts each context word in turn.

use super::{Worker, EXP_SCALE, MAX_EXP};
use crate::huffman::HuffmanNode;

impl Worker<'_> {
    pub(super) fn train_sentence_skipgram(&mut self, sentence: &[&HuffmanNode]) {
        let t = self.t;
        let layer1_size = t.layer1_size;
        let window = t.window;
        let sentence_length = sentence.len();

        for sentence_position in 0..sentence_length {
            let node = sentence[sentence_position];
            self.neu1.fill(0.0);
            self.neu1e.fill(0.0);
            let b = self.window_offset();
            let alpha = t.alpha.get();

            for a in b..(window * 2 + 1 - b) {
                if a == window {
                    continue;
                }
                let c = sentence_position as i64 - window as i64 + a as i64;
                if c < 0 || c >= sentence_length as i64 {
                    continue;
                }
                self.neu1e.fill(0.0);
                let l1 = sentence[c as usize].idx;

                if t.config.use_hierarchical_softmax {
                    for d in 0..node.code.len() {
                        let l2 = node.point[d] as usize;
                        let in_row = t.syn0.row(l1);
                        let out_row = t.syn1.row(l2);
                        // Propagate hidden -> output
                        let mut f = 0.0;
                        for e in 0..layer1_size {
                            f += in_row[e].get() * out_row[e].get();
                        }
                        if f <= -MAX_EXP || f >= MAX_EXP {
                            continue;
                        }
                        let f = t.exp_table[((f + MAX_EXP) * EXP_SCALE) as usize];
                        let g = (1.0 - node.code[d] as f64 - f) * alpha;
                        // Propagate errors output -> hidden
                        for e in 0..layer1_size {
                            self.neu1e[e] += g * out_row[e].get();
                        }
                        // Learn weights hidden -> output
                        for e in 0..layer1_size {
                            out_row[e].add(g * in_row[e].get());
                        }
                    }
                }

                // The hidden vector stays zeroed here. word2vec.c and its
                // ports feed it to the sampling step anyway; swapping in the
                // context row would change every trained vector, so the
                // behavior is kept.
                self.handle_negative_sampling(node, alpha);

                // Learn weights input -> hidden
                let in_row = t.syn0.row(l1);
                for d in 0..layer1_size {
                    in_row[d].add(self.neu1e[d]);
                }
            }
        }
    }
}
