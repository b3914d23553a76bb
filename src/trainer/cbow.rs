//! Continuous bag-of-words update: the averaged context predicts the target.

use super::{Worker, EXP_SCALE, MAX_EXP};
use crate::huffman::HuffmanNode;

impl Worker<'_> {
    pub(super) fn train_sentence_cbow(&mut self, sentence: &[&HuffmanNode]) {
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

            // in -> hidden
            let mut cw = 0u64;
            for a in b..(window * 2 + 1 - b) {
                if a == window {
                    continue;
                }
                let c = sentence_position as i64 - window as i64 + a as i64;
                if c < 0 || c >= sentence_length as i64 {
                    continue;
                }
                let row = t.syn0.row(sentence[c as usize].idx);
                for d in 0..layer1_size {
                    self.neu1[d] += row[d].get();
                }
                cw += 1;
            }
            if cw == 0 {
                continue;
            }
            for c in 0..layer1_size {
                self.neu1[c] /= cw as f64;
            }

            if t.config.use_hierarchical_softmax {
                for d in 0..node.code.len() {
                    let l2 = node.point[d] as usize;
                    let row = t.syn1.row(l2);
                    // Propagate hidden -> output
                    let mut f = 0.0;
                    for c in 0..layer1_size {
                        f += self.neu1[c] * row[c].get();
                    }
                    if f <= -MAX_EXP || f >= MAX_EXP {
                        continue;
                    }
                    let f = t.exp_table[((f + MAX_EXP) * EXP_SCALE) as usize];
                    // 'g' is the gradient multiplied by the learning rate
                    let g = (1.0 - node.code[d] as f64 - f) * alpha;
                    // Propagate errors output -> hidden
                    for c in 0..layer1_size {
                        self.neu1e[c] += g * row[c].get();
                    }
                    // Learn weights hidden -> output
                    for c in 0..layer1_size {
                        row[c].add(g * self.neu1[c]);
                    }
                }
            }

            self.handle_negative_sampling(node, alpha);

            // hidden -> in
            for a in b..(window * 2 + 1 - b) {
                if a == window {
                    continue;
                }
                let c = sentence_position as i64 - window as i64 + a as i64;
                if c < 0 || c >= sentence_length as i64 {
                    continue;
                }
                let row = t.syn0.row(sentence[c as usize].idx);
                for d in 0..layer1_size {
                    row[d].add(self.neu1e[d]);
                }
            }
        }
    }
}
