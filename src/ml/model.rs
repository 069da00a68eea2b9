use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        gru::{Gru, GruConfig},
        Initializer,
        Linear, LinearConfig,
        Lstm, LstmConfig, LstmState,
    },
    prelude::*,
    tensor::activation::log_softmax,
};
use serde::{Deserialize, Serialize};

use crate::domain::tokens::TokenId;
use crate::domain::traits::SequenceEncoder;

/// Recurrent cell used by both encoder and decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RnnType {
    Lstm,
    Gru,
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    pub src_vocab_size: usize,
    pub trg_vocab_size: usize,
    pub emb_dim:        usize,
    pub hidden_dim:     usize,
    pub num_layers:     usize,
    pub rnn_type:       RnnType,
    #[config(default = 0.5)]
    pub dropout:        f64,
}

impl Seq2SeqConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Seq2SeqModel<B> {
        let encoder = Encoder {
            embedding: EmbeddingConfig::new(self.src_vocab_size, self.emb_dim).init(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
            rnn:       self.build_stack(device),
        };
        let decoder = Decoder {
            embedding:  EmbeddingConfig::new(self.trg_vocab_size, self.emb_dim).init(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
            rnn:        self.build_stack(device),
            output:     LinearConfig::new(self.hidden_dim, self.trg_vocab_size).init(device),
            vocab_size: self.trg_vocab_size,
        };
        Seq2SeqModel { encoder, decoder }
    }

    fn build_stack<B: Backend>(&self, device: &B::Device) -> RecurrentStack<B> {
        // Every recurrent weight starts in U(-0.08, 0.08)
        let init = Initializer::Uniform { min: -0.08, max: 0.08 };
        let d_input = |layer: usize| if layer == 0 { self.emb_dim } else { self.hidden_dim };

        match self.rnn_type {
            RnnType::Lstm => RecurrentStack {
                lstm: (0..self.num_layers)
                    .map(|l| {
                        LstmConfig::new(d_input(l), self.hidden_dim, true)
                            .with_initializer(init.clone())
                            .init(device)
                    })
                    .collect(),
                gru: Vec::new(),
            },
            RnnType::Gru => RecurrentStack {
                lstm: Vec::new(),
                gru: (0..self.num_layers)
                    .map(|l| {
                        GruConfig::new(d_input(l), self.hidden_dim, true)
                            .with_initializer(init.clone())
                            .init(device)
                    })
                    .collect(),
            },
        }
    }
}

// ─── Recurrent state ──────────────────────────────────────────────────────────
/// Final state of one layer: hidden `[batch, hidden]`, plus the cell for LSTMs.
#[derive(Debug, Clone)]
pub struct LayerState<B: Backend> {
    pub hidden: Tensor<B, 2>,
    pub cell:   Option<Tensor<B, 2>>,
}

/// State of a whole stack, for a batch of sequences.
///
/// Beam search keeps one of these per hypothesis (`batch_size() == 1`) and
/// stacks them back together for a batched decoder step.
#[derive(Debug, Clone)]
pub struct RecurrentState<B: Backend> {
    layers: Vec<LayerState<B>>,
}

impl<B: Backend> RecurrentState<B> {
    pub fn layers(&self) -> &[LayerState<B>] {
        &self.layers
    }

    pub fn batch_size(&self) -> usize {
        self.layers.first().map(|l| l.hidden.dims()[0]).unwrap_or(0)
    }

    /// One state per batch row, in row order
    pub fn split(self) -> Vec<Self> {
        let rows = |t: &Tensor<B, 2>, i: usize| {
            let [_, h] = t.dims();
            t.clone().slice([i..i + 1, 0..h])
        };
        (0..self.batch_size())
            .map(|i| RecurrentState {
                layers: self
                    .layers
                    .iter()
                    .map(|l| LayerState {
                        hidden: rows(&l.hidden, i),
                        cell:   l.cell.as_ref().map(|c| rows(c, i)),
                    })
                    .collect(),
            })
            .collect()
    }

    /// Concatenate states along the batch dimension.
    pub fn stack(states: &[&Self]) -> anyhow::Result<Self> {
        let first = states
            .first()
            .ok_or_else(|| anyhow::anyhow!("cannot stack an empty list of states"))?;
        if states.iter().any(|s| s.layers.len() != first.layers.len()) {
            anyhow::bail!("cannot stack states with different layer counts");
        }

        let layers = (0..first.layers.len())
            .map(|k| {
                let hidden = Tensor::cat(
                    states.iter().map(|s| s.layers[k].hidden.clone()).collect(),
                    0,
                );
                let cell = states
                    .iter()
                    .map(|s| s.layers[k].cell.clone())
                    .collect::<Option<Vec<_>>>()
                    .map(|cells| Tensor::cat(cells, 0));
                LayerState { hidden, cell }
            })
            .collect();
        Ok(RecurrentState { layers })
    }
}

// ─── RecurrentStack ───────────────────────────────────────────────────────────
/// `num_layers` stacked LSTM or GRU layers. Exactly one of the two
/// vectors is populated.
#[derive(Module, Debug)]
pub struct RecurrentStack<B: Backend> {
    pub lstm: Vec<Lstm<B>>,
    pub gru:  Vec<Gru<B>>,
}

impl<B: Backend> RecurrentStack<B> {
    pub fn num_layers(&self) -> usize {
        self.lstm.len() + self.gru.len()
    }

    /// input: [batch, seq, d_input] → ([batch, seq, hidden], final state)
    pub fn forward(
        &self,
        input: Tensor<B, 3>,
        state: Option<RecurrentState<B>>,
    ) -> (Tensor<B, 3>, RecurrentState<B>) {
        let initial: Vec<Option<LayerState<B>>> = match state {
            Some(s) => s.layers.into_iter().map(Some).collect(),
            None => vec![None; self.num_layers()],
        };

        let mut x = input;
        let mut layers = Vec::with_capacity(self.num_layers());

        for (lstm, init) in self.lstm.iter().zip(initial.iter().cloned()) {
            let init = init.map(|LayerState { hidden, cell }| {
                let cell = cell.unwrap_or_else(|| hidden.zeros_like());
                LstmState::new(cell, hidden)
            });
            let (out, last) = lstm.forward(x, init);
            layers.push(LayerState { hidden: last.hidden, cell: Some(last.cell) });
            x = out;
        }

        for (gru, init) in self.gru.iter().zip(initial) {
            let (out, last) = gru_over_time(gru, x, init.map(|l| l.hidden));
            layers.push(LayerState { hidden: last, cell: None });
            x = out;
        }

        (x, RecurrentState { layers })
    }
}

/// Runs one GRU layer a timestep at a time, carrying the hidden state.
///
/// burn's `Gru::forward` takes the state for step t from slice t of the
/// state argument rather than from step t-1, so a whole sequence cannot
/// be passed in one call.
///
/// input: [batch, seq, d_input] → ([batch, seq, hidden], [batch, hidden])
fn gru_over_time<B: Backend>(
    gru:   &Gru<B>,
    input: Tensor<B, 3>,
    init:  Option<Tensor<B, 2>>,
) -> (Tensor<B, 3>, Tensor<B, 2>) {
    let [batch, seq, d_input] = input.dims();
    let mut state = init;
    let mut outputs = Vec::with_capacity(seq);

    for t in 0..seq {
        let x_t = input.clone().slice([0..batch, t..t + 1, 0..d_input]);
        let carried = state.map(|h| {
            let [b, hidden] = h.dims();
            h.reshape([b, 1, hidden])
        });
        let out = gru.forward(x_t, carried);
        let [_, _, hidden] = out.dims();
        state = Some(out.clone().reshape([batch, hidden]));
        outputs.push(out);
    }

    let out = Tensor::cat(outputs, 1);
    let [_, _, hidden] = out.dims();
    let last = state.unwrap_or_else(|| Tensor::zeros([batch, hidden], &out.device()));
    (out, last)
}

// ─── Encoder / Decoder ────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub embedding: Embedding<B>,
    pub dropout:   Dropout,
    pub rnn:       RecurrentStack<B>,
}

impl<B: Backend> Encoder<B> {
    /// src: [batch, src_len] → context state for the decoder
    pub fn forward(&self, src: Tensor<B, 2, Int>) -> RecurrentState<B> {
        let x = self.dropout.forward(self.embedding.forward(src));
        self.rnn.forward(x, None).1
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub embedding:  Embedding<B>,
    pub dropout:    Dropout,
    pub rnn:        RecurrentStack<B>,
    pub output:     Linear<B>,
    pub vocab_size: usize,
}

impl<B: Backend> Decoder<B> {
    /// tokens: [batch, len] → logits [batch, len, vocab]
    pub fn forward(
        &self,
        tokens: Tensor<B, 2, Int>,
        state:  RecurrentState<B>,
    ) -> (Tensor<B, 3>, RecurrentState<B>) {
        let x = self.dropout.forward(self.embedding.forward(tokens));
        let (out, state) = self.rnn.forward(x, Some(state));
        (self.output.forward(out), state)
    }

    /// One token per row: tokens [n] → log-probabilities [n, vocab]
    pub fn step(
        &self,
        tokens: Tensor<B, 1, Int>,
        state:  RecurrentState<B>,
    ) -> (Tensor<B, 2>, RecurrentState<B>) {
        let [n] = tokens.dims();
        let (logits, state) = self.forward(tokens.reshape([n, 1]), state);
        let logits = logits.reshape([n, self.vocab_size]);
        (log_softmax(logits, 1), state)
    }
}

// ─── Seq2SeqModel ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Seq2SeqModel<B: Backend> {
    pub encoder: Encoder<B>,
    pub decoder: Decoder<B>,
}

impl<B: Backend> Seq2SeqModel<B> {
    /// Teacher forcing: the gold previous token is fed at every position.
    ///
    /// Without attention or feedback from predictions, running the stack
    /// once over `trg[:, ..len-1]` is the same computation as feeding the
    /// tokens one at a time.
    ///
    /// src: [batch, src_len], trg: [batch, trg_len] → [batch, trg_len-1, vocab]
    pub fn forward_teacher_forcing(
        &self,
        src: Tensor<B, 2, Int>,
        trg: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let [batch, trg_len] = trg.dims();
        let context = self.encoder.forward(src);
        let inputs = trg.slice([0..batch, 0..trg_len - 1]);
        self.decoder.forward(inputs, context).0
    }

    /// Mean cross entropy over every non-`pad` target position.
    pub fn forward_loss(
        &self,
        src: Tensor<B, 2, Int>,
        trg: Tensor<B, 2, Int>,
        pad: TokenId,
    ) -> Tensor<B, 1> {
        let [batch, trg_len] = trg.dims();
        let steps = trg_len - 1;

        let logits = self
            .forward_teacher_forcing(src, trg.clone())
            .reshape([batch * steps, self.decoder.vocab_size]);
        let targets = trg.slice([0..batch, 1..trg_len]).reshape([batch * steps]);

        CrossEntropyLossConfig::new()
            .with_pad_tokens(Some(vec![pad as usize]))
            .init(&logits.device())
            .forward(logits, targets)
    }
}

impl<B: Backend> SequenceEncoder for Seq2SeqModel<B> {
    type Input = Tensor<B, 2, Int>;
    type State = RecurrentState<B>;

    fn encode(&self, input: Self::Input) -> anyhow::Result<Vec<Self::State>> {
        Ok(self.encoder.forward(input).split())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn config(rnn_type: RnnType) -> Seq2SeqConfig {
        Seq2SeqConfig::new(11, 13, 8, 6, 2, rnn_type)
    }

    fn ids(rows: &[&[i32]]) -> Tensor<TestBackend, 2, Int> {
        let len = rows[0].len();
        let flat: Vec<i32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::<TestBackend, 1, Int>::from_ints(flat.as_slice(), &Default::default())
            .reshape([rows.len(), len])
    }

    #[test]
    fn test_teacher_forcing_shape() {
        for rnn in [RnnType::Lstm, RnnType::Gru] {
            let model = config(rnn).init::<TestBackend>(&Default::default());
            let src = ids(&[&[2, 4, 5, 3], &[2, 6, 3, 1]]);
            let trg = ids(&[&[2, 7, 8, 9, 3], &[2, 7, 3, 1, 1]]);
            let logits = model.forward_teacher_forcing(src, trg);
            assert_eq!(logits.dims(), [2, 4, 13]);
        }
    }

    #[test]
    fn test_loss_is_finite() {
        let model = config(RnnType::Lstm).init::<TestBackend>(&Default::default());
        let src = ids(&[&[2, 4, 3], &[2, 5, 3]]);
        let trg = ids(&[&[2, 7, 3], &[2, 3, 1]]);
        let loss: f32 = model.forward_loss(src, trg, 1).into_scalar().elem();
        assert!(loss.is_finite());
        assert!(loss > 0.0);
    }

    #[test]
    fn test_encode_gives_one_state_per_element() {
        let model = config(RnnType::Lstm).init::<TestBackend>(&Default::default());
        let states = model.encode(ids(&[&[2, 4, 3], &[2, 5, 3], &[2, 6, 3]])).unwrap();
        assert_eq!(states.len(), 3);
        for s in &states {
            assert_eq!(s.batch_size(), 1);
            assert_eq!(s.layers().len(), 2);
            assert_eq!(s.layers()[0].hidden.dims(), [1, 6]);
            assert!(s.layers()[0].cell.is_some());
        }
    }

    #[test]
    fn test_gru_state_has_no_cell() {
        let model = config(RnnType::Gru).init::<TestBackend>(&Default::default());
        let states = model.encode(ids(&[&[2, 4, 3]])).unwrap();
        assert!(states[0].layers().iter().all(|l| l.cell.is_none()));
    }

    #[test]
    fn test_split_then_stack_round_trips() {
        let model = config(RnnType::Lstm).init::<TestBackend>(&Default::default());
        let whole = model.encoder.forward(ids(&[&[2, 4, 3], &[2, 5, 3]]));
        let parts = whole.clone().split();
        let refs: Vec<&RecurrentState<TestBackend>> = parts.iter().collect();
        let back = RecurrentState::stack(&refs).unwrap();
        for (a, b) in whole.layers().iter().zip(back.layers()) {
            let a: Vec<f32> = a.hidden.clone().into_data().to_vec().unwrap();
            let b: Vec<f32> = b.hidden.clone().into_data().to_vec().unwrap();
            assert_eq!(a, b);
        }
    }

    fn hidden_gap(model: &Seq2SeqModel<TestBackend>, a: &[i32], b: &[i32]) -> f32 {
        let states = model.encode(ids(&[a, b])).unwrap();
        let top = |s: &RecurrentState<TestBackend>| -> Vec<f32> {
            s.layers()[0].hidden.clone().into_data().to_vec().unwrap()
        };
        top(&states[0])
            .iter()
            .zip(top(&states[1]))
            .map(|(x, y)| (x - y).abs())
            .sum()
    }

    #[test]
    fn test_context_depends_on_whole_source() {
        // Same last token, different prefix
        for rnn in [RnnType::Lstm, RnnType::Gru] {
            let model = Seq2SeqConfig::new(11, 13, 8, 6, 1, rnn).init::<TestBackend>(&Default::default());
            let gap = hidden_gap(&model, &[4, 5, 6, 3], &[9, 8, 7, 3]);
            assert!(gap > 1e-6, "{rnn:?} context ignores the prefix");
        }
    }

    #[test]
    fn test_teacher_forcing_matches_stepwise_decoding() {
        for rnn in [RnnType::Lstm, RnnType::Gru] {
            let model = config(rnn).init::<TestBackend>(&Default::default());
            let src = ids(&[&[2, 4, 5, 3]]);
            let trg = ids(&[&[2, 7, 8, 9, 3]]);

            let whole: Vec<f32> = model
                .forward_teacher_forcing(src.clone(), trg)
                .into_data()
                .to_vec()
                .unwrap();

            let mut state = model.encoder.forward(src);
            let mut stepped = Vec::new();
            for token in [2, 7, 8, 9] {
                let (logits, next) = model.decoder.forward(ids(&[&[token]]), state);
                let row: Vec<f32> = logits.into_data().to_vec().unwrap();
                stepped.extend(row);
                state = next;
            }

            assert_eq!(whole.len(), stepped.len());
            for (a, b) in whole.iter().zip(&stepped) {
                assert!((a - b).abs() < 1e-4, "{rnn:?}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn test_stack_rejects_empty_input() {
        assert!(RecurrentState::<TestBackend>::stack(&[]).is_err());
    }
}
