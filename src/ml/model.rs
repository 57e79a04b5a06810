// ============================================================
// Layer 5 — Author Classifier
// ============================================================
// Post-norm transformer encoder over code tokens, mean-pooled
// over real (unmasked) positions, then a linear head with one
// logit per author.
//
//   ids [b, s] ─► token + position embedding ─► N × EncoderLayer
//             ─► LayerNorm ─► masked mean ─► Linear ─► logits [b, authors]

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, LayerNorm, LayerNormConfig, Linear,
        LinearConfig,
    },
    prelude::*,
    tensor::activation::gelu,
};

/// Shape of the encoder. Saved as encoder_config.json so the
/// weights can seed a later run.
#[derive(Config, Debug)]
pub struct TextEncoderConfig {
    /// Embedding rows; must cover every tokenizer id
    pub vocab_size:  usize,
    /// Number of learned positions
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl TextEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TextEncoder<B> {
        TextEncoder {
            tokens:    EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            positions: EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device),
            layers:    (0..self.num_layers).map(|_| self.layer(device)).collect(),
            norm:      LayerNormConfig::new(self.d_model).init(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
        }
    }

    fn layer<B: Backend>(&self, device: &B::Device) -> EncoderLayer<B> {
        EncoderLayer {
            attention: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .with_dropout(self.dropout)
                .init(device),
            feed_forward: FeedForward {
                expand:  LinearConfig::new(self.d_model, self.d_ff).init(device),
                project: LinearConfig::new(self.d_ff, self.d_model).init(device),
            },
            attn_norm: LayerNormConfig::new(self.d_model).init(device),
            ff_norm:   LayerNormConfig::new(self.d_model).init(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    expand:  Linear<B>,
    project: Linear<B>,
}

impl<B: Backend> FeedForward<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.project.forward(gelu(self.expand.forward(x)))
    }
}

#[derive(Module, Debug)]
pub struct EncoderLayer<B: Backend> {
    attention:    MultiHeadAttention<B>,
    feed_forward: FeedForward<B>,
    attn_norm:    LayerNorm<B>,
    ff_norm:      LayerNorm<B>,
    dropout:      Dropout,
}

impl<B: Backend> EncoderLayer<B> {
    /// `padding` is true where attention must not look.
    pub fn forward(&self, x: Tensor<B, 3>, padding: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attended = self
            .attention
            .forward(MhaInput::self_attn(x.clone()).mask_pad(padding))
            .context;
        let x = self.attn_norm.forward(x + self.dropout.forward(attended));

        let transformed = self.feed_forward.forward(x.clone());
        self.ff_norm.forward(x + self.dropout.forward(transformed))
    }
}

/// Transformer encoder shared by every classification head.
/// Saved on its own so a later run can start from it.
#[derive(Module, Debug)]
pub struct TextEncoder<B: Backend> {
    tokens:    Embedding<B>,
    positions: Embedding<B>,
    layers:    Vec<EncoderLayer<B>>,
    norm:      LayerNorm<B>,
    dropout:   Dropout,
}

impl<B: Backend> TextEncoder<B> {
    /// ids, mask: [batch, seq] → hidden states [batch, seq, d_model]
    pub fn forward(&self, ids: Tensor<B, 2, Int>, mask: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch, seq] = ids.dims();
        let device = ids.device();

        let slots = Tensor::<B, 1, Int>::arange(0..seq as i64, &device)
            .unsqueeze::<2>()
            .expand([batch, seq]);
        let embedded = self.tokens.forward(ids) + self.positions.forward(slots);

        let padding = mask.equal_elem(0);
        let hidden  = self
            .layers
            .iter()
            .fold(self.dropout.forward(embedded), |x, layer| layer.forward(x, padding.clone()));

        self.norm.forward(hidden)
    }
}

#[derive(Config, Debug)]
pub struct AuthorClassifierConfig {
    pub encoder:     TextEncoderConfig,
    pub num_classes: usize,
}

impl AuthorClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AuthorClassifier<B> {
        AuthorClassifier {
            encoder: self.encoder.init(device),
            head:    LinearConfig::new(self.encoder.d_model, self.num_classes).init(device),
            dropout: DropoutConfig::new(self.encoder.dropout).init(),
        }
    }
}

/// Encoder → masked mean pool → linear head over authors.
#[derive(Module, Debug)]
pub struct AuthorClassifier<B: Backend> {
    pub encoder: TextEncoder<B>,
    pub head:    Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> AuthorClassifier<B> {
    /// → logits [batch, num_classes]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let hidden = self.encoder.forward(input_ids, attention_mask.clone());
        let pooled = mean_pool(hidden, attention_mask);
        self.head.forward(self.dropout.forward(pooled))
    }

    /// Cross-entropy loss and logits for a labelled batch.
    pub fn forward_loss(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        labels:         Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(input_ids, attention_mask);
        let loss   = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels);
        (loss, logits)
    }
}

/// Average hidden states over real (unmasked) positions.
/// [batch, seq_len, d_model] → [batch, d_model]
fn mean_pool<B: Backend>(hidden: Tensor<B, 3>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
    let [batch_size, _, d_model] = hidden.dims();
    let mask   = attention_mask.float().unsqueeze_dim::<3>(2); // [batch, seq, 1]
    let summed = (hidden * mask.clone()).sum_dim(1);           // [batch, 1, d_model]
    let counts = mask.sum_dim(1).clamp_min(1.0);               // [batch, 1, 1]
    (summed / counts).reshape([batch_size, d_model])
}
