// ============================================================
// Layer 4 — Encoder
// ============================================================
// Turns one code snippet into a fixed-length model input:
//
//   [CLS] tok tok tok ... [SEP] [PAD] [PAD] ...
//   └──────── real ────────┘   └─ padding ─┘
//
//   attention_mask: 1 for real tokens, 0 for padding
//
// Long inputs are truncated so the final slot is still [SEP];
// short ones are right-padded. Both sequences are ALWAYS exactly
// `max_len` long.
//
// Works with BERT-style ([CLS]/[SEP]/[PAD]) and RoBERTa-style
// (<s>/</s>/<pad>) vocabularies.

use tokenizers::Tokenizer;

use crate::data::preprocessor::Preprocessor;
use crate::domain::error::EncodeError;

const CLS_TOKENS: [&str; 2] = ["[CLS]", "<s>"];
const SEP_TOKENS: [&str; 2] = ["[SEP]", "</s>"];
const PAD_TOKENS: [&str; 2] = ["[PAD]", "<pad>"];

/// Token ids and attention mask for one snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInput {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl EncodedInput {
    /// Number of non-padding tokens
    pub fn real_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

pub struct Encoder {
    tokenizer:    Tokenizer,
    preprocessor: Preprocessor,
    max_len:      usize,
    cls_id:       u32,
    sep_id:       u32,
    pad_id:       u32,
}

impl Encoder {
    pub fn new(mut tokenizer: Tokenizer, max_len: usize) -> Result<Self, EncodeError> {
        if max_len < 2 {
            return Err(EncodeError::MaxLenTooSmall(max_len));
        }

        // Truncation and padding are done here, not by the tokenizer
        tokenizer
            .with_truncation(None)
            .map_err(|e| EncodeError::Tokenizer(e.to_string()))?;
        tokenizer.with_padding(None);

        let cls_id = special_id(&tokenizer, &CLS_TOKENS)?;
        let sep_id = special_id(&tokenizer, &SEP_TOKENS)?;
        let pad_id = special_id(&tokenizer, &PAD_TOKENS)?;

        Ok(Self {
            tokenizer,
            preprocessor: Preprocessor::new(),
            max_len,
            cls_id,
            sep_id,
            pad_id,
        })
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn encode(&self, text: &str) -> Result<EncodedInput, EncodeError> {
        let cleaned  = self.preprocessor.clean(text);
        let encoding = self
            .tokenizer
            .encode(cleaned.as_str(), false)
            .map_err(|e| EncodeError::Tokenizer(e.to_string()))?;

        let body = self.max_len - 2;
        let mut input_ids = Vec::with_capacity(self.max_len);
        input_ids.push(self.cls_id);
        input_ids.extend(encoding.get_ids().iter().take(body));
        input_ids.push(self.sep_id);

        let real = input_ids.len();
        input_ids.resize(self.max_len, self.pad_id);

        let mut attention_mask = vec![1u32; real];
        attention_mask.resize(self.max_len, 0);

        Ok(EncodedInput { input_ids, attention_mask })
    }

    /// Encode, falling back to an empty `[CLS] [SEP]` input when the
    /// tokenizer rejects the text. Used where a sample cannot be dropped
    /// (dataset indexing) so batches keep their shape.
    pub fn encode_lossy(&self, text: &str) -> EncodedInput {
        match self.encode(text) {
            Ok(enc) => enc,
            Err(e) => {
                tracing::warn!("Encoding failed, using empty input: {}", e);
                self.blank()
            }
        }
    }

    fn blank(&self) -> EncodedInput {
        let mut input_ids = vec![self.cls_id, self.sep_id];
        input_ids.resize(self.max_len, self.pad_id);
        let mut attention_mask = vec![1u32; 2];
        attention_mask.resize(self.max_len, 0);
        EncodedInput { input_ids, attention_mask }
    }
}

fn special_id(tokenizer: &Tokenizer, candidates: &[&'static str]) -> Result<u32, EncodeError> {
    candidates
        .iter()
        .find_map(|t| tokenizer.token_to_id(t))
        .ok_or(EncodeError::MissingSpecialToken(candidates[0]))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::build_in_memory;

    fn encoder(max_len: usize) -> Encoder {
        let tok = build_in_memory(&["def f ( x ) : return x + 1"], 64).unwrap();
        Encoder::new(tok, max_len).unwrap()
    }

    #[test]
    fn test_output_length_is_always_max_len() {
        let enc = encoder(16);
        let long = "x + ".repeat(200);
        for text in ["", "x", "def f(x): return x + 1", long.as_str()] {
            let out = enc.encode(text).unwrap();
            assert_eq!(out.input_ids.len(), 16, "ids for {text:?}");
            assert_eq!(out.attention_mask.len(), 16, "mask for {text:?}");
        }
    }

    #[test]
    fn test_short_input_is_padded() {
        let enc = encoder(10);
        let out = enc.encode("return x").unwrap();
        let tok = enc.tokenizer();

        assert_eq!(out.real_len(), 4);
        assert_eq!(out.input_ids[0], tok.token_to_id("[CLS]").unwrap());
        assert_eq!(out.input_ids[3], tok.token_to_id("[SEP]").unwrap());
        assert!(out.input_ids[4..].iter().all(|&id| id == tok.token_to_id("[PAD]").unwrap()));
        assert_eq!(&out.attention_mask[..5], &[1, 1, 1, 1, 0]);
    }

    #[test]
    fn test_long_input_truncated_with_sep_last() {
        let enc = encoder(8);
        let out = enc.encode(&"x ".repeat(50)).unwrap();
        assert_eq!(out.real_len(), 8);
        assert_eq!(out.input_ids[7], enc.tokenizer().token_to_id("[SEP]").unwrap());
    }

    #[test]
    fn test_empty_text_has_boundary_tokens_only() {
        let enc = encoder(6);
        let out = enc.encode("").unwrap();
        assert_eq!(out.real_len(), 2);
        assert_eq!(out, enc.blank());
    }

    #[test]
    fn test_max_len_too_small() {
        let tok = build_in_memory(&["a"], 10).unwrap();
        assert!(matches!(Encoder::new(tok, 1), Err(EncodeError::MaxLenTooSmall(1))));
    }

    #[test]
    fn test_missing_special_tokens() {
        let json = serde_json::json!({
            "version": "1.0", "truncation": null, "padding": null, "added_tokens": [],
            "normalizer": null, "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null, "decoder": null,
            "model": { "type": "WordLevel", "vocab": { "a": 0, "[UNK]": 1 }, "unk_token": "[UNK]" }
        });
        let tok = Tokenizer::from_bytes(serde_json::to_vec(&json).unwrap()).unwrap();
        assert!(matches!(
            Encoder::new(tok, 8),
            Err(EncodeError::MissingSpecialToken("[CLS]"))
        ));
    }
}
