// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads a pretrained HuggingFace `tokenizer.json` from the model
// directory, or builds a word-level vocabulary from the training
// code when none exists and saves it there.
//
// Training text is split by the same `Whitespace` pre-tokenizer the
// saved tokenizer declares, so every vocab entry is a piece the
// encoder can actually produce. Case is kept: naming style is an
// authorship signal.
//
// Special tokens take the first five ids:
//   [PAD]=0 [UNK]=1 [CLS]=2 [SEP]=3 [MASK]=4

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::{OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer, Tokenizer};

const SPECIAL_TOKENS: [&str; 5] = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]"];

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Load existing tokenizer or build a new one from texts
    pub fn load_or_build(&self, texts: &[&str], vocab_size: usize) -> Result<Tokenizer> {
        if self.exists() {
            tracing::info!("Loading tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    /// Write `tokenizer` into this store's directory.
    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.path();
        tokenizer
            .save(&path, true)
            .map_err(|e| anyhow::anyhow!("Cannot save tokenizer to '{}': {}", path.display(), e))
    }

    fn build_and_save(&self, texts: &[&str], vocab_size: usize) -> Result<Tokenizer> {
        let tokenizer = build_in_memory(texts, vocab_size)?;
        self.save(&tokenizer)?;
        tracing::info!("Tokenizer saved to '{}'", self.path().display());
        Ok(tokenizer)
    }
}

/// Build a word-level tokenizer without touching the filesystem.
pub fn build_in_memory(texts: &[&str], vocab_size: usize) -> Result<Tokenizer> {
    let bytes = serde_json::to_vec(&word_level_json(texts, vocab_size)?)?;
    Tokenizer::from_bytes(bytes).map_err(|e| anyhow::anyhow!("Cannot build tokenizer: {e}"))
}

/// Rows needed in an embedding table indexed by this tokenizer's ids.
pub fn embedding_rows(tokenizer: &Tokenizer) -> usize {
    tokenizer
        .get_vocab(true)
        .values()
        .max()
        .map_or(0, |&id| id as usize + 1)
}

/// Pieces the `Whitespace` pre-tokenizer cuts `text` into.
fn pre_tokenize(text: &str) -> Result<Vec<String>> {
    let mut pretok = PreTokenizedString::from(text);
    Whitespace::default()
        .pre_tokenize(&mut pretok)
        .map_err(|e| anyhow::anyhow!("Cannot pre-tokenize text: {e}"))?;

    Ok(pretok
        .get_splits(OffsetReferential::Original, OffsetType::Byte)
        .into_iter()
        .map(|(piece, _, _)| piece.to_string())
        .collect())
}

/// HuggingFace tokenizer JSON with a frequency-ranked WordLevel vocab.
fn word_level_json(texts: &[&str], vocab_size: usize) -> Result<serde_json::Value> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for piece in pre_tokenize(text)? {
            *freq.entry(piece).or_insert(0) += 1;
        }
    }

    // Frequency descending, then lexicographic so the vocab is reproducible
    let mut words: Vec<(String, usize)> = freq
        .into_iter()
        .filter(|(w, _)| !SPECIAL_TOKENS.contains(&w.as_str()))
        .collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(vocab_size.saturating_sub(SPECIAL_TOKENS.len()));

    let mut vocab = serde_json::Map::new();
    let mut added = Vec::new();
    for (id, tok) in SPECIAL_TOKENS.iter().enumerate() {
        vocab.insert(tok.to_string(), serde_json::json!(id));
        added.push(serde_json::json!({
            "id": id, "content": tok, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        }));
    }
    for (word, _) in words {
        let id = vocab.len();
        vocab.insert(word, serde_json::json!(id));
    }

    Ok(serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added,
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "[UNK]"
        }
    }))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_tokenize_splits_words_and_punct() {
        assert_eq!(
            pre_tokenize("fn foo_bar(x: i32) -> i32 {").unwrap(),
            vec!["fn", "foo_bar", "(", "x", ":", "i32", ")", "->", "i32", "{"]
        );
        assert!(pre_tokenize("   \n\t").unwrap().is_empty());
    }

    #[test]
    fn test_combining_marks_stay_inside_identifiers() {
        let text = "let cafe\u{301} = 1 ;";
        let tok  = build_in_memory(&[text], 32).unwrap();
        let unk  = tok.token_to_id("[UNK]").unwrap();

        let enc = tok.encode(text, false).unwrap();
        assert_eq!(enc.get_ids().len(), 4);
        assert!(enc.get_ids().iter().all(|&id| id != unk));
        assert!(tok.token_to_id("cafe\u{301}").is_some());
    }

    #[test]
    fn test_vocab_is_ranked_and_capped() {
        let texts = ["a a a b b c", "a b"];
        let json  = word_level_json(&texts, 7).unwrap();
        let vocab = json["model"]["vocab"].as_object().unwrap();
        assert_eq!(vocab.len(), 7);
        assert_eq!(vocab["[PAD]"], 0);
        assert_eq!(vocab["a"], 5);
        assert_eq!(vocab["b"], 6);
        assert!(!vocab.contains_key("c"));
    }

    #[test]
    fn test_built_tokenizer_encodes_known_and_unknown() {
        let tok = build_in_memory(&["let x = 1 ;", "let y = 2 ;"], 100).unwrap();
        let enc = tok.encode("let zzz", false).unwrap();
        let ids = enc.get_ids();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], tok.token_to_id("let").unwrap());
        assert_eq!(ids[1], tok.token_to_id("[UNK]").unwrap());
        assert_eq!(embedding_rows(&tok), tok.get_vocab(true).len());
    }

    #[test]
    fn test_store_builds_then_loads() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        assert!(!store.exists());

        let built = store.load_or_build(&["int main ( ) { }"], 50).unwrap();
        assert!(store.exists());

        let loaded = store.load_or_build(&["ignored"], 50).unwrap();
        assert_eq!(built.get_vocab(true), loaded.get_vocab(true));
    }
}
