//! Local sentence embeddings: a BERT-style ONNX encoder run by `tract`,
//! mean-pooled over the attention mask and L2-normalised.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokenizers::{Tokenizer, TruncationParams};
use tract_onnx::prelude::tract_ndarray::{ArrayView3, Ix3};
use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

pub const ALL_MINILM_L6_V2: &str = "all-MiniLM-L6-v2";
pub const ALL_MINILM_L6_V2_DIMENSIONS: usize = 384;

/// Where model files are cached when no directory is given.
pub const DEFAULT_MODEL_DIR: &str = "models";

const ALL_MINILM_L6_V2_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main";
const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";
const PROVIDER: &str = "onnx";

/// Sequences are cut to this many tokens, special tokens included.
pub const MAX_TOKENS: usize = 256;

/// Texts per model run; activation memory grows with rows × seq_len².
pub const EMBED_BATCH_SIZE: usize = 32;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

fn embedding_error(message: impl std::fmt::Display) -> RagError {
    RagError::EmbeddingError { provider: PROVIDER.into(), message: message.to_string() }
}

/// Runs a sentence-transformer exported to ONNX on the CPU.
pub struct OnnxEmbeddingProvider {
    plan: Plan,
    tokenizer: Tokenizer,
    model_name: String,
    dimensions: usize,
}

impl std::fmt::Debug for OnnxEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingProvider")
            .field("model_name", &self.model_name)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingProvider {
    /// `all-MiniLM-L6-v2`, downloading `model.onnx` and `tokenizer.json`
    /// into `model_dir` (default `models/all-MiniLM-L6-v2`) on first use.
    pub async fn all_minilm_l6_v2(model_dir: Option<PathBuf>) -> Result<Self> {
        let dir =
            model_dir.unwrap_or_else(|| Path::new(DEFAULT_MODEL_DIR).join(ALL_MINILM_L6_V2));
        fetch_if_missing(&dir, MODEL_FILE, &format!("{ALL_MINILM_L6_V2_URL}/onnx/model.onnx"))
            .await?;
        fetch_if_missing(&dir, TOKENIZER_FILE, &format!("{ALL_MINILM_L6_V2_URL}/tokenizer.json"))
            .await?;

        let model = tokio::fs::read(dir.join(MODEL_FILE)).await.map_err(embedding_error)?;
        let tokenizer = tokio::fs::read(dir.join(TOKENIZER_FILE)).await.map_err(embedding_error)?;
        Self::from_bytes(&model, &tokenizer, ALL_MINILM_L6_V2, ALL_MINILM_L6_V2_DIMENSIONS)
    }

    /// Build from an ONNX graph and a Hugging Face `tokenizer.json`.
    pub fn from_bytes(
        model: &[u8],
        tokenizer_json: &[u8],
        model_name: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let plan = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| embedding_error(format!("failed to load ONNX model: {e}")))?;
        let mut tokenizer = Tokenizer::from_bytes(tokenizer_json)
            .map_err(|e| embedding_error(format!("failed to load tokenizer: {e}")))?;
        limit_length(&mut tokenizer)?;

        info!(model = %model_name, dimensions, "embedding model loaded");
        Ok(Self { plan, tokenizer, model_name, dimensions })
    }

    /// One model run over at most [`EMBED_BATCH_SIZE`] texts.
    fn run_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let encoded = texts.iter().map(|t| encode(&self.tokenizer, t)).collect::<Result<Vec<_>>>()?;
        let batch = PaddedBatch::new(&encoded);
        debug!(batch = batch.rows, seq_len = batch.seq_len, "running embedding model");

        let shape = [batch.rows, batch.seq_len];
        let tensor = |data: &[i64]| Tensor::from_shape(&shape, data).map_err(embedding_error);
        let outputs = self
            .plan
            .run(tvec![
                tensor(&batch.ids)?.into(),
                tensor(&batch.attention_mask)?.into(),
                tensor(&batch.type_ids)?.into(),
            ])
            .map_err(|e| embedding_error(format!("inference failed: {e}")))?;

        let hidden = outputs
            .first()
            .ok_or_else(|| embedding_error("model produced no outputs"))?
            .to_array_view::<f32>()
            .map_err(embedding_error)?
            .into_dimensionality::<Ix3>()
            .map_err(embedding_error)?;
        if hidden.shape()[2] != self.dimensions {
            return Err(embedding_error(format!(
                "model produced {}-dimensional vectors, expected {}",
                hidden.shape()[2],
                self.dimensions
            )));
        }

        Ok(mean_pool(hidden, &batch.attention_mask, batch.seq_len))
    }
}

/// Truncate inside the tokenizer so `[CLS]`/`[SEP]` survive; padding is done per batch.
fn limit_length(tokenizer: &mut Tokenizer) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: MAX_TOKENS, ..Default::default() }))
        .map_err(|e| embedding_error(format!("invalid truncation settings: {e}")))?;
    tokenizer.with_padding(None);
    Ok(())
}

fn encode(tokenizer: &Tokenizer, text: &str) -> Result<EncodedText> {
    let encoding = tokenizer.encode(text, true).map_err(embedding_error)?;
    let widen = |xs: &[u32]| xs.iter().map(|&x| i64::from(x)).collect::<Vec<_>>();
    Ok(EncodedText {
        ids: widen(encoding.get_ids()),
        attention_mask: widen(encoding.get_attention_mask()),
        type_ids: widen(encoding.get_type_ids()),
    })
}

/// Feed `texts` to `run` in slices of `size`, concatenating results in input order.
fn embed_in_batches(
    texts: &[&str],
    size: usize,
    mut run: impl FnMut(&[&str]) -> Result<Vec<Vec<f32>>>,
) -> Result<Vec<Vec<f32>>> {
    let mut vectors = Vec::with_capacity(texts.len());
    for slice in texts.chunks(size.max(1)) {
        let batch = run(slice)?;
        if batch.len() != slice.len() {
            return Err(embedding_error(format!(
                "model returned {} vectors for {} texts",
                batch.len(),
                slice.len()
            )));
        }
        vectors.extend(batch);
    }
    Ok(vectors)
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| embedding_error("model returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        embed_in_batches(texts, EMBED_BATCH_SIZE, |slice| self.run_batch(slice))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[derive(Debug, Clone)]
struct EncodedText {
    ids: Vec<i64>,
    attention_mask: Vec<i64>,
    type_ids: Vec<i64>,
}

/// Row-major `[rows, seq_len]` inputs, zero-padded on the right.
#[derive(Debug)]
struct PaddedBatch {
    rows: usize,
    seq_len: usize,
    ids: Vec<i64>,
    attention_mask: Vec<i64>,
    type_ids: Vec<i64>,
}

impl PaddedBatch {
    fn new(encoded: &[EncodedText]) -> Self {
        let seq_len = encoded.iter().map(|e| e.ids.len()).max().unwrap_or(0);
        let pad = |pick: fn(&EncodedText) -> &[i64]| {
            let mut out = Vec::with_capacity(encoded.len() * seq_len);
            for e in encoded {
                let row = pick(e);
                out.extend_from_slice(row);
                out.resize(out.len() + seq_len - row.len(), 0);
            }
            out
        };
        Self {
            rows: encoded.len(),
            seq_len,
            ids: pad(|e| e.ids.as_slice()),
            attention_mask: pad(|e| e.attention_mask.as_slice()),
            type_ids: pad(|e| e.type_ids.as_slice()),
        }
    }
}

/// Average the token vectors the mask keeps, then scale to unit length.
fn mean_pool(hidden: ArrayView3<'_, f32>, mask: &[i64], seq_len: usize) -> Vec<Vec<f32>> {
    hidden
        .outer_iter()
        .zip(mask.chunks(seq_len.max(1)))
        .map(|(tokens, row_mask)| {
            let mut sum = vec![0.0f32; tokens.shape()[1]];
            let mut kept = 0.0f32;
            for (token, &m) in tokens.outer_iter().zip(row_mask) {
                if m > 0 {
                    sum.iter_mut().zip(token.iter()).for_each(|(s, v)| *s += v);
                    kept += 1.0;
                }
            }
            if kept > 0.0 {
                sum.iter_mut().for_each(|s| *s /= kept);
            }
            normalize(&mut sum);
            sum
        })
        .collect()
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

async fn fetch_if_missing(dir: &Path, file: &str, url: &str) -> Result<()> {
    let target = dir.join(file);
    if tokio::fs::try_exists(&target).await.map_err(embedding_error)? {
        return Ok(());
    }
    tokio::fs::create_dir_all(dir).await.map_err(embedding_error)?;

    info!(%url, target = %target.display(), "downloading embedding model file");
    let bytes = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| embedding_error(format!("failed to download {url}: {e}")))?
        .bytes()
        .await
        .map_err(|e| embedding_error(format!("failed to download {url}: {e}")))?;

    // Write then rename so an interrupted download is never mistaken for a cached file.
    let partial = dir.join(format!("{file}.part"));
    tokio::fs::write(&partial, &bytes).await.map_err(embedding_error)?;
    tokio::fs::rename(&partial, &target).await.map_err(embedding_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tract_onnx::prelude::tract_ndarray::Array3;

    use super::*;

    fn encoded(len: usize) -> EncodedText {
        EncodedText {
            ids: (1..=len as i64).collect(),
            attention_mask: vec![1; len],
            type_ids: vec![0; len],
        }
    }

    #[test]
    fn batch_is_padded_to_longest_row() {
        let batch = PaddedBatch::new(&[encoded(3), encoded(1)]);
        assert_eq!((batch.rows, batch.seq_len), (2, 3));
        assert_eq!(batch.ids, vec![1, 2, 3, 1, 0, 0]);
        assert_eq!(batch.attention_mask, vec![1, 1, 1, 1, 0, 0]);
        assert_eq!(batch.type_ids, vec![0; 6]);
    }

    #[test]
    fn padding_does_not_move_the_mean() {
        // Row 0: two real tokens; row 1: one real token and a padded garbage vector.
        let hidden = Array3::from_shape_vec(
            (2, 2, 2),
            vec![3.0, 0.0, 1.0, 0.0, 0.0, 2.0, 100.0, 100.0],
        )
        .unwrap();
        let pooled = mean_pool(hidden.view(), &[1, 1, 1, 0], 2);
        assert_eq!(pooled, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn pooled_vectors_have_unit_length() {
        let hidden = Array3::from_shape_vec((1, 3, 3), (0..9).map(|x| x as f32).collect()).unwrap();
        let pooled = mean_pool(hidden.view(), &[1, 1, 1], 3);
        let norm = pooled[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_stays_zero() {
        let mut v = vec![0.0f32; 4];
        normalize(&mut v);
        assert_eq!(v, vec![0.0; 4]);
    }

    const WORD_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": { "type": "BertProcessing", "sep": ["[SEP]", 1], "cls": ["[CLS]", 0] },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": { "[CLS]": 0, "[SEP]": 1, "[UNK]": 2, "page": 3 },
            "unk_token": "[UNK]"
        }
    }"#;

    #[test]
    fn long_text_is_truncated_keeping_special_tokens() {
        let mut tokenizer = Tokenizer::from_bytes(WORD_TOKENIZER).unwrap();
        limit_length(&mut tokenizer).unwrap();

        let text = vec!["page"; MAX_TOKENS * 2].join(" ");
        let encoded = encode(&tokenizer, &text).unwrap();

        assert_eq!(encoded.ids.len(), MAX_TOKENS);
        assert_eq!(encoded.ids.first(), Some(&0));
        assert_eq!(encoded.ids.last(), Some(&1));
        assert_eq!(encoded.attention_mask, vec![1; MAX_TOKENS]);
    }

    #[test]
    fn short_text_is_left_unpadded() {
        let mut tokenizer = Tokenizer::from_bytes(WORD_TOKENIZER).unwrap();
        limit_length(&mut tokenizer).unwrap();

        let encoded = encode(&tokenizer, "page page").unwrap();

        assert_eq!(encoded.ids, vec![0, 3, 3, 1]);
    }

    #[test]
    fn large_inputs_are_split_and_keep_their_order() {
        let texts: Vec<String> = (0..EMBED_BATCH_SIZE * 2 + 5).map(|i| i.to_string()).collect();
        let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
        let mut sizes = Vec::new();

        let vectors = embed_in_batches(&texts, EMBED_BATCH_SIZE, |slice| {
            sizes.push(slice.len());
            Ok(slice.iter().map(|t| vec![t.parse::<f32>().unwrap()]).collect())
        })
        .unwrap();

        assert_eq!(sizes, vec![EMBED_BATCH_SIZE, EMBED_BATCH_SIZE, 5]);
        let order: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        let expected: Vec<f32> = (0..texts.len()).map(|i| i as f32).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn short_batch_from_the_model_is_an_error() {
        let err = embed_in_batches(&["a", "b"], EMBED_BATCH_SIZE, |_| Ok(vec![vec![0.0]]))
            .unwrap_err();
        assert!(matches!(err, RagError::EmbeddingError { .. }));
    }

    #[test]
    fn garbage_model_bytes_are_an_embedding_error() {
        let err = OnnxEmbeddingProvider::from_bytes(b"not onnx", b"{}", "x", 4).unwrap_err();
        assert!(matches!(err, RagError::EmbeddingError { .. }));
    }
}
