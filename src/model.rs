use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::builder::TrainerBuilder;
use crate::error::{Result, Word2VecError};
use crate::search::Searcher;
use crate::{dot, normalize};

/// A trained set of word vectors: the vocabulary in frequency order, the
/// vector dimensionality, and one row of `layer_size` doubles per token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    vocab: Vec<String>,
    layer_size: usize,
    vectors: Vec<f64>,
}

impl Model {
    pub(crate) fn new(vocab: Vec<String>, layer_size: usize, vectors: Vec<f64>) -> Model {
        debug_assert_eq!(vectors.len(), vocab.len() * layer_size);
        Model {
            vocab,
            layer_size,
            vectors,
        }
    }

    /// Build a model from externally supplied parts, checking shape.
    pub fn from_parts(vocab: Vec<String>, layer_size: usize, vectors: Vec<f64>) -> Result<Model> {
        let model = Model {
            vocab,
            layer_size,
            vectors,
        };
        model.validate()?;
        Ok(model)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.vectors.len() != self.vocab.len() * self.layer_size {
            return Err(Word2VecError::MalformedModel(format!(
                "vector array length {} does not match {} tokens of {} dimensions",
                self.vectors.len(),
                self.vocab.len(),
                self.layer_size
            )));
        }
        Ok(())
    }

    /// Builder for training a new model.
    pub fn trainer() -> TrainerBuilder {
        TrainerBuilder::new()
    }

    pub fn vocab(&self) -> &[String] {
        &self.vocab
    }

    pub fn layer_size(&self) -> usize {
        self.layer_size
    }

    /// The flat row-major vector array, `vocab.len() * layer_size` long.
    pub fn vectors(&self) -> &[f64] {
        &self.vectors
    }

    /// The vector for the token at vocabulary position `index`.
    pub fn vector(&self, index: usize) -> &[f64] {
        &self.vectors[index * self.layer_size..][..self.layer_size]
    }

    /// A searcher over a unit-normalized copy of this model.
    pub fn for_search(&self) -> Searcher {
        Searcher::new(self)
    }

    /// JSON externalization with `vocab`, `layerSize`, and `vectors` fields.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Word2VecError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Model> {
        let model: Model = serde_json::from_str(json)
            .map_err(|e| Word2VecError::MalformedModel(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    /// Save in the crate's native serialized form.
    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)
            .map_err(|e| Word2VecError::Serialization(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Model> {
        let reader = BufReader::new(File::open(path)?);
        let model: Model = bincode::deserialize_from(reader)
            .map_err(|e| Word2VecError::MalformedModel(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }
}

/// A model whose rows have been scaled to unit length, ready for cosine
/// arithmetic.
#[derive(Debug, Clone)]
pub struct NormalizedModel {
    vocab: Vec<String>,
    layer_size: usize,
    vectors: Vec<f64>,
}

impl NormalizedModel {
    pub fn from_model(model: &Model) -> NormalizedModel {
        let mut vectors = model.vectors.clone();
        for row in vectors.chunks_mut(model.layer_size) {
            normalize(row);
        }
        NormalizedModel {
            vocab: model.vocab.clone(),
            layer_size: model.layer_size,
            vectors,
        }
    }

    pub fn from_bin_file(path: &Path) -> Result<NormalizedModel> {
        Ok(NormalizedModel::from_model(&Model::from_bin_file(path)?))
    }

    pub fn vocab(&self) -> &[String] {
        &self.vocab
    }

    pub fn layer_size(&self) -> usize {
        self.layer_size
    }

    pub fn vector(&self, index: usize) -> &[f64] {
        &self.vectors[index * self.layer_size..][..self.layer_size]
    }

    /// Cosine of the angle between two rows.
    pub fn cosine(&self, a: usize, b: usize) -> f64 {
        dot(self.vector(a), self.vector(b))
    }
}
