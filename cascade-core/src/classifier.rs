//! # Classificadores da Cascata
//!
//! O decodificador conversa com dois colaboradores de pontuação:
//!
//! - [`TokenClassifier`] (estágio 1): vê apenas as features do próprio token.
//! - [`ContextClassifier`] (estágio 2): vê as features, as tags do estágio 1 numa
//!   janela ao redor e as tags finais já decididas à esquerda ([`Stage2Context`]).
//!
//! Ambos são implementados para closures, o que permite injetar classificadores
//! falsos nos testes, e para [`LinearClassifier`], um modelo linear esparso
//! carregado de um arquivo JSON de pesos:
//!
//! ```json
//! {
//!   "labels": ["O", "B-PER", "I-PER"],
//!   "weights": { "is_capitalized": { "B-PER": 1.5 }, "prev=B-PER": { "I-PER": 2.0 } }
//! }
//! ```
//!
//! O score de cada label é `Σ_k w_{k, label} * f_k`; vence o arg-max, com empate
//! resolvido pela ordem declarada das labels.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::features::FeatureVector;
use crate::tagger::{LabelSet, Tag};

/// Classificador do estágio 1 (livre de contexto).
pub trait TokenClassifier: Send + Sync {
    fn score(&self, features: &FeatureVector) -> Tag;
}

/// Classificador do estágio 2 (sensível ao contexto).
pub trait ContextClassifier: Send + Sync {
    fn score(&self, context: &Stage2Context<'_>) -> Tag;
}

impl<F> TokenClassifier for F
where
    F: Fn(&FeatureVector) -> Tag + Send + Sync,
{
    fn score(&self, features: &FeatureVector) -> Tag {
        self(features)
    }
}

impl<F> ContextClassifier for F
where
    F: for<'a> Fn(&Stage2Context<'a>) -> Tag + Send + Sync,
{
    fn score(&self, context: &Stage2Context<'_>) -> Tag {
        self(context)
    }
}

/// Tudo o que o estágio 2 pode ver ao decidir o token `position`.
///
/// Só contém estado já finalizado: as tags do estágio 1 (todas prontas antes do
/// estágio 2 começar) e as tags finais dos tokens anteriores da mesma sentença.
#[derive(Debug, Clone)]
pub struct Stage2Context<'a> {
    pub features: &'a FeatureVector,
    /// Posição do token na sentença.
    pub position: usize,
    /// Tags do estágio 1 na janela, com deslocamento relativo (inclui o próprio token, 0).
    pub stage1_window: Vec<(isize, &'a Tag)>,
    /// Tags finais dos tokens `0..position`.
    pub preceding: &'a [Tag],
}

impl<'a> Stage2Context<'a> {
    pub fn new(
        features: &'a FeatureVector,
        position: usize,
        stage1: &'a [Tag],
        window: usize,
        preceding: &'a [Tag],
    ) -> Self {
        let start = position.saturating_sub(window);
        let end = position
            .saturating_add(window)
            .saturating_add(1)
            .min(stage1.len());
        let stage1_window = (start..end)
            .map(|j| (j as isize - position as isize, &stage1[j]))
            .collect();
        Self {
            features,
            position,
            stage1_window,
            preceding: &preceding[..position.min(preceding.len())],
        }
    }

    /// Tag do estágio 1 no deslocamento dado, se estiver dentro da janela.
    pub fn stage1_at(&self, offset: isize) -> Option<&'a Tag> {
        self.stage1_window
            .iter()
            .find(|(o, _)| *o == offset)
            .map(|(_, tag)| *tag)
    }

    /// Tag final do token imediatamente anterior.
    pub fn previous(&self) -> Option<&'a Tag> {
        self.preceding.last()
    }

    /// Features do token acrescidas das features de contexto de labels:
    /// `s1[<offset>]=<tag>`, `prev=<tag>` (ou `prev=BOS`) e `prev2=<tag>|<tag>`.
    pub fn contextual_features(&self) -> FeatureVector {
        let mut fv = self.features.clone();
        for (offset, tag) in &self.stage1_window {
            fv.insert(format!("s1[{offset}]={tag}"), 1.0);
        }
        match self.preceding {
            [] => fv.insert("prev=BOS", 1.0),
            [.., prev] => fv.insert(format!("prev={prev}"), 1.0),
        }
        if let [.., prev2, prev] = self.preceding {
            fv.insert(format!("prev2={prev2}|{prev}"), 1.0);
        }
        fv
    }
}

/// Formato em disco dos pesos.
#[derive(Debug, Serialize, Deserialize)]
struct WeightsFile {
    labels: LabelSet,
    #[serde(default)]
    weights: HashMap<String, HashMap<String, f64>>,
}

/// Modelo linear esparso: pesos `(feature, label) → w`.
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    labels: LabelSet,
    /// feature → [(índice da label, peso)]
    weights: HashMap<String, Vec<(usize, f64)>>,
}

impl LinearClassifier {
    /// Cria um classificador com pesos zerados
    pub fn new(labels: LabelSet) -> Self {
        Self {
            labels,
            weights: HashMap::new(),
        }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Configura um peso. Labels fora do conjunto são ignoradas.
    pub fn set_weight(&mut self, feature: &str, tag: &Tag, weight: f64) {
        let Some(index) = self.labels.tags().iter().position(|t| t == tag) else {
            return;
        };
        let row = self.weights.entry(feature.to_string()).or_default();
        match row.iter_mut().find(|(i, _)| *i == index) {
            Some(entry) => entry.1 = weight,
            None => row.push((index, weight)),
        }
    }

    /// Score de cada label, na ordem do conjunto.
    pub fn scores(&self, features: &FeatureVector) -> Vec<f64> {
        let mut scores = vec![0.0; self.labels.len()];
        for (name, value) in &features.features {
            if let Some(row) = self.weights.get(name) {
                for (index, weight) in row {
                    scores[*index] += weight * value;
                }
            }
        }
        scores
    }

    /// Arg-max dos scores. Sem evidência (todos os scores iguais) a resposta é `O`.
    pub fn predict(&self, features: &FeatureVector) -> Tag {
        let scores = self.scores(features);
        let Some(first) = scores.first().copied() else {
            return Tag::Outside;
        };
        if scores.iter().all(|s| *s == first) {
            return Tag::Outside;
        }
        let mut best = 0;
        for (i, score) in scores.iter().enumerate().skip(1) {
            if *score > scores[best] {
                best = i;
            }
        }
        self.labels.tags()[best].clone()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: WeightsFile = serde_json::from_str(json)?;
        Ok(Self::from_weights_file(file))
    }

    /// Lê um arquivo JSON de pesos.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let tags = self.labels.tags();
        let weights: HashMap<String, HashMap<String, f64>> = self
            .weights
            .iter()
            .map(|(feature, row)| {
                let row: HashMap<String, f64> = row
                    .iter()
                    .map(|(index, weight)| (tags[*index].label(), *weight))
                    .collect();
                (feature.clone(), row)
            })
            .collect();
        serde_json::to_string_pretty(&WeightsFile {
            labels: self.labels.clone(),
            weights,
        })
    }

    fn from_weights_file(file: WeightsFile) -> Self {
        let mut classifier = Self::new(file.labels);
        for (feature, row) in &file.weights {
            for (label, weight) in row {
                match Tag::from_label(label) {
                    Some(tag) if classifier.labels.contains(&tag) => {
                        classifier.set_weight(feature, &tag, *weight)
                    }
                    _ => tracing::warn!(
                        feature = %feature,
                        label = %label,
                        "weight for undeclared label ignored"
                    ),
                }
            }
        }
        classifier
    }
}

impl TokenClassifier for LinearClassifier {
    fn score(&self, features: &FeatureVector) -> Tag {
        self.predict(features)
    }
}

impl ContextClassifier for LinearClassifier {
    fn score(&self, context: &Stage2Context<'_>) -> Tag {
        self.predict(&context.contextual_features())
    }
}
