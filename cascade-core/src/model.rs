//! # Modelo em Cascata
//!
//! Agrega os dois classificadores lineares treinados externamente:
//! - **Estágio 1**: pesos sobre as features do token.
//! - **Estágio 2**: pesos sobre as features do token mais as features de
//!   contexto de labels (`s1[..]`, `prev`, `prev2`).
//!
//! Os dois arquivos de pesos precisam declarar o mesmo conjunto de labels; a
//! ordem do estágio 1 é a usada pelo decodificador.

use std::collections::HashSet;
use std::sync::Arc;

use crate::classifier::LinearClassifier;
use crate::config::ModelConfig;
use crate::decoder::{CascadeDecoder, DecoderConfig};
use crate::error::ConfigError;
use crate::tagger::{LabelSet, Tag};

/// Os dois estágios já carregados, prontos para montar decodificadores.
#[derive(Debug, Clone)]
pub struct CascadeModel {
    stage1: Arc<LinearClassifier>,
    stage2: Arc<LinearClassifier>,
}

impl CascadeModel {
    /// Monta o modelo a partir de classificadores em memória.
    pub fn new(stage1: LinearClassifier, stage2: LinearClassifier) -> Result<Self, ConfigError> {
        check_same_labels(stage1.labels(), stage2.labels())?;
        Ok(Self {
            stage1: Arc::new(stage1),
            stage2: Arc::new(stage2),
        })
    }

    /// Lê os arquivos de pesos indicados na configuração.
    pub fn load(config: &ModelConfig) -> Result<Self, ConfigError> {
        let stage1 = LinearClassifier::from_file(&config.stage1)?;
        let stage2 = LinearClassifier::from_file(&config.stage2)?;
        let model = Self::new(stage1, stage2)?;
        tracing::info!(
            stage1 = %config.stage1.display(),
            stage2 = %config.stage2.display(),
            labels = model.labels().len(),
            "cascade model loaded"
        );
        Ok(model)
    }

    pub fn labels(&self) -> &LabelSet {
        self.stage1.labels()
    }

    pub fn stage1(&self) -> &LinearClassifier {
        &self.stage1
    }

    pub fn stage2(&self) -> &LinearClassifier {
        &self.stage2
    }

    /// Decodificador com os dois estágios deste modelo.
    pub fn decoder(&self, config: DecoderConfig) -> CascadeDecoder {
        let mut decoder = CascadeDecoder::new(self.labels().clone(), config);
        decoder.set_stage1(self.stage1.clone());
        decoder.set_stage2(self.stage2.clone());
        decoder
    }
}

fn check_same_labels(stage1: &LabelSet, stage2: &LabelSet) -> Result<(), ConfigError> {
    let first: HashSet<&Tag> = stage1.tags().iter().collect();
    let second: HashSet<&Tag> = stage2.tags().iter().collect();
    if first == second {
        return Ok(());
    }
    let mut only_one: Vec<String> = first.difference(&second).map(|t| t.label()).collect();
    let mut only_two: Vec<String> = second.difference(&first).map(|t| t.label()).collect();
    only_one.sort();
    only_two.sort();
    Err(ConfigError::Validation(format!(
        "stage label sets differ: only in stage 1 {only_one:?}, only in stage 2 {only_two:?}"
    )))
}
