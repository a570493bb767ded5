//! # Decodificador em Cascata
//!
//! Transforma vetores de features em uma sequência de labels BIO bem formada,
//! em duas passadas sobre o documento:
//!
//! ```text
//! Estágio 1 (livre de contexto):  tag1[i] = stage1(features[i])
//!
//! Estágio 2 (com contexto):       raw[i]  = stage2(features[i], tag1[i-w..=i+w], final[0..i])
//!                                 final[i] = repair(raw[i], final[i-1])
//! ```
//!
//! O estágio 2 é estritamente sequencial dentro da sentença: o contexto do token
//! `i` inclui a label final recém-atribuída ao token `i-1`. Entre sentenças não há
//! dependência; o contexto à esquerda recomeça em cada sentença e nunca atravessa
//! um marcador de documento.
//!
//! Os classificadores são passados explicitamente no valor [`CascadeDecoder`]
//! (não há estado global), então vários decodificadores podem coexistir.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classifier::{ContextClassifier, Stage2Context, TokenClassifier};
use crate::corpus::{Corpus, Document, Stage, Token, TokenId};
use crate::error::{DecodeError, DecodeResult, DecodeWarning};
use crate::tagger::{repair, LabelSet, Tag};

/// Parâmetros do decodificador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Quantas tags do estágio 1 de cada lado o estágio 2 enxerga.
    pub window: usize,
    /// Decodifica documentos em paralelo em [`CascadeDecoder::decode_corpus`].
    pub parallel: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            window: 2,
            parallel: false,
        }
    }
}

/// Resumo de uma decodificação.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    /// Sentenças decodificadas (marcadores não contam)
    pub sentences: usize,
    /// Tokens que receberam as duas labels
    pub tokens: usize,
    /// Labels do estágio 2 reescritas pela regra de reparo
    pub repaired: usize,
    /// Problemas por token, em ordem de ocorrência
    pub warnings: Vec<DecodeWarning>,
}

impl DecodeReport {
    pub fn merge(&mut self, other: DecodeReport) {
        self.sentences += other.sentences;
        self.tokens += other.tokens;
        self.repaired += other.repaired;
        self.warnings.extend(other.warnings);
    }

    /// Tokens sem vetor de features.
    pub fn missing_features(&self) -> Vec<TokenId> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                DecodeWarning::MissingFeatures(id) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

/// O decodificador: dois classificadores, o conjunto de labels e a configuração.
#[derive(Clone)]
pub struct CascadeDecoder {
    stage1: Option<Arc<dyn TokenClassifier>>,
    stage2: Option<Arc<dyn ContextClassifier>>,
    labels: LabelSet,
    config: DecoderConfig,
}

impl CascadeDecoder {
    /// Cria um decodificador ainda sem classificadores.
    pub fn new(labels: LabelSet, config: DecoderConfig) -> Self {
        Self {
            stage1: None,
            stage2: None,
            labels,
            config,
        }
    }

    pub fn with_stage1(mut self, classifier: impl TokenClassifier + 'static) -> Self {
        self.stage1 = Some(Arc::new(classifier));
        self
    }

    pub fn with_stage2(mut self, classifier: impl ContextClassifier + 'static) -> Self {
        self.stage2 = Some(Arc::new(classifier));
        self
    }

    pub fn set_stage1(&mut self, classifier: Arc<dyn TokenClassifier>) {
        self.stage1 = Some(classifier);
    }

    pub fn set_stage2(&mut self, classifier: Arc<dyn ContextClassifier>) {
        self.stage2 = Some(classifier);
    }

    pub fn is_initialized(&self) -> bool {
        self.stage1.is_some() && self.stage2.is_some()
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    fn classifiers(&self) -> DecodeResult<(&dyn TokenClassifier, &dyn ContextClassifier)> {
        let stage1 = self
            .stage1
            .as_deref()
            .ok_or(DecodeError::NotInitialized("stage-1"))?;
        let stage2 = self
            .stage2
            .as_deref()
            .ok_or(DecodeError::NotInitialized("stage-2"))?;
        Ok((stage1, stage2))
    }

    /// Decodifica um documento no lugar.
    ///
    /// Falha sem alterar nada se algum classificador estiver ausente
    /// (`NotInitialized`) ou se o documento já tiver predições (`AlreadyDecoded`).
    pub fn decode(&self, document: &mut Document) -> DecodeResult<DecodeReport> {
        let (stage1, stage2) = self.classifiers()?;
        ensure_fresh(document)?;
        self.run(document, stage1, stage2)
    }

    /// Decodifica todos os documentos do corpus.
    ///
    /// As pré-condições são verificadas para o corpus inteiro antes de qualquer
    /// mutação. Com `parallel`, os documentos são decodificados com rayon; o
    /// relatório mantém a ordem dos documentos.
    pub fn decode_corpus(&self, corpus: &mut Corpus) -> DecodeResult<DecodeReport> {
        let (stage1, stage2) = self.classifiers()?;
        for document in corpus.documents() {
            ensure_fresh(document)?;
        }

        let reports: Vec<DecodeReport> = if self.config.parallel {
            corpus
                .documents_mut()
                .par_iter_mut()
                .map(|doc| self.run(doc, stage1, stage2))
                .collect::<DecodeResult<_>>()?
        } else {
            corpus
                .documents_mut()
                .iter_mut()
                .map(|doc| self.run(doc, stage1, stage2))
                .collect::<DecodeResult<_>>()?
        };

        let mut total = DecodeReport::default();
        for report in reports {
            total.merge(report);
        }
        Ok(total)
    }

    fn run(
        &self,
        document: &mut Document,
        stage1: &dyn TokenClassifier,
        stage2: &dyn ContextClassifier,
    ) -> DecodeResult<DecodeReport> {
        let mut report = DecodeReport::default();
        self.run_stage1(document, stage1, &mut report)?;
        self.run_stage2(document, stage2, &mut report)?;
        tracing::debug!(
            document = %document.source().display(),
            index = document.index(),
            sentences = report.sentences,
            tokens = report.tokens,
            repaired = report.repaired,
            "document decoded"
        );
        Ok(report)
    }

    /// Estágio 1: cada token vê apenas as próprias features.
    fn run_stage1(
        &self,
        document: &mut Document,
        classifier: &dyn TokenClassifier,
        report: &mut DecodeReport,
    ) -> DecodeResult<()> {
        for si in 0..document.sentences().len() {
            let len = match document.sentence(si) {
                Some(sentence) if !sentence.is_marker() => sentence.len(),
                _ => continue,
            };
            for ti in 0..len {
                let id = document.id(si, ti);
                let tag = match document.token(si, ti).and_then(Token::features) {
                    Some(features) => self.accept(classifier.score(features), id, Stage::First, report),
                    None => {
                        tracing::warn!(token = %id, "missing feature vector, labelling O");
                        report.warnings.push(DecodeWarning::MissingFeatures(id));
                        Tag::Outside
                    }
                };
                document.set_stage1(si, ti, tag)?;
            }
        }
        Ok(())
    }

    /// Estágio 2: esquerda para direita, com reparo BIO a cada token.
    fn run_stage2(
        &self,
        document: &mut Document,
        classifier: &dyn ContextClassifier,
        report: &mut DecodeReport,
    ) -> DecodeResult<()> {
        for si in 0..document.sentences().len() {
            let stage1: Vec<Tag> = match document.sentence(si) {
                Some(sentence) if !sentence.is_marker() => sentence
                    .tokens()
                    .iter()
                    .map(|t| t.stage1().cloned().unwrap_or(Tag::Outside))
                    .collect(),
                _ => continue,
            };

            // Espelho das labels finais já gravadas nesta sentença
            let mut finals: Vec<Tag> = Vec::with_capacity(stage1.len());
            for ti in 0..stage1.len() {
                let id = document.id(si, ti);
                let raw = match document.token(si, ti).and_then(Token::features) {
                    Some(features) => {
                        let context =
                            Stage2Context::new(features, ti, &stage1, self.config.window, &finals);
                        self.accept(classifier.score(&context), id, Stage::Second, report)
                    }
                    None => Tag::Outside,
                };

                let fixed = repair(raw.clone(), finals.last());
                if fixed != raw {
                    tracing::trace!(token = %id, raw = %raw, repaired = %fixed, "BIO repair");
                    report.repaired += 1;
                }
                document.set_stage2(si, ti, fixed.clone())?;
                finals.push(fixed);
                report.tokens += 1;
            }
            report.sentences += 1;
        }
        Ok(())
    }

    /// Substitui por `O` qualquer label fora do conjunto do modelo.
    fn accept(&self, tag: Tag, id: TokenId, stage: Stage, report: &mut DecodeReport) -> Tag {
        if self.labels.contains(&tag) {
            return tag;
        }
        tracing::warn!(token = %id, label = %tag, stage = stage.name(), "label outside the label set");
        report.warnings.push(DecodeWarning::UnknownLabel {
            id,
            stage: stage.name(),
            label: tag.label(),
        });
        Tag::Outside
    }
}

fn ensure_fresh(document: &Document) -> DecodeResult<()> {
    if document.has_predictions() {
        return Err(DecodeError::AlreadyDecoded(
            document.source().display().to_string(),
        ));
    }
    Ok(())
}
