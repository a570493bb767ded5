//! # cascade-core — Decodificação NER em Cascata
//!
//! Este crate rotula arquivos em formato de colunas (CoNLL) com entidades
//! nomeadas no esquema BIO, usando dois classificadores treinados externamente
//! aplicados em cascata.
//!
//! ## Arquitetura do Sistema
//!
//! O dado flui por um pipeline linear, uma unidade de trabalho por arquivo:
//!
//! 1.  **Entrada** ([`reader`]): o arquivo é segmentado em documentos, sentenças e tokens.
//! 2.  **Features** ([`features`]): cada token recebe um vetor de características
//!     (ex: "começa com maiúscula", "sufixo=ma", "in_gazetteer=PER").
//! 3.  **Decodificação** ([`decoder`]):
//!     *   **Estágio 1**: classificação livre de contexto, token a token.
//!     *   **Estágio 2**: classificação com a janela do estágio 1 e as labels finais
//!         anteriores, seguida do reparo BIO ([`tagger::repair`]).
//! 4.  **Saída** ([`formatter`]): uma linha `forma gold predição` por token.
//!
//! O [`batch`] aplica o pipeline a um arquivo ou a todos os arquivos de um diretório.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use std::path::Path;
//! use cascade_core::{CascadeDecoder, ContextualAnnotator, DecoderConfig, LabelSet, Stage2Context, Tag, TaggingPipeline};
//! use cascade_core::features::FeatureVector;
//!
//! // Classificadores podem ser closures ou modelos lineares carregados de JSON
//! let decoder = CascadeDecoder::new(LabelSet::default(), DecoderConfig::default())
//!     .with_stage1(|fv: &FeatureVector| {
//!         if fv.contains("is_capitalized") { Tag::Begin("PER".into()) } else { Tag::Outside }
//!     })
//!     .with_stage2(|ctx: &Stage2Context<'_>| ctx.stage1_at(0).cloned().unwrap_or(Tag::Outside));
//!
//! let pipeline = TaggingPipeline::new(ContextualAnnotator::default(), decoder);
//! let out = pipeline.tag_text("Lula O\nfalou O\n", Path::new("exemplo.txt")).unwrap();
//! assert_eq!(out.text, "Lula O B-PER\nfalou O O\n\n");
//! ```
//!
//! ## Módulos Principais
//!
//! - [`corpus`]: modelo Token/Sentença/Documento com predições atribuídas uma única vez.
//! - [`tagger`]: esquema BIO, transições válidas e conjunto de labels.
//! - [`classifier`]: contratos dos dois estágios e o classificador linear.
//! - [`model`] e [`config`]: carregamento de pesos e configuração TOML.

pub mod batch;
pub mod classifier;
pub mod config;
pub mod corpus;
pub mod decoder;
pub mod error;
pub mod features;
pub mod formatter;
pub mod model;
pub mod pipeline;
pub mod reader;
pub mod tagger;

pub use batch::{BatchReport, BatchTagger, FileOutcome, WorkItem};
pub use classifier::{ContextClassifier, LinearClassifier, Stage2Context, TokenClassifier};
pub use config::TaggerConfig;
pub use corpus::{Corpus, Document, Sentence, Token, TokenId, DOCSTART};
pub use decoder::{CascadeDecoder, DecodeReport, DecoderConfig};
pub use error::{ConfigError, DecodeError, DecodeWarning, ModelError, TaggingError};
pub use features::{ContextualAnnotator, FeatureAnnotator, Gazetteers};
pub use model::CascadeModel;
pub use pipeline::{TaggedOutput, TaggingPipeline};
pub use tagger::{LabelSet, Tag};

/// Versão do crate, para logs e `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
