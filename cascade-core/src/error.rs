//! Tipos de erro do motor de decodificação.
//!
//! Os erros são organizados por camada: modelo de dados, decodificação,
//! unidade de trabalho (arquivo) e configuração. Erros por token
//! (features ausentes) não aparecem aqui como falha: são reparados no lugar
//! e registrados no [`crate::decoder::DecodeReport`].

use std::path::PathBuf;

use thiserror::Error;

use crate::corpus::TokenId;

/// Violações das invariantes estruturais do modelo Token/Documento.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Tentativa de rotular o marcador de documento
    #[error("token {0} is a document-boundary marker and cannot carry predictions")]
    MarkerToken(TokenId),

    /// Os rótulos de predição são atribuídos uma única vez
    #[error("token {id} already has a {stage} label")]
    AlreadyAssigned { id: TokenId, stage: &'static str },

    /// Índice fora do documento
    #[error("no token at {0}")]
    OutOfBounds(TokenId),

    /// String que não segue o esquema BIO
    #[error("invalid BIO label: {0:?}")]
    InvalidLabel(String),
}

/// Erros fatais para uma chamada de decodificação.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Algum dos classificadores não foi carregado
    #[error("decoder not initialized: missing {0} classifier")]
    NotInitialized(&'static str),

    /// O documento já passou pelo decodificador
    #[error("document {0:?} has already been decoded")]
    AlreadyDecoded(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Problemas por token que não interrompem a decodificação.
/// O token afetado recebe `O` e o processamento continua.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    /// O anotador não anexou features a este token
    #[error("token {0} has no feature vector; labelled O")]
    MissingFeatures(TokenId),

    /// O classificador devolveu uma label fora do conjunto do modelo
    #[error("token {id}: {stage} label {label} is not in the label set; labelled O")]
    UnknownLabel {
        id: TokenId,
        stage: &'static str,
        label: String,
    },
}

/// Falhas de uma unidade de trabalho (um arquivo do lote).
#[derive(Error, Debug)]
pub enum TaggingError {
    /// Entrada ilegível ou saída não gravável
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// O leitor não conseguiu segmentar o arquivo em sentenças/tokens
    #[error("malformed input {path} (line {line}): {message}")]
    MalformedInput {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("decoding failed for {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
}

impl TaggingError {
    /// Caminho do arquivo que originou a falha.
    pub fn path(&self) -> &std::path::Path {
        match self {
            TaggingError::Io { path, .. }
            | TaggingError::MalformedInput { path, .. }
            | TaggingError::Decode { path, .. } => path,
        }
    }
}

/// Erros de configuração e carregamento de modelo.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Falha ao ler arquivo de configuração, pesos ou gazetteer
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML inválido
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Arquivo de pesos com JSON inválido
    #[error("failed to parse classifier weights {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Valores inconsistentes
    #[error("invalid configuration: {0}")]
    Validation(String),
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

pub type TaggingResult<T> = std::result::Result<T, TaggingError>;
