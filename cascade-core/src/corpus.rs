//! # Modelo Token/Documento
//!
//! Hierarquia do corpus processado pelo decodificador:
//!
//! ```text
//! Corpus (um por arquivo)
//!  └─ Document (rota de saída)
//!      └─ Sentence (contexto de decodificação do estágio 2)
//!          └─ Token (forma, label gold, label estágio 1, label estágio 2, features)
//! ```
//!
//! Os tokens são endereçados por índices ([`TokenId`]): documento, sentença e
//! posição. Não há ponteiros para trás; o estágio 2 lê o contexto à esquerda
//! diretamente das posições já gravadas na mesma sentença.
//!
//! ## Invariantes
//! - A ordem dos tokens e das sentenças é fixada na construção.
//! - Os slots de predição começam vazios e são gravados uma única vez.
//! - Um marcador de documento (`-DOCSTART-` sozinho numa sentença) nunca recebe
//!   predições nem features.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::features::FeatureVector;
use crate::tagger::Tag;

/// Literal reservado que marca o início de um documento dentro do fluxo.
pub const DOCSTART: &str = "-DOCSTART-";

/// Endereço de um token no corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId {
    pub document: usize,
    pub sentence: usize,
    pub token: usize,
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.document, self.sentence, self.token)
    }
}

/// Qual dos dois slots de predição está sendo gravado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    First,
    Second,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::First => "stage-1",
            Stage::Second => "stage-2",
        }
    }
}

/// A unidade atômica do corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    form: String,
    /// Label gold; string vazia quando o arquivo não traz anotação.
    gold: String,
    stage1: Option<Tag>,
    stage2: Option<Tag>,
    /// Vetor de features anexado pelo anotador. O decodificador só o repassa.
    #[serde(skip)]
    features: Option<FeatureVector>,
    marker: bool,
}

impl Token {
    pub fn new(form: impl Into<String>, gold: impl Into<String>) -> Self {
        Self {
            form: form.into(),
            gold: gold.into(),
            stage1: None,
            stage2: None,
            features: None,
            marker: false,
        }
    }

    pub fn form(&self) -> &str {
        &self.form
    }

    pub fn gold(&self) -> &str {
        &self.gold
    }

    pub fn stage1(&self) -> Option<&Tag> {
        self.stage1.as_ref()
    }

    /// Label final (saída do estágio 2 após o reparo BIO).
    pub fn stage2(&self) -> Option<&Tag> {
        self.stage2.as_ref()
    }

    pub fn features(&self) -> Option<&FeatureVector> {
        self.features.as_ref()
    }

    pub fn is_marker(&self) -> bool {
        self.marker
    }

    fn slot_mut(&mut self, stage: Stage) -> &mut Option<Tag> {
        match stage {
            Stage::First => &mut self.stage1,
            Stage::Second => &mut self.stage2,
        }
    }
}

/// Sequência ordenada de tokens que compartilham contexto de decodificação.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentence {
    tokens: Vec<Token>,
}

impl Sentence {
    /// Cria a sentença. Uma sentença de um único token `-DOCSTART-` vira marcador.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.len() == 1 && tokens[0].form == DOCSTART {
            tokens[0].marker = true;
        }
        Self { tokens }
    }

    /// Sentença marcadora de início de documento.
    pub fn marker() -> Self {
        Self::new(vec![Token::new(DOCSTART, "")])
    }

    pub fn is_marker(&self) -> bool {
        self.tokens.len() == 1 && self.tokens[0].marker
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn forms(&self) -> Vec<&str> {
        self.tokens.iter().map(Token::form).collect()
    }

    /// Labels finais da sentença (`None` para tokens ainda não decodificados).
    pub fn final_tags(&self) -> Vec<Option<&Tag>> {
        self.tokens.iter().map(Token::stage2).collect()
    }
}

/// Sequência ordenada de sentenças, pertencente a um [`Corpus`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    index: usize,
    source: PathBuf,
    sentences: Vec<Sentence>,
}

impl Document {
    pub fn new(source: impl Into<PathBuf>, sentences: Vec<Sentence>) -> Self {
        Self {
            index: 0,
            source: source.into(),
            sentences,
        }
    }

    /// Posição do documento no corpus.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn sentence(&self, index: usize) -> Option<&Sentence> {
        self.sentences.get(index)
    }

    pub fn token(&self, sentence: usize, token: usize) -> Option<&Token> {
        self.sentences.get(sentence)?.token(token)
    }

    pub fn id(&self, sentence: usize, token: usize) -> TokenId {
        TokenId {
            document: self.index,
            sentence,
            token,
        }
    }

    /// Número de tokens rotuláveis (marcadores não contam).
    pub fn token_count(&self) -> usize {
        self.sentences
            .iter()
            .filter(|s| !s.is_marker())
            .map(Sentence::len)
            .sum()
    }

    /// Verdadeiro se algum token já recebeu predição.
    pub fn has_predictions(&self) -> bool {
        self.sentences
            .iter()
            .flat_map(|s| s.tokens.iter())
            .any(|t| t.stage1.is_some() || t.stage2.is_some())
    }

    /// Verdadeiro se todo token rotulável tem as duas predições.
    pub fn is_decoded(&self) -> bool {
        self.sentences
            .iter()
            .flat_map(|s| s.tokens.iter())
            .filter(|t| !t.marker)
            .all(|t| t.stage1.is_some() && t.stage2.is_some())
    }

    fn token_mut(&mut self, sentence: usize, token: usize) -> Result<&mut Token, ModelError> {
        let id = self.id(sentence, token);
        let token = self
            .sentences
            .get_mut(sentence)
            .and_then(|s| s.tokens.get_mut(token))
            .ok_or(ModelError::OutOfBounds(id))?;
        if token.marker {
            return Err(ModelError::MarkerToken(id));
        }
        Ok(token)
    }

    /// Grava uma predição. Rejeita marcadores e regravação do mesmo slot.
    pub fn set_prediction(
        &mut self,
        sentence: usize,
        token: usize,
        stage: Stage,
        tag: Tag,
    ) -> Result<(), ModelError> {
        let id = self.id(sentence, token);
        let slot = self.token_mut(sentence, token)?.slot_mut(stage);
        if slot.is_some() {
            return Err(ModelError::AlreadyAssigned {
                id,
                stage: stage.name(),
            });
        }
        *slot = Some(tag);
        Ok(())
    }

    pub fn set_stage1(&mut self, sentence: usize, token: usize, tag: Tag) -> Result<(), ModelError> {
        self.set_prediction(sentence, token, Stage::First, tag)
    }

    pub fn set_stage2(&mut self, sentence: usize, token: usize, tag: Tag) -> Result<(), ModelError> {
        self.set_prediction(sentence, token, Stage::Second, tag)
    }

    /// Anexa o vetor de features de um token (papel do anotador).
    pub fn set_features(
        &mut self,
        sentence: usize,
        token: usize,
        features: FeatureVector,
    ) -> Result<(), ModelError> {
        self.token_mut(sentence, token)?.features = Some(features);
        Ok(())
    }
}

/// Sequência ordenada de documentos: a unidade de processamento do lote.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acrescenta um documento, atribuindo seu índice.
    pub fn push(&mut self, mut document: Document) {
        document.index = self.documents.len();
        self.documents.push(document);
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn documents_mut(&mut self) -> &mut [Document] {
        &mut self.documents
    }

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.documents.get(id.document)?.token(id.sentence, id.token)
    }

    /// Endereços de todos os tokens rotuláveis, em ordem de leitura.
    pub fn token_ids(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.documents.iter().flat_map(|doc| {
            doc.sentences
                .iter()
                .enumerate()
                .filter(|(_, s)| !s.is_marker())
                .flat_map(move |(si, s)| (0..s.len()).map(move |ti| doc.id(si, ti)))
        })
    }

    pub fn token_count(&self) -> usize {
        self.documents.iter().map(Document::token_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(forms: &[&str]) -> Sentence {
        Sentence::new(forms.iter().map(|f| Token::new(*f, "O")).collect())
    }

    fn sample_corpus() -> Corpus {
        let mut corpus = Corpus::new();
        corpus.push(Document::new(
            "a.txt",
            vec![Sentence::marker(), sentence(&["Barack", "Obama"]), sentence(&["Paris"])],
        ));
        corpus.push(Document::new("a.txt", vec![Sentence::marker(), sentence(&["Hi", "."])]));
        corpus
    }

    #[test]
    fn test_marker_detection() {
        assert!(Sentence::marker().is_marker());
        assert!(sentence(&[DOCSTART]).is_marker());
        // O literal dentro de uma sentença maior é um token comum
        assert!(!sentence(&[DOCSTART, "x"]).is_marker());
        assert!(!sentence(&["Paris"]).is_marker());
    }

    #[test]
    fn test_marker_rejects_predictions() {
        let mut corpus = sample_corpus();
        let doc = &mut corpus.documents_mut()[1];
        let err = doc.set_stage1(0, 0, Tag::Outside).unwrap_err();
        assert_eq!(
            err,
            ModelError::MarkerToken(TokenId { document: 1, sentence: 0, token: 0 })
        );
        assert!(doc.token(0, 0).unwrap().stage1().is_none());
    }

    #[test]
    fn test_single_shot_assignment() {
        let mut corpus = sample_corpus();
        let doc = &mut corpus.documents_mut()[0];
        doc.set_stage2(1, 0, Tag::Begin("PER".into())).unwrap();
        let err = doc.set_stage2(1, 0, Tag::Outside).unwrap_err();
        assert!(matches!(err, ModelError::AlreadyAssigned { stage: "stage-2", .. }));
        assert_eq!(doc.token(1, 0).unwrap().stage2(), Some(&Tag::Begin("PER".into())));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut corpus = sample_corpus();
        let doc = &mut corpus.documents_mut()[0];
        assert!(matches!(
            doc.set_stage1(9, 0, Tag::Outside),
            Err(ModelError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_navigation_and_counts() {
        let corpus = sample_corpus();
        assert_eq!(corpus.token_count(), 5);
        let ids: Vec<TokenId> = corpus.token_ids().collect();
        assert_eq!(ids.len(), 5);
        assert_eq!(ids[0], TokenId { document: 0, sentence: 1, token: 0 });
        assert_eq!(corpus.token(ids[4]).unwrap().form(), ".");
        assert_eq!(corpus.documents()[1].index(), 1);
    }

    #[test]
    fn test_decoded_state() {
        let mut corpus = sample_corpus();
        let doc = &mut corpus.documents_mut()[1];
        assert!(!doc.has_predictions());
        for t in 0..2 {
            doc.set_stage1(1, t, Tag::Outside).unwrap();
            doc.set_stage2(1, t, Tag::Outside).unwrap();
        }
        assert!(doc.has_predictions());
        assert!(doc.is_decoded());
    }
}
