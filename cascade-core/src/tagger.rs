//! # Esquema de Tags BIO e Regra de Reparo
//!
//! Define o esquema de anotação **BIO** (Beginning-Inside-Outside) utilizado
//! para rotular tokens no reconhecimento de entidades nomeadas.
//!
//! ## Esquema BIO
//!
//! - `B-TIPO`: Begin — primeiro token de uma entidade
//! - `I-TIPO`: Inside — tokens subsequentes da mesma entidade
//! - `O`: Outside — não é parte de nenhuma entidade
//!
//! Os tipos de entidade não são fixos: vêm do conjunto de labels do modelo
//! carregado ([`LabelSet`]). O padrão é o conjunto CoNLL (PER, ORG, LOC, MISC).
//!
//! ## Reparo BIO
//!
//! O classificador do estágio 2 pode emitir sequências mal formadas
//! (ex: `O I-PER`). A função [`repair`] reescreve um `I-X` sem antecessor
//! compatível para `B-X`, garantindo que toda sequência final seja válida.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Tipos de entidade do conjunto CoNLL-2003, usados quando o modelo não declara outros.
pub const DEFAULT_ENTITY_TYPES: [&str; 4] = ["PER", "ORG", "LOC", "MISC"];

/// Tag BIO aplicada a um token.
///
/// O tipo de entidade é uma string livre (ex: "PER", "GPE", "PRODUCT"), pois o
/// conjunto de tipos pertence ao modelo e não ao decodificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Tag {
    /// **Begin**: Marca o INÍCIO de uma entidade. Ex: **Barack** (B-PER) Obama.
    Begin(String),
    /// **Inside**: Marca a CONTINUAÇÃO de uma entidade. Ex: Barack **Obama** (I-PER).
    Inside(String),
    /// **Outside**: O token não faz parte de nenhuma entidade.
    Outside,
}

impl Tag {
    /// Representação textual da tag (ex: "B-PER", "I-ORG", "O")
    pub fn label(&self) -> String {
        match self {
            Tag::Begin(kind) => format!("B-{kind}"),
            Tag::Inside(kind) => format!("I-{kind}"),
            Tag::Outside => "O".to_string(),
        }
    }

    /// Retorna o tipo de entidade desta tag (se for B- ou I-)
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            Tag::Begin(kind) | Tag::Inside(kind) => Some(kind),
            Tag::Outside => None,
        }
    }

    pub fn is_begin(&self) -> bool {
        matches!(self, Tag::Begin(_))
    }

    pub fn is_inside(&self) -> bool {
        matches!(self, Tag::Inside(_))
    }

    pub fn is_outside(&self) -> bool {
        matches!(self, Tag::Outside)
    }

    /// Verdadeiro se as duas tags pertencem a entidades do mesmo tipo.
    /// `O` nunca tem o mesmo tipo que outra tag.
    pub fn same_type(&self, other: &Tag) -> bool {
        match (self.entity_type(), other.entity_type()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Verifica se a transição tag_prev → next é válida no esquema BIO
    ///
    /// Regras:
    /// - `I-X` só pode seguir `B-X` ou `I-X` (mesmo tipo)
    /// - `B-X` pode seguir qualquer tag
    /// - `O` pode seguir qualquer tag
    ///
    /// `prev = None` representa o início da sentença.
    pub fn is_valid_transition(prev: Option<&Tag>, next: &Tag) -> bool {
        match next {
            Tag::Inside(kind) => match prev {
                Some(Tag::Begin(prev_kind) | Tag::Inside(prev_kind)) => prev_kind == kind,
                _ => false,
            },
            _ => true,
        }
    }

    /// Parseia uma tag a partir de string (ex: "B-PER" → Begin("PER"))
    pub fn from_label(s: &str) -> Option<Self> {
        if s == "O" {
            return Some(Tag::Outside);
        }
        let (prefix, kind) = s.split_once('-')?;
        if kind.is_empty() || kind.chars().any(char::is_whitespace) {
            return None;
        }
        match prefix {
            "B" => Some(Tag::Begin(kind.to_string())),
            "I" => Some(Tag::Inside(kind.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Begin(kind) => write!(f, "B-{kind}"),
            Tag::Inside(kind) => write!(f, "I-{kind}"),
            Tag::Outside => f.write_str("O"),
        }
    }
}

impl TryFrom<String> for Tag {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Tag::from_label(&value).ok_or(ModelError::InvalidLabel(value))
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.label()
    }
}

/// Regra de reparo BIO.
///
/// Recebe a saída bruta do classificador e a tag final já decidida para o token
/// anterior da mesma sentença (`None` no primeiro token). Um `I-X` cujo antecessor
/// não é `B-X` nem `I-X` vira `B-X`; qualquer outra tag passa inalterada.
///
/// # Exemplo
/// `repair(I-PER, None)` → `B-PER`; `repair(I-PER, Some(B-PER))` → `I-PER`
pub fn repair(raw: Tag, previous_final: Option<&Tag>) -> Tag {
    match raw {
        Tag::Inside(kind) => {
            let continues = matches!(
                previous_final,
                Some(Tag::Begin(prev) | Tag::Inside(prev)) if *prev == kind
            );
            if continues {
                Tag::Inside(kind)
            } else {
                Tag::Begin(kind)
            }
        }
        other => other,
    }
}

/// Verdadeiro se a sequência inteira respeita as transições BIO.
pub fn is_valid_sequence(tags: &[Tag]) -> bool {
    let mut prev: Option<&Tag> = None;
    for tag in tags {
        if !Tag::is_valid_transition(prev, tag) {
            return false;
        }
        prev = Some(tag);
    }
    true
}

/// Conjunto de labels que o modelo conhece.
///
/// Mantém a ordem declarada (usada para desempate no arg-max dos classificadores)
/// e responde às perguntas de pertinência que o decodificador precisa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Tag>", into = "Vec<Tag>")]
pub struct LabelSet {
    tags: Vec<Tag>,
}

impl LabelSet {
    /// Constrói o conjunto `O` + `B-X`/`I-X` para cada tipo informado.
    pub fn from_entity_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags = vec![Tag::Outside];
        for kind in types {
            let kind = kind.as_ref();
            tags.push(Tag::Begin(kind.to_string()));
            tags.push(Tag::Inside(kind.to_string()));
        }
        Self::from_tags(tags)
    }

    /// Usa as tags na ordem dada, removendo duplicatas e garantindo a presença de `O`.
    pub fn from_tags(tags: impl IntoIterator<Item = Tag>) -> Self {
        let mut unique: Vec<Tag> = Vec::new();
        for tag in tags {
            if !unique.contains(&tag) {
                unique.push(tag);
            }
        }
        if !unique.contains(&Tag::Outside) {
            unique.insert(0, Tag::Outside);
        }
        Self { tags: unique }
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tipos de entidade distintos, na ordem em que aparecem.
    pub fn entity_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for kind in self.tags.iter().filter_map(Tag::entity_type) {
            if !types.contains(&kind) {
                types.push(kind);
            }
        }
        types
    }
}

impl From<Vec<Tag>> for LabelSet {
    fn from(tags: Vec<Tag>) -> Self {
        Self::from_tags(tags)
    }
}

impl From<LabelSet> for Vec<Tag> {
    fn from(set: LabelSet) -> Self {
        set.tags
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::from_entity_types(DEFAULT_ENTITY_TYPES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(labels: &[&str]) -> Vec<Tag> {
        labels.iter().map(|l| Tag::from_label(l).unwrap()).collect()
    }

    #[test]
    fn test_tag_labels() {
        assert_eq!(Tag::Outside.label(), "O");
        assert_eq!(Tag::Begin("PER".into()).label(), "B-PER");
        assert_eq!(Tag::Inside("LOC".into()).to_string(), "I-LOC");
    }

    #[test]
    fn test_tag_from_label() {
        assert_eq!(Tag::from_label("O"), Some(Tag::Outside));
        assert_eq!(Tag::from_label("B-PER"), Some(Tag::Begin("PER".into())));
        assert_eq!(Tag::from_label("I-WORK_OF_ART"), Some(Tag::Inside("WORK_OF_ART".into())));
        assert_eq!(Tag::from_label("E-PER"), None);
        assert_eq!(Tag::from_label("B-"), None);
        assert_eq!(Tag::from_label("PER"), None);
        assert_eq!(Tag::from_label(""), None);
    }

    #[test]
    fn test_valid_transitions() {
        let b_per = Tag::Begin("PER".into());
        let i_per = Tag::Inside("PER".into());
        let b_org = Tag::Begin("ORG".into());

        assert!(Tag::is_valid_transition(Some(&b_per), &i_per));
        assert!(Tag::is_valid_transition(Some(&i_per), &i_per));
        assert!(!Tag::is_valid_transition(Some(&Tag::Outside), &i_per));
        assert!(!Tag::is_valid_transition(Some(&b_org), &i_per));
        assert!(!Tag::is_valid_transition(None, &i_per));
        assert!(Tag::is_valid_transition(None, &b_org));
    }

    #[test]
    fn test_repair_rewrites_orphan_inside() {
        let i_per = Tag::Inside("PER".into());
        assert_eq!(repair(i_per.clone(), None), Tag::Begin("PER".into()));
        assert_eq!(repair(i_per.clone(), Some(&Tag::Outside)), Tag::Begin("PER".into()));
        assert_eq!(
            repair(i_per.clone(), Some(&Tag::Inside("LOC".into()))),
            Tag::Begin("PER".into())
        );
        assert_eq!(repair(i_per.clone(), Some(&Tag::Begin("PER".into()))), i_per);
    }

    #[test]
    fn test_repair_passes_begin_and_outside() {
        let prev = Tag::Inside("PER".into());
        assert_eq!(repair(Tag::Outside, Some(&prev)), Tag::Outside);
        assert_eq!(repair(Tag::Begin("PER".into()), Some(&prev)), Tag::Begin("PER".into()));
    }

    #[test]
    fn test_repair_is_noop_on_valid_sequence() {
        let raw = tags(&["B-PER", "I-PER", "O", "B-LOC", "I-LOC", "B-LOC", "O"]);
        assert!(is_valid_sequence(&raw));

        let mut repaired: Vec<Tag> = Vec::new();
        for tag in &raw {
            let fixed = repair(tag.clone(), repaired.last());
            repaired.push(fixed);
        }
        assert_eq!(repaired, raw);
    }

    #[test]
    fn test_repair_makes_sequence_valid() {
        let raw = tags(&["I-PER", "I-PER", "O", "I-LOC", "O"]);
        assert!(!is_valid_sequence(&raw));

        let mut repaired: Vec<Tag> = Vec::new();
        for tag in raw {
            let fixed = repair(tag, repaired.last());
            repaired.push(fixed);
        }
        assert_eq!(repaired, tags(&["B-PER", "I-PER", "O", "B-LOC", "O"]));
        assert!(is_valid_sequence(&repaired));
    }

    #[test]
    fn test_label_set_membership() {
        let set = LabelSet::default();
        assert_eq!(set.len(), 9);
        assert!(set.contains(&Tag::Outside));
        assert!(set.contains(&Tag::Inside("MISC".into())));
        assert!(!set.contains(&Tag::Begin("GPE".into())));
        assert_eq!(set.entity_types(), vec!["PER", "ORG", "LOC", "MISC"]);
    }

    #[test]
    fn test_label_set_from_tags_adds_outside() {
        let set = LabelSet::from_tags(tags(&["B-PER", "I-PER", "B-PER"]));
        assert_eq!(set.tags()[0], Tag::Outside);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_tag_serde_as_string() {
        let json = serde_json::to_string(&Tag::Begin("LOC".into())).unwrap();
        assert_eq!(json, "\"B-LOC\"");
        let back: Tag = serde_json::from_str("\"I-ORG\"").unwrap();
        assert_eq!(back, Tag::Inside("ORG".into()));
        assert!(serde_json::from_str::<Tag>("\"X-ORG\"").is_err());
    }
}
