//! # Engenharia de Features para NER
//!
//! O decodificador trata o vetor de features como opaco: apenas o repassa aos
//! classificadores. Quem o produz é um [`FeatureAnnotator`], chamado uma vez por
//! documento antes da decodificação. Este módulo traz o anotador de referência,
//! [`ContextualAnnotator`].
//!
//! ## Features Implementadas
//!
//! ### Features do token atual
//! - Forma da palavra (lowercase) e `bias`
//! - Capitalização: IsCapitalized, IsAllCaps, IsMixed
//! - Prefixos e sufixos de 2, 3 e 4 grafemas
//! - Forma ortográfica (`Barack` → `Xxxxxx`, `1984` → `9999`)
//! - Contém dígitos, hífens, pontos; é pontuação
//!
//! ### Features de contexto (janela de 2 tokens, sem cruzar a sentença)
//! - Palavras anteriores e posteriores, bigrama ao redor
//! - BOS / EOS
//!
//! ### Features de Gazetteer
//! - Pertence à lista da categoria `X` (`in_gazetteer=X`)

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::corpus::Document;
use crate::error::{ConfigError, ModelError};

/// Estrutura para representar as características de um token.
///
/// Utilizamos um mapa esparso (`HashMap<String, f64>`) porque o espaço de features é potencialmente
/// infinito (ex: "word=paris", "suffix3=ris"), mas cada token ativa apenas um pequeno subconjunto.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// O mapa de features ativas. Ex: `{"is_capitalized": 1.0, "word=paris": 1.0}`.
    pub features: HashMap<String, f64>,
    /// Referência ao índice do token original na sentença.
    pub token_index: usize,
}

impl FeatureVector {
    pub fn new(token_index: usize) -> Self {
        Self {
            features: HashMap::new(),
            token_index,
        }
    }

    /// Adiciona uma feature ao vetor com valor 1.0 (binária) ou customizado.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.features.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.features.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.features.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Colaborador que anexa features a todo token rotulável de um documento.
pub trait FeatureAnnotator: Send + Sync {
    fn annotate(&self, document: &mut Document) -> Result<(), ModelError>;
}

/// Listas de entidades conhecidas, por categoria (ex: "PER" → {"obama", ...}).
///
/// As entradas são guardadas em minúsculas.
#[derive(Debug, Clone, Default)]
pub struct Gazetteers {
    lists: BTreeMap<String, HashSet<String>>,
}

impl Gazetteers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: &str, entry: &str) {
        self.lists
            .entry(category.to_string())
            .or_default()
            .insert(entry.to_lowercase());
    }

    /// Categorias que contêm a palavra, em ordem alfabética.
    pub fn categories_of(&self, word: &str) -> Vec<&str> {
        let lower = word.to_lowercase();
        self.lists
            .iter()
            .filter(|(_, entries)| entries.contains(&lower))
            .map(|(category, _)| category.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lists.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.values().all(HashSet::is_empty)
    }

    /// Carrega um diretório de listas: cada arquivo é uma categoria (nome sem
    /// extensão) com uma entrada por linha. Arquivos ocultos são ignorados.
    pub fn load_dir(dir: &Path) -> Result<Self, ConfigError> {
        let read_err = |source| ConfigError::Read {
            path: dir.to_path_buf(),
            source,
        };
        let mut gazetteers = Self::new();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.'))
                .unwrap_or(true);
            if path.is_file() && !hidden {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let Some(category) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
            else {
                continue;
            };
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                gazetteers.insert(&category, line);
            }
            tracing::debug!(category = %category, "gazetteer loaded");
        }
        Ok(gazetteers)
    }
}

/// Anotador de referência: features ortográficas, de contexto e de gazetteer.
#[derive(Debug, Clone, Default)]
pub struct ContextualAnnotator {
    gazetteers: Gazetteers,
    /// Limite de repetições na forma ortográfica (`None` = mantém todas).
    shape_max_repeats: Option<usize>,
}

impl ContextualAnnotator {
    pub fn new(gazetteers: Gazetteers) -> Self {
        Self {
            gazetteers,
            shape_max_repeats: None,
        }
    }

    pub fn with_shape_max_repeats(mut self, max_repeats: Option<usize>) -> Self {
        self.shape_max_repeats = max_repeats;
        self
    }
}

impl FeatureAnnotator for ContextualAnnotator {
    fn annotate(&self, document: &mut Document) -> Result<(), ModelError> {
        let mut pending = Vec::new();
        for (si, sentence) in document.sentences().iter().enumerate() {
            if sentence.is_marker() {
                continue;
            }
            let forms = sentence.forms();
            for ti in 0..forms.len() {
                let fv = extract_for_token(&forms, ti, &self.gazetteers, self.shape_max_repeats);
                pending.push((si, ti, fv));
            }
        }
        for (si, ti, fv) in pending {
            document.set_features(si, ti, fv)?;
        }
        Ok(())
    }
}

/// Forma ortográfica da palavra: letras ASCII viram `x`/`X`, dígitos viram `9`,
/// os demais caracteres são mantidos.
///
/// Com `max_repeats = Some(n)`, símbolos repetidos além de `n` vezes seguidas são
/// removidos (`Xxxxxx` com n=1 → `Xxx`).
pub fn word_shape(word: &str, max_repeats: Option<usize>) -> String {
    static SHAPE_CHARS: OnceLock<Regex> = OnceLock::new();
    let re = SHAPE_CHARS.get_or_init(|| Regex::new("[A-Za-z0-9]").expect("static pattern"));

    let shape = re.replace_all(word, |caps: &regex::Captures| {
        match caps[0].chars().next() {
            Some(c) if c.is_ascii_uppercase() => "X",
            Some(c) if c.is_ascii_lowercase() => "x",
            _ => "9",
        }
    });

    match max_repeats {
        None => shape.into_owned(),
        Some(max) => squeeze(&shape, max),
    }
}

fn squeeze(s: &str, max_repeats: usize) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev = None;
    let mut repeats = 0usize;
    for c in s.chars() {
        if Some(c) == prev {
            repeats += 1;
        } else {
            repeats = 0;
        }
        if repeats <= max_repeats {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// Gera vetores de features para toda a sentença.
///
/// O índice `i` do retorno corresponde ao token `i` da entrada.
pub fn extract_features(forms: &[&str], gazetteers: &Gazetteers) -> Vec<FeatureVector> {
    (0..forms.len())
        .map(|i| extract_for_token(forms, i, gazetteers, None))
        .collect()
}

/// Extrai features para um único token em seu contexto.
///
/// O contexto nunca atravessa a fronteira da sentença: `forms` é sempre uma
/// sentença inteira.
pub fn extract_for_token(
    forms: &[&str],
    i: usize,
    gazetteers: &Gazetteers,
    shape_max_repeats: Option<usize>,
) -> FeatureVector {
    let mut fv = FeatureVector::new(i);
    let word = forms[i];
    let lower = word.to_lowercase();

    // === Features da palavra atual ===
    fv.insert(format!("word={lower}"), 1.0);
    fv.insert("bias", 1.0);
    fv.insert(format!("shape={}", word_shape(word, shape_max_repeats)), 1.0);

    // Capitalização
    let first_char_upper = starts_uppercase(word);
    let all_upper = word.chars().all(|c| c.is_uppercase() || !c.is_alphabetic());
    let has_upper_in_middle = word.chars().skip(1).any(|c| c.is_uppercase());

    if first_char_upper {
        fv.insert("is_capitalized", 1.0);
    }
    if all_upper && word.chars().count() > 1 {
        fv.insert("is_all_caps", 1.0);
    }
    if has_upper_in_middle {
        fv.insert("is_mixed_case", 1.0);
    }

    // Prefixos e sufixos por grafema
    let graphemes: Vec<&str> = word.graphemes(true).collect();
    for n in 2..=4 {
        if graphemes.len() >= n {
            let prefix = graphemes[..n].concat().to_lowercase();
            let suffix = graphemes[graphemes.len() - n..].concat().to_lowercase();
            fv.insert(format!("prefix{n}={prefix}"), 1.0);
            fv.insert(format!("suffix{n}={suffix}"), 1.0);
        }
    }

    // Padrões numéricos e de pontuação
    if !word.is_empty() && word.chars().all(char::is_numeric) {
        fv.insert("is_digit", 1.0);
    }
    if word.chars().any(char::is_numeric) {
        fv.insert("has_digit", 1.0);
    }
    if word.contains('-') {
        fv.insert("has_hyphen", 1.0);
    }
    if word.contains('.') {
        fv.insert("has_period", 1.0);
    }
    if graphemes.len() == 1 && !word.chars().any(char::is_alphanumeric) {
        fv.insert("is_punctuation", 1.0);
    }

    // Posição na sequência
    if i == 0 {
        fv.insert("is_first", 1.0);
    }
    if i + 1 == forms.len() {
        fv.insert("is_last", 1.0);
    }

    // === Features de contexto ===
    if i > 0 {
        let prev = forms[i - 1];
        fv.insert(format!("prev_word={}", prev.to_lowercase()), 1.0);
        if starts_uppercase(prev) {
            fv.insert("prev_is_capitalized", 1.0);
        }
    } else {
        fv.insert("BOS", 1.0);
    }
    if i > 1 {
        fv.insert(format!("prev2_word={}", forms[i - 2].to_lowercase()), 1.0);
    }
    if i + 1 < forms.len() {
        let next = forms[i + 1];
        fv.insert(format!("next_word={}", next.to_lowercase()), 1.0);
        if starts_uppercase(next) {
            fv.insert("next_is_capitalized", 1.0);
        }
    } else {
        fv.insert("EOS", 1.0);
    }
    if i + 2 < forms.len() {
        fv.insert(format!("next2_word={}", forms[i + 2].to_lowercase()), 1.0);
    }
    if i > 0 && i + 1 < forms.len() {
        let bigram = format!(
            "bigram={}_{}",
            forms[i - 1].to_lowercase(),
            forms[i + 1].to_lowercase()
        );
        fv.insert(bigram, 1.0);
    }

    // === Features de Gazetteer ===
    for category in gazetteers.categories_of(word) {
        fv.insert(format!("in_gazetteer={category}"), 1.0);
    }

    fv
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().map(char::is_uppercase).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Sentence, Token};

    #[test]
    fn test_capitalization_feature() {
        let features = extract_features(&["Obama", "spoke"], &Gazetteers::default());
        assert_eq!(features[0].get("is_capitalized"), Some(1.0));
        assert!(features[1].get("is_capitalized").is_none());
    }

    #[test]
    fn test_prefix_suffix_features() {
        let features = extract_features(&["Paris"], &Gazetteers::default());
        assert!(features[0].contains("prefix2=pa"));
        assert!(features[0].contains("suffix3=ris"));
    }

    #[test]
    fn test_grapheme_affixes() {
        // "é" decomposto (e + acento combinante) conta como um grafema
        let features = extract_features(&["Jose\u{301}"], &Gazetteers::default());
        assert!(features[0].contains("suffix2=se\u{301}"));
    }

    #[test]
    fn test_context_features() {
        let features = extract_features(&["president", "Obama", "visited"], &Gazetteers::default());
        let obama = &features[1];
        assert!(obama.contains("prev_word=president"));
        assert!(obama.contains("next_word=visited"));
        assert!(obama.contains("bigram=president_visited"));
        assert!(features[0].contains("BOS"));
        assert!(features[2].contains("EOS"));
    }

    #[test]
    fn test_word_shape() {
        assert_eq!(word_shape("Barack", None), "Xxxxxx");
        assert_eq!(word_shape("U.S.", None), "X.X.");
        assert_eq!(word_shape("1984", None), "9999");
        assert_eq!(word_shape("Barack", Some(1)), "Xxx");
        assert_eq!(word_shape("Barack", Some(0)), "Xx");
        assert_eq!(word_shape("McDonald's", Some(0)), "XxXx'x");
        assert_eq!(word_shape("Zürich", None), "Xüxxxx");
    }

    #[test]
    fn test_gazetteer_feature() {
        let mut gaz = Gazetteers::default();
        gaz.insert("LOC", "Paris");
        let features = extract_features(&["paris", "is"], &gaz);
        assert_eq!(features[0].get("in_gazetteer=LOC"), Some(1.0));
        assert!(features[1].get("in_gazetteer=LOC").is_none());
    }

    #[test]
    fn test_gazetteer_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("PER.txt"), "Barack Obama\nObama\n\n").unwrap();
        std::fs::write(dir.path().join(".hidden"), "ignored\n").unwrap();
        let gaz = Gazetteers::load_dir(dir.path()).unwrap();
        assert_eq!(gaz.len(), 2);
        assert_eq!(gaz.categories_of("OBAMA"), vec!["PER"]);
        assert!(gaz.categories_of("ignored").is_empty());
    }

    #[test]
    fn test_gazetteer_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("LOC.txt"), "\n\n").unwrap();
        let gaz = Gazetteers::load_dir(dir.path()).unwrap();
        assert!(gaz.is_empty());
        assert_eq!(gaz.len(), 0);
    }

    #[test]
    fn test_annotator_skips_markers() {
        let mut doc = Document::new(
            "doc",
            vec![
                Sentence::marker(),
                Sentence::new(vec![Token::new("Paris", "B-LOC"), Token::new(".", "O")]),
            ],
        );
        ContextualAnnotator::default().annotate(&mut doc).unwrap();
        assert!(doc.token(0, 0).unwrap().features().is_none());
        let fv = doc.token(1, 0).unwrap().features().unwrap();
        assert!(fv.contains("word=paris"));
        // O contexto não atravessa o marcador
        assert!(fv.contains("BOS"));
        assert!(doc.token(1, 1).unwrap().features().is_some());
    }
}
