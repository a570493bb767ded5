//! # Formatação da Saída
//!
//! Projeta um documento decodificado de volta em texto, um token por linha:
//!
//! ```text
//! -DOCSTART-
//!
//! Barack B-PER B-PER
//! Obama I-PER I-PER
//! visited O O
//!
//! ```
//!
//! - Cada linha é `forma gold predição`, separados por um espaço. O gold é
//!   impresso como está (vazio se ausente, o que gera dois espaços seguidos).
//! - Toda sentença termina com uma linha em branco.
//! - Uma sentença marcadora vira uma linha só com o literal do marcador.
//!
//! A formatação não altera o modelo e é idempotente.

use std::fmt::Write as _;

use crate::corpus::{Corpus, Document, Sentence};
use crate::tagger::Tag;

/// Uma linha lida de volta do formato de saída.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaggedLine {
    Token {
        form: String,
        gold: String,
        predicted: String,
    },
    Marker(String),
    SentenceBreak,
}

/// Renderiza um documento decodificado.
pub fn format_document(document: &Document) -> String {
    let mut out = String::new();
    write_document(&mut out, document);
    out
}

/// Renderiza todos os documentos do corpus, em ordem.
pub fn format_corpus(corpus: &Corpus) -> String {
    let mut out = String::new();
    for document in corpus.documents() {
        write_document(&mut out, document);
    }
    out
}

fn write_document(out: &mut String, document: &Document) {
    for sentence in document.sentences() {
        write_sentence(out, sentence);
    }
}

fn write_sentence(out: &mut String, sentence: &Sentence) {
    if sentence.is_marker() {
        out.push_str(sentence.tokens()[0].form());
        out.push('\n');
    } else {
        for token in sentence.tokens() {
            // Token sem predição final sai como O
            let predicted = token.stage2().unwrap_or(&Tag::Outside);
            let _ = writeln!(out, "{} {} {}", token.form(), token.gold(), predicted);
        }
    }
    out.push('\n');
}

/// Lê o formato de saída de volta em linhas.
///
/// Divide cada linha em espaços simples, de modo que um gold vazio
/// (`"forma  B-PER"`) é recuperado como string vazia. Linhas com outra
/// quantidade de campos são devolvidas como erro com o número da linha (1-based).
pub fn parse_tagged(text: &str) -> Result<Vec<TaggedLine>, (usize, String)> {
    let mut lines = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if line.is_empty() {
            lines.push(TaggedLine::SentenceBreak);
            continue;
        }
        let fields: Vec<&str> = line.split(' ').collect();
        match fields.as_slice() {
            [marker] => lines.push(TaggedLine::Marker(marker.to_string())),
            [form, gold, predicted] => lines.push(TaggedLine::Token {
                form: form.to_string(),
                gold: gold.to_string(),
                predicted: predicted.to_string(),
            }),
            _ => return Err((number + 1, line.to_string())),
        }
    }
    Ok(lines)
}
