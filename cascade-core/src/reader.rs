//! # Leitor de Colunas (formato CoNLL)
//!
//! Segmenta um arquivo em documentos, sentenças e tokens:
//!
//! ```text
//! -DOCSTART- -X- -X- O
//!
//! Barack NNP B-PER
//! Obama NNP I-PER
//!
//! ```
//!
//! - Um token por linha, colunas separadas por espaço em branco.
//! - A forma é a primeira coluna; o label gold é a última, quando há ao menos
//!   duas colunas (senão fica vazio).
//! - Linhas em branco terminam a sentença; brancos repetidos são tolerados.
//! - Uma linha cuja forma é `-DOCSTART-` vira uma sentença marcadora e abre um
//!   novo documento.

use std::path::Path;

use crate::corpus::{Corpus, Document, Sentence, Token, DOCSTART};
use crate::error::{TaggingError, TaggingResult};
use crate::tagger::Tag;

/// Lê e segmenta um arquivo do disco.
///
/// Arquivos que não são UTF-8 válido são tratados como entrada malformada.
pub fn read_conll_file(path: &Path) -> TaggingResult<Corpus> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::InvalidData {
            TaggingError::MalformedInput {
                path: path.to_path_buf(),
                line: 0,
                message: "input is not valid UTF-8".to_string(),
            }
        } else {
            TaggingError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    parse_conll(&text, path)
}

/// Segmenta texto em formato de colunas. `source` identifica os documentos.
pub fn parse_conll(text: &str, source: &Path) -> TaggingResult<Corpus> {
    let malformed = |line: usize, message: String| TaggingError::MalformedInput {
        path: source.to_path_buf(),
        line,
        message,
    };

    let mut corpus = Corpus::new();
    let mut sentences: Vec<Sentence> = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut tokens = 0usize;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let columns: Vec<&str> = raw.split_whitespace().collect();

        let Some(&form) = columns.first() else {
            if !current.is_empty() {
                sentences.push(Sentence::new(std::mem::take(&mut current)));
            }
            continue;
        };

        if form == DOCSTART {
            if !current.is_empty() {
                return Err(malformed(
                    line,
                    "document marker inside a sentence".to_string(),
                ));
            }
            if !sentences.is_empty() {
                corpus.push(Document::new(source, std::mem::take(&mut sentences)));
            }
            sentences.push(Sentence::marker());
            continue;
        }

        let gold = match columns.as_slice() {
            [_, .., last] => *last,
            _ => "",
        };
        if !gold.is_empty() && Tag::from_label(gold).is_none() {
            return Err(malformed(line, format!("invalid BIO label {gold:?}")));
        }
        current.push(Token::new(form, gold));
        tokens += 1;
    }

    if !current.is_empty() {
        sentences.push(Sentence::new(current));
    }
    if !sentences.is_empty() {
        corpus.push(Document::new(source, sentences));
    }
    if tokens == 0 {
        return Err(malformed(0, "no tokens found".to_string()));
    }

    tracing::debug!(
        source = %source.display(),
        documents = corpus.documents().len(),
        tokens,
        "input segmented"
    );
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> TaggingResult<Corpus> {
        parse_conll(text, Path::new("input.txt"))
    }

    #[test]
    fn test_sentences_and_gold_labels() {
        let corpus = parse("Barack NNP B-PER\nObama NNP I-PER\n\nParis B-LOC\n").unwrap();
        assert_eq!(corpus.documents().len(), 1);
        let doc = &corpus.documents()[0];
        assert_eq!(doc.sentences().len(), 2);
        assert_eq!(doc.sentence(0).unwrap().forms(), vec!["Barack", "Obama"]);
        assert_eq!(doc.token(0, 1).unwrap().gold(), "I-PER");
        assert_eq!(doc.token(1, 0).unwrap().gold(), "B-LOC");
        assert_eq!(doc.source(), Path::new("input.txt"));
    }

    #[test]
    fn test_single_column_has_empty_gold() {
        let corpus = parse("Hello\nworld\n").unwrap();
        let doc = &corpus.documents()[0];
        assert_eq!(doc.token(0, 0).unwrap().gold(), "");
        assert_eq!(doc.token_count(), 2);
    }

    #[test]
    fn test_docstart_opens_documents() {
        let text = "-DOCSTART- -X- -X- O\n\nA O\n\nB O\n\n-DOCSTART- -X- -X- O\n\nC O\n";
        let corpus = parse(text).unwrap();
        assert_eq!(corpus.documents().len(), 2);

        let first = &corpus.documents()[0];
        assert!(first.sentence(0).unwrap().is_marker());
        assert_eq!(first.sentences().len(), 3);
        let second = &corpus.documents()[1];
        assert!(second.sentence(0).unwrap().is_marker());
        assert_eq!(second.token(1, 0).unwrap().form(), "C");
        assert_eq!(second.index(), 1);
    }

    #[test]
    fn test_tolerates_extra_blank_lines() {
        let corpus = parse("\n\nA O\n\n\n\nB O\n\n\n").unwrap();
        assert_eq!(corpus.documents()[0].sentences().len(), 2);
    }

    #[test]
    fn test_marker_inside_sentence_is_malformed() {
        let err = parse("A O\n-DOCSTART- O\n").unwrap_err();
        assert!(matches!(err, TaggingError::MalformedInput { line: 2, .. }));
    }

    #[test]
    fn test_invalid_label_is_malformed() {
        let err = parse("A O\nB PERSON\n").unwrap_err();
        match err {
            TaggingError::MalformedInput { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("PERSON"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_input_is_malformed() {
        assert!(matches!(
            parse("\n\n"),
            Err(TaggingError::MalformedInput { line: 0, .. })
        ));
        assert!(parse("-DOCSTART- -X- O\n\n").is_err());
    }

    #[test]
    fn test_non_utf8_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        std::fs::write(&path, [0x50, 0x61, 0x72, 0xed, 0x73, b'\n']).unwrap();
        assert!(matches!(
            read_conll_file(&path),
            Err(TaggingError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_failure() {
        let err = read_conll_file(Path::new("/nonexistent/input.txt")).unwrap_err();
        assert!(matches!(err, TaggingError::Io { .. }));
    }
}
