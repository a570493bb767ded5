//! # Pipeline de Etiquetagem
//!
//! Coordena uma unidade de trabalho completa:
//!
//! ```text
//! texto → leitor de colunas → anotador de features → decodificador → formatador
//! ```
//!
//! A saída só é gravada depois que a decodificação termina com sucesso, e a
//! gravação passa por um arquivo temporário irmão seguido de `rename`, então um
//! arquivo de saída nunca fica pela metade.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::TaggerConfig;
use crate::corpus::Corpus;
use crate::decoder::{CascadeDecoder, DecodeReport};
use crate::error::{ConfigError, DecodeError, TaggingError, TaggingResult};
use crate::features::{ContextualAnnotator, FeatureAnnotator, Gazetteers};
use crate::formatter::format_corpus;
use crate::model::CascadeModel;
use crate::reader::{parse_conll, read_conll_file};

/// Resultado de uma unidade de trabalho.
#[derive(Debug, Clone)]
pub struct TaggedOutput {
    /// Texto no formato `forma gold predição`
    pub text: String,
    pub documents: usize,
    pub report: DecodeReport,
}

/// Anotador e decodificador prontos para processar arquivos.
#[derive(Clone)]
pub struct TaggingPipeline {
    annotator: Arc<dyn FeatureAnnotator>,
    decoder: CascadeDecoder,
}

impl TaggingPipeline {
    pub fn new(annotator: impl FeatureAnnotator + 'static, decoder: CascadeDecoder) -> Self {
        Self {
            annotator: Arc::new(annotator),
            decoder,
        }
    }

    /// Carrega modelo e gazetteers conforme a configuração.
    pub fn from_config(config: &TaggerConfig) -> Result<Self, ConfigError> {
        let model = CascadeModel::load(&config.model)?;
        let gazetteers = match &config.features.gazetteers_dir {
            Some(dir) => {
                let gazetteers = Gazetteers::load_dir(dir)?;
                if gazetteers.is_empty() {
                    tracing::warn!(dir = %dir.display(), "gazetteer directory has no entries");
                }
                gazetteers
            }
            None => Gazetteers::new(),
        };
        tracing::debug!(entries = gazetteers.len(), "gazetteers ready");
        let annotator = ContextualAnnotator::new(gazetteers)
            .with_shape_max_repeats(config.features.shape_max_repeats);
        Ok(Self::new(annotator, model.decoder(config.decoder)))
    }

    pub fn decoder(&self) -> &CascadeDecoder {
        &self.decoder
    }

    /// Processa texto em memória. `source` identifica a origem nos erros.
    pub fn tag_text(&self, text: &str, source: &Path) -> TaggingResult<TaggedOutput> {
        let corpus = parse_conll(text, source)?;
        self.tag_corpus(corpus, source)
    }

    /// Processa `input` e grava o resultado em `output` (sobrescrevendo).
    pub fn tag_file(&self, input: &Path, output: &Path) -> TaggingResult<TaggedOutput> {
        let corpus = read_conll_file(input)?;
        let tagged = self.tag_corpus(corpus, input)?;
        write_atomic(output, &tagged.text)?;
        Ok(tagged)
    }

    fn tag_corpus(&self, mut corpus: Corpus, source: &Path) -> TaggingResult<TaggedOutput> {
        let decode_err = |source_err: DecodeError| TaggingError::Decode {
            path: source.to_path_buf(),
            source: source_err,
        };

        for document in corpus.documents_mut() {
            self.annotator
                .annotate(document)
                .map_err(|e| decode_err(e.into()))?;
        }
        let report = self.decoder.decode_corpus(&mut corpus).map_err(decode_err)?;

        for warning in &report.warnings {
            tracing::warn!(source = %source.display(), "{warning}");
        }
        Ok(TaggedOutput {
            text: format_corpus(&corpus),
            documents: corpus.documents().len(),
            report,
        })
    }
}

/// Grava o conteúdo inteiro em um temporário ao lado do destino e renomeia.
pub(crate) fn write_atomic(path: &Path, content: &str) -> TaggingResult<()> {
    let io_err = |source| TaggingError::Io {
        path: path.to_path_buf(),
        source,
    };
    let tmp = temp_sibling(path);
    let written = std::fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(content.as_bytes())?;
        file.sync_all()
    });
    if let Err(e) = written.and_then(|()| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(e));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{LinearClassifier, Stage2Context};
    use crate::decoder::DecoderConfig;
    use crate::features::FeatureVector;
    use crate::tagger::{LabelSet, Tag};

    // Estágio 1: palavras capitalizadas viram B-PER; estágio 2 copia o estágio 1
    // e continua a entidade quando o token anterior já é PER.
    fn pipeline() -> TaggingPipeline {
        let labels = LabelSet::from_entity_types(["PER"]);
        let mut stage1 = LinearClassifier::new(labels.clone());
        stage1.set_weight("is_capitalized", &Tag::Begin("PER".into()), 1.0);
        let decoder = CascadeDecoder::new(labels, DecoderConfig::default())
            .with_stage1(stage1)
            .with_stage2(|ctx: &Stage2Context<'_>| {
                match (ctx.stage1_at(0), ctx.previous()) {
                    (Some(Tag::Begin(_)), Some(prev)) if !prev.is_outside() => {
                        Tag::Inside("PER".into())
                    }
                    (Some(tag), _) => tag.clone(),
                    (None, _) => Tag::Outside,
                }
            });
        TaggingPipeline::new(ContextualAnnotator::default(), decoder)
    }

    #[test]
    fn test_tag_text() {
        let text = "-DOCSTART- -X- O\n\nBarack B-PER\nObama I-PER\nspoke O\n";
        let out = pipeline().tag_text(text, Path::new("mem")).unwrap();
        assert_eq!(
            out.text,
            "-DOCSTART-\n\nBarack B-PER B-PER\nObama I-PER I-PER\nspoke O O\n\n"
        );
        assert_eq!(out.documents, 1);
        assert_eq!(out.report.tokens, 3);
    }

    #[test]
    fn test_tag_file_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        std::fs::write(&input, "Anna\nsings\n").unwrap();
        std::fs::write(&output, "stale").unwrap();

        let out = pipeline().tag_file(&input, &output).unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "Anna  B-PER\nsings  O\n\n");
        assert_eq!(out.report.sentences, 1);
        // Nenhum temporário sobra ao lado da saída
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_malformed_input_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        std::fs::write(&input, "Anna NAME\n").unwrap();

        let err = pipeline().tag_file(&input, &output).unwrap_err();
        assert!(matches!(err, TaggingError::MalformedInput { .. }));
        assert_eq!(err.path(), input.as_path());
        assert!(!output.exists());
    }

    #[test]
    fn test_uninitialized_decoder_fails_unit() {
        let decoder = CascadeDecoder::new(LabelSet::default(), DecoderConfig::default())
            .with_stage1(|_: &FeatureVector| Tag::Outside);
        let pipeline = TaggingPipeline::new(ContextualAnnotator::default(), decoder);
        let err = pipeline.tag_text("a O\n", Path::new("mem")).unwrap_err();
        assert!(matches!(
            err,
            TaggingError::Decode {
                source: DecodeError::NotInitialized(_),
                ..
            }
        ));
    }

    #[test]
    fn test_unwritable_output_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        std::fs::write(&input, "a O\n").unwrap();
        let output = dir.path().join("missing").join("out.txt");
        let err = pipeline().tag_file(&input, &output).unwrap_err();
        assert!(matches!(err, TaggingError::Io { .. }));
    }
}
