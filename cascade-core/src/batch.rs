//! # Processamento em Lote
//!
//! Enumera as unidades de trabalho e executa o pipeline em cada uma:
//!
//! - **Arquivo**: uma única unidade, gravada no caminho de saída informado.
//! - **Diretório**: cada entrada direta que não começa com `.` e é um arquivo
//!   (subdiretórios são ignorados), em ordem de nome, gravada em
//!   `<saída>/<nome>`. O diretório de saída é criado se não existir.
//!
//! A falha de um arquivo não interrompe os demais: o [`BatchReport`] tem
//! sempre um [`FileOutcome`] por unidade enumerada.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::BatchConfig;
use crate::error::{TaggingError, TaggingResult};
use crate::pipeline::{TaggedOutput, TaggingPipeline};

/// Um par entrada → saída.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Números de um arquivo processado com sucesso.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileSummary {
    pub documents: usize,
    pub tokens: usize,
    pub repaired: usize,
    pub missing_features: usize,
}

impl From<&TaggedOutput> for FileSummary {
    fn from(output: &TaggedOutput) -> Self {
        Self {
            documents: output.documents,
            tokens: output.report.tokens,
            repaired: output.report.repaired,
            missing_features: output.report.missing_features().len(),
        }
    }
}

#[derive(Debug)]
pub struct FileOutcome {
    pub item: WorkItem,
    pub result: Result<FileSummary, TaggingError>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Resultado do lote, na ordem de enumeração.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&WorkItem, &TaggingError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.item, e)))
    }

    pub fn total_tokens(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|s| s.tokens)
            .sum()
    }
}

/// Lista as unidades de trabalho para `input`.
///
/// Não cria nada no disco; falha apenas se `input` não puder ser lido.
pub fn plan_batch(input: &Path, output: &Path) -> TaggingResult<Vec<WorkItem>> {
    let io_err = |source| TaggingError::Io {
        path: input.to_path_buf(),
        source,
    };
    let metadata = std::fs::metadata(input).map_err(io_err)?;
    if !metadata.is_dir() {
        return Ok(vec![WorkItem {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        }]);
    }

    let mut items = Vec::new();
    for entry in std::fs::read_dir(input).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "skipping non-file entry");
            continue;
        }
        items.push(WorkItem {
            input: path,
            output: output.join(&name),
        });
    }
    items.sort_by(|a, b| a.input.file_name().cmp(&b.input.file_name()));
    Ok(items)
}

/// Executa o pipeline sobre um arquivo ou diretório.
pub struct BatchTagger {
    pipeline: TaggingPipeline,
    config: BatchConfig,
}

impl BatchTagger {
    pub fn new(pipeline: TaggingPipeline, config: BatchConfig) -> Self {
        Self { pipeline, config }
    }

    /// Processa todas as unidades de `input`.
    ///
    /// Só devolve erro quando a enumeração falha (entrada inexistente ou
    /// diretório de saída impossível de criar); falhas por arquivo ficam no
    /// relatório.
    pub fn run(&self, input: &Path, output: &Path) -> TaggingResult<BatchReport> {
        let items = plan_batch(input, output)?;
        if input.is_dir() {
            std::fs::create_dir_all(output).map_err(|source| TaggingError::Io {
                path: output.to_path_buf(),
                source,
            })?;
        }
        tracing::info!(
            input = %input.display(),
            files = items.len(),
            parallel = self.config.parallel,
            "starting batch"
        );

        let outcomes: Vec<FileOutcome> = if self.config.parallel {
            items.into_par_iter().map(|item| self.process(item)).collect()
        } else {
            items.into_iter().map(|item| self.process(item)).collect()
        };
        let report = BatchReport { outcomes };

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            tokens = report.total_tokens(),
            "batch finished"
        );
        Ok(report)
    }

    fn process(&self, item: WorkItem) -> FileOutcome {
        let result = self
            .pipeline
            .tag_file(&item.input, &item.output)
            .map(|tagged| FileSummary::from(&tagged));
        match &result {
            Ok(summary) => tracing::debug!(
                input = %item.input.display(),
                tokens = summary.tokens,
                missing_features = summary.missing_features,
                "file tagged"
            ),
            Err(e) => tracing::warn!(input = %item.input.display(), error = %e, "file failed"),
        }
        FileOutcome { item, result }
    }
}
