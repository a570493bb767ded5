//! ner-tag: rotula arquivos em formato de colunas com o decodificador em cascata.
//!
//! ```bash
//! # Um arquivo
//! ner-tag annotate test.txt test.tagged
//!
//! # Todos os arquivos de um diretório
//! ner-tag --config tagger.toml annotate corpus/ saida/
//! ```
//!
//! O status de saída é diferente de zero quando a configuração ou o modelo não
//! podem ser carregados, ou quando algum arquivo falha.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use cascade_core::{BatchTagger, TaggerConfig, TaggingPipeline};
use clap::{Args, Parser, Subcommand};

mod logging;

/// Arquivo procurado no diretório atual quando `--config` não é informado.
const DEFAULT_CONFIG: &str = "ner-tag.toml";

#[derive(Parser, Debug)]
#[command(name = "ner-tag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Logs em nível debug
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Logs em JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Arquivo de configuração TOML
    #[arg(short, long, global = true, env = "NER_TAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rotula um arquivo ou todos os arquivos de um diretório
    Annotate(AnnotateArgs),
}

#[derive(Args, Debug)]
struct AnnotateArgs {
    /// Arquivo ou diretório de entrada
    input: PathBuf,

    /// Arquivo (ou diretório, se a entrada for diretório) de saída
    output: PathBuf,

    /// Processa os arquivos do diretório em paralelo
    #[arg(long)]
    parallel: bool,

    /// Tamanho da janela do estágio 1 vista pelo estágio 2
    #[arg(long)]
    window: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    logging::init_from_config(&config.logging, cli.verbose, cli.json_logs);

    tracing::debug!("ner-tag v{}", cascade_core::VERSION);
    match &cli.config {
        Some(path) => tracing::debug!(config = %path.display(), "configuration loaded"),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            tracing::debug!(config = DEFAULT_CONFIG, "configuration loaded")
        }
        None => tracing::debug!("no configuration file, using defaults"),
    }

    match cli.command {
        Commands::Annotate(args) => annotate(config, &args),
    }
}

/// `--config`/`NER_TAG_CONFIG` precisa existir; `./ner-tag.toml` é opcional.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<TaggerConfig> {
    let shown = explicit.unwrap_or(Path::new(DEFAULT_CONFIG));
    TaggerConfig::load_or_default(explicit, Path::new(DEFAULT_CONFIG))
        .with_context(|| format!("failed to load config {}", shown.display()))
}

fn annotate(mut config: TaggerConfig, args: &AnnotateArgs) -> anyhow::Result<()> {
    if args.parallel {
        config.batch.parallel = true;
    }
    if let Some(window) = args.window {
        config.decoder.window = window;
    }
    config.validate()?;

    let pipeline = TaggingPipeline::from_config(&config).context("failed to load model")?;
    let report = BatchTagger::new(pipeline, config.batch.clone())
        .run(&args.input, &args.output)
        .with_context(|| format!("cannot process {}", args.input.display()))?;

    for (item, error) in report.failures() {
        tracing::error!(input = %item.input.display(), "{error}");
    }
    tracing::info!(
        files = report.len(),
        failed = report.failed(),
        tokens = report.total_tokens(),
        output = %args.output.display(),
        "done"
    );

    if report.failed() > 0 {
        bail!("{} of {} files failed", report.failed(), report.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_annotate() {
        let cli = Cli::try_parse_from([
            "ner-tag", "-v", "annotate", "in", "out", "--window", "3", "--config", "t.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("t.toml")));
        let Commands::Annotate(args) = cli.command;
        assert_eq!(args.input, PathBuf::from("in"));
        assert_eq!(args.window, Some(3));
        assert!(!args.parallel);
    }

    #[test]
    fn test_annotate_requires_paths() {
        assert!(Cli::try_parse_from(["ner-tag", "annotate", "in"]).is_err());
    }

    #[test]
    fn test_explicit_missing_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("typo.toml");
        let err = load_config(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("typo.toml"));
        assert!(matches!(
            err.downcast_ref::<cascade_core::ConfigError>(),
            Some(cascade_core::ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_explicit_config_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagger.toml");
        std::fs::write(&path, "[decoder]\nwindow = 4\n").unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().decoder.window, 4);
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let args = AnnotateArgs {
            input: "in".into(),
            output: "out".into(),
            parallel: false,
            window: Some(0),
        };
        let err = annotate(TaggerConfig::default(), &args).unwrap_err();
        assert!(err.to_string().contains("window"));
    }

    #[test]
    fn test_missing_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TaggerConfig::default();
        config.model.stage1 = dir.path().join("absent1.json");
        config.model.stage2 = dir.path().join("absent2.json");
        let args = AnnotateArgs {
            input: dir.path().into(),
            output: dir.path().join("out"),
            parallel: false,
            window: None,
        };
        let err = annotate(config, &args).unwrap_err();
        assert!(err.to_string().contains("failed to load model"));
    }
}
