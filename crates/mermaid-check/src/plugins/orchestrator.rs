//! Check orchestrator coordinating extraction, validation and reporting
//!
//! The orchestrator manages the flow of data through the pipeline:
//! Document → Extractor → Validator (per block) → Report

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, span, warn, Level};

use crate::core::{
    ArtifactDir, CheckError, CheckedBlock, DiagramParser, Extractor, FileFailure, MultiReport,
    Report, Result, Validator, ValidatorConfig, DEFAULT_LANGUAGE,
};
use crate::plugins::mermaid_js::{MermaidJs, MermaidJsConfig};

/// Builds the parser the first time a document has blocks to validate
pub type ParserFactory = Box<dyn FnMut() -> Result<Box<dyn DiagramParser>> + Send>;

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    /// Fence language tag marking diagram blocks
    pub language: String,
    pub validator: ValidatorConfig,
}

impl CheckConfig {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_validator(mut self, validator: ValidatorConfig) -> Self {
        self.validator = validator;
        self
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            validator: ValidatorConfig::default(),
        }
    }
}

/// Orchestrator that turns documents into reports
///
/// The validator is created lazily and at most once: documents without
/// blocks never pay for parser setup, and every later document reuses the
/// same parser.
pub struct Checker {
    extractor: Extractor,
    validator_config: ValidatorConfig,
    factory: ParserFactory,
    validator: Option<Validator>,
    setup_error: Option<String>,
    artifacts: Option<ArtifactDir>,
    documents: usize,
}

impl Checker {
    /// Create a checker whose parser comes from `factory`
    pub fn new<F>(config: CheckConfig, factory: F) -> Self
    where
        F: FnMut() -> Result<Box<dyn DiagramParser>> + Send + 'static,
    {
        Self {
            extractor: Extractor::new(config.language),
            validator_config: config.validator,
            factory: Box::new(factory),
            validator: None,
            setup_error: None,
            artifacts: None,
            documents: 0,
        }
    }

    /// Create a checker around an already constructed parser
    pub fn with_parser(config: CheckConfig, parser: Box<dyn DiagramParser>) -> Self {
        let mut parser = Some(parser);
        Self::new(config, move || {
            parser
                .take()
                .ok_or_else(|| CheckError::setup("parser was already handed out"))
        })
    }

    /// Create a checker backed by mermaid.js
    pub fn mermaid_js(config: CheckConfig, js: MermaidJsConfig) -> Self {
        Self::new(config, move || {
            MermaidJs::setup(&js).map(|parser| Box::new(parser) as Box<dyn DiagramParser>)
        })
    }

    /// Write every checked block into `artifacts`
    pub fn with_artifacts(mut self, artifacts: ArtifactDir) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Hand the artifact directory back so the caller can keep or close it
    pub fn take_artifacts(&mut self) -> Option<ArtifactDir> {
        self.artifacts.take()
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Whether parser setup has already happened
    pub fn is_validator_ready(&self) -> bool {
        self.validator.is_some()
    }

    fn validator(&mut self) -> Result<&mut Validator> {
        if let Some(message) = &self.setup_error {
            return Err(CheckError::setup(message.clone()));
        }
        if self.validator.is_none() {
            info!("Setting up diagram parser");
            match (self.factory)() {
                Ok(parser) => {
                    self.validator =
                        Some(Validator::with_config(parser, self.validator_config.clone()));
                }
                Err(CheckError::Setup { message }) => {
                    self.setup_error = Some(message.clone());
                    return Err(CheckError::Setup { message });
                }
                Err(e) => return Err(e),
            }
        }
        self.validator
            .as_mut()
            .ok_or_else(|| CheckError::setup("parser unavailable"))
    }

    /// Check the document text `text`, reported as `source_file`
    pub fn check_text(&mut self, source_file: &str, text: &str) -> Result<Report> {
        let check_span = span!(Level::INFO, "check_document", source_file);
        let _enter = check_span.enter();

        let blocks = self.extractor.extract(text);
        let mut report = Report::new(source_file);

        if blocks.is_empty() {
            debug!("No diagram blocks, skipping validation");
            return Ok(report);
        }

        let document = self.documents;
        self.documents += 1;

        for block in blocks {
            let file_name = self.artifacts.as_ref().and_then(|artifacts| {
                artifacts
                    .write_block(document, source_file, &block)
                    .map_err(|e| warn!(index = block.index, error = %e, "Block file not written"))
                    .ok()
            });

            let result = self.validator()?.validate(&block.code);
            if !result.is_valid() {
                debug!(index = block.index, line_start = block.line_start, "Invalid block");
            }

            let checked = CheckedBlock::new(block, result);
            report.push(match file_name {
                Some(name) => checked.with_file_name(name),
                None => checked,
            });
        }

        info!(
            total = report.total_blocks(),
            valid = report.valid_count(),
            invalid = report.invalid_count(),
            "Document checked"
        );
        Ok(report)
    }

    /// Read and check the document at `path`
    pub fn check_document(&mut self, path: &Path) -> Result<Report> {
        let text = fs::read_to_string(path).map_err(|source| CheckError::io(path, source))?;
        self.check_text(&path.display().to_string(), &text)
    }

    /// Check several documents, continuing past unreadable ones
    ///
    /// Parser setup failure aborts the whole run.
    pub fn check_documents(&mut self, paths: &[PathBuf]) -> Result<MultiReport> {
        let run_span = span!(Level::INFO, "check_documents", count = paths.len());
        let _enter = run_span.enter();

        let mut files = Vec::with_capacity(paths.len());
        let mut failures = Vec::new();

        for path in paths {
            match self.check_document(path) {
                Ok(report) => files.push(report),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not check document");
                    failures.push(FileFailure {
                        source_file: path.display().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(MultiReport::new(files, failures))
    }
}
