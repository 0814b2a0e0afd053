//! Host-independent transform pipeline.
//!
//! Every call awaits the shared session, filters the id, extracts component
//! records and appends the generated block. Only a failed session reaches the
//! caller as an error; per-file failures leave the source unchanged.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fob_docgen::{
    ComponentDocParser, DocgenCodeBlock, DocgenCodeGenerator, GenerateRequest, Options,
    ReactDocgenParser, ResolvedConfig, ScopeFilter, SessionError, TypeAnalysisSession, resolve,
};
use tokio::sync::OnceCell;
use tracing::debug;

type SessionCell = OnceCell<Result<Arc<TypeAnalysisSession>, SessionError>>;

/// Result of transforming one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    /// Out of scope, or no documentable component; the host handles the file.
    Skipped,
    /// Extraction or generation failed; the original text is passed through.
    Unchanged,
    /// The original text with the documentation block appended.
    Transformed(String),
}

impl TransformOutcome {
    /// The module text to hand back to the host, if any.
    pub fn into_code(self, original: &str) -> Option<String> {
        match self {
            Self::Skipped => None,
            Self::Unchanged => Some(original.to_string()),
            Self::Transformed(code) => Some(code),
        }
    }
}

/// Coordinates the session, the scope filter, the extractor and the generator.
///
/// Cloning is cheap and every clone shares the same session.
#[derive(Clone)]
pub struct DocgenTransformer {
    config: Arc<ResolvedConfig>,
    filter: Arc<ScopeFilter>,
    project_root: PathBuf,
    parser: Arc<dyn ComponentDocParser>,
    generator: Arc<dyn DocgenCodeGenerator>,
    session: Arc<SessionCell>,
}

impl DocgenTransformer {
    /// Resolve `options` and start building the session.
    ///
    /// When called inside a tokio runtime the session is built in the
    /// background right away; otherwise it is built by the first
    /// [`transform`](Self::transform). Invalid include/exclude patterns fail
    /// here.
    pub fn new(options: Options, project_root: PathBuf) -> Result<Self, SessionError> {
        let project_root = std::path::absolute(&project_root).unwrap_or(project_root);
        let config = resolve(options);
        let filter = ScopeFilter::from_options(&config.extractor_options, &project_root)?;
        let parser = ReactDocgenParser::new(config.extractor_options.clone());
        let generator = DocgenCodeBlock::new(project_root.clone());

        let transformer = Self {
            config: Arc::new(config),
            filter: Arc::new(filter),
            project_root,
            parser: Arc::new(parser),
            generator: Arc::new(generator),
            session: Arc::new(OnceCell::new()),
        };
        transformer.start_session();
        Ok(transformer)
    }

    /// Replace the documentation extractor.
    pub fn with_parser(mut self, parser: Arc<dyn ComponentDocParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Replace the code generator.
    pub fn with_generator(mut self, generator: Arc<dyn DocgenCodeGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Wait for the shared session.
    ///
    /// Every caller receives the same session, or the same error.
    pub async fn session(&self) -> Result<Arc<TypeAnalysisSession>, SessionError> {
        initialize(&self.session, &self.project_root, &self.config)
            .await
            .clone()
    }

    /// Transform one module.
    pub async fn transform(&self, id: &str, code: &str) -> Result<TransformOutcome, SessionError> {
        let session = self.session().await?;

        if !self.filter.matches(id) {
            return Ok(TransformOutcome::Skipped);
        }

        let provider = session.program_provider();
        let components = match self
            .parser
            .parse_with_program_provider(Path::new(id), &provider)
        {
            Ok(components) => components,
            Err(error) => {
                debug!("[fob-react-docgen] extraction failed for {}: {}", id, error);
                return Ok(TransformOutcome::Unchanged);
            }
        };
        if components.is_empty() {
            debug!("[fob-react-docgen] no components documented in {}", id);
            return Ok(TransformOutcome::Skipped);
        }

        let request = GenerateRequest {
            id,
            source: code,
            components: &components,
            options: &self.config.generate_options,
        };
        match self.generator.generate(request) {
            Ok(output) => {
                debug!(
                    "[fob-react-docgen] documented {} component(s) in {}",
                    components.len(),
                    id
                );
                Ok(TransformOutcome::Transformed(output))
            }
            Err(error) => {
                debug!("[fob-react-docgen] generation failed for {}: {}", id, error);
                Ok(TransformOutcome::Unchanged)
            }
        }
    }

    fn start_session(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let cell = Arc::clone(&self.session);
        let project_root = self.project_root.clone();
        let config = Arc::clone(&self.config);
        handle.spawn(async move {
            initialize(&cell, &project_root, &config).await;
        });
    }
}

impl std::fmt::Debug for DocgenTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocgenTransformer")
            .field("project_root", &self.project_root)
            .field("config", &self.config)
            .field("session_ready", &self.session.initialized())
            .finish()
    }
}

async fn initialize<'a>(
    cell: &'a SessionCell,
    project_root: &Path,
    config: &Arc<ResolvedConfig>,
) -> &'a Result<Arc<TypeAnalysisSession>, SessionError> {
    cell.get_or_init(|| {
        let project_root = project_root.to_path_buf();
        let config = Arc::clone(config);
        async move {
            let built = tokio::task::spawn_blocking(move || {
                TypeAnalysisSession::new(&project_root, &config)
            })
            .await;
            match built {
                Ok(Ok(session)) => Ok(Arc::new(session)),
                Ok(Err(error)) => Err(error),
                Err(error) => Err(SessionError::Initialization {
                    message: error.to_string(),
                }),
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_maps_to_host_code() {
        assert_eq!(TransformOutcome::Skipped.into_code("src"), None);
        assert_eq!(
            TransformOutcome::Unchanged.into_code("src"),
            Some("src".to_string())
        );
        assert_eq!(
            TransformOutcome::Transformed("out".to_string()).into_code("src"),
            Some("out".to_string())
        );
    }

    #[test]
    fn invalid_patterns_fail_construction() {
        let options = Options::new().with_include(["src/["]);
        let error = DocgenTransformer::new(options, PathBuf::from("/project")).unwrap_err();
        assert!(matches!(error, SessionError::InvalidPattern { .. }));
    }

    #[test]
    fn construction_outside_a_runtime_is_lazy() {
        let transformer = DocgenTransformer::new(Options::new(), PathBuf::from("/project")).unwrap();
        assert!(!transformer.session.initialized());
    }
}
