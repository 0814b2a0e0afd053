//! Rolldown plugin that documents React components at build time
//!
//! For every in-scope `.tsx` module the plugin extracts prop documentation
//! from a long-lived type-analysis session and appends `displayName` and
//! `__docgenInfo` assignments to the module text, the way Storybook's
//! docgen loaders do.
//!
//! ## Architecture
//!
//! ```text
//! construction → spawn session init (tsconfig discovery + program build)
//!                                ↓
//! transform(id, code) → await session → scope filter → extract → generate
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fob_docgen::Options;
//! use fob_plugin_react_docgen::FobReactDocgenPlugin;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = Options::new().with_tsconfig_path("tsconfig.app.json");
//! let plugin = Arc::new(FobReactDocgenPlugin::with_options(options, PathBuf::from("."))?);
//! # Ok(())
//! # }
//! ```

use rolldown_plugin::{
    HookTransformArgs, HookTransformOutput, HookTransformReturn, HookUsage, Plugin,
    SharedTransformPluginContext,
};
use std::borrow::Cow;
use std::path::PathBuf;
use tracing::debug;

mod transform;

pub use fob_docgen::{Options, SessionError};
pub use transform::{DocgenTransformer, TransformOutcome};

/// Rolldown plugin that injects component prop documentation
///
/// The type-analysis session is shared by every clone of the plugin and is
/// initialized exactly once.
#[derive(Clone, Debug)]
pub struct FobReactDocgenPlugin {
    transformer: DocgenTransformer,
}

impl FobReactDocgenPlugin {
    /// Create the plugin with default options
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use fob_plugin_react_docgen::FobReactDocgenPlugin;
    /// use std::path::PathBuf;
    ///
    /// let plugin = FobReactDocgenPlugin::new(PathBuf::from(".")).unwrap();
    /// ```
    pub fn new(project_root: PathBuf) -> Result<Self, SessionError> {
        Self::with_options(Options::default(), project_root)
    }

    /// Create the plugin with custom options
    pub fn with_options(options: Options, project_root: PathBuf) -> Result<Self, SessionError> {
        Ok(Self {
            transformer: DocgenTransformer::new(options, project_root)?,
        })
    }

    /// Wrap an already configured transformer.
    pub fn from_transformer(transformer: DocgenTransformer) -> Self {
        Self { transformer }
    }

    pub fn transformer(&self) -> &DocgenTransformer {
        &self.transformer
    }
}

impl Plugin for FobReactDocgenPlugin {
    /// Returns the plugin name for debugging and logging
    fn name(&self) -> Cow<'static, str> {
        "fob-react-docgen".into()
    }

    /// Only the transform hook is used
    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Transform
    }

    /// Transform hook - appends documentation to in-scope component modules
    ///
    /// # Returns
    ///
    /// - `Ok(Some(output))` - Module documented, or passed through after a per-file failure
    /// - `Ok(None)` - Module out of scope or without documentable components
    /// - `Err(e)` - The type-analysis session could not be created
    fn transform(
        &self,
        _ctx: SharedTransformPluginContext,
        args: &HookTransformArgs<'_>,
    ) -> impl std::future::Future<Output = HookTransformReturn> + Send {
        let id = args.id.to_string();
        let code = args.code.to_string();
        let transformer = self.transformer.clone();

        async move {
            let outcome = transformer
                .transform(&id, &code)
                .await
                .map_err(anyhow::Error::new)?;

            if outcome == TransformOutcome::Unchanged {
                debug!("[fob-react-docgen] passing {} through unchanged", id);
            }

            Ok(outcome.into_code(&code).map(|code| HookTransformOutput {
                code: Some(code),
                map: None,
                side_effects: None,
                module_type: None,
            }))
        }
    }
}
