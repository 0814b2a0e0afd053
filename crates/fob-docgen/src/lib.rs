#![deny(clippy::all)]

//! React component prop documentation for the Fob bundler.
//!
//! This crate provides:
//! - Option resolution with the Storybook-compatible default table.
//! - A scope filter deciding which module ids are documented.
//! - A type-analysis session that discovers the project's `tsconfig.json`,
//!   analyses every member file with OXC and keeps the result fresh.
//! - An extractor producing one [`ComponentDoc`] per exported component.
//! - A generator appending `displayName`/`__docgenInfo` assignments to the
//!   module text.
//!
//! The bundler-facing plugin lives in `fob-plugin-react-docgen`.

pub mod error;
pub mod extractor;
pub mod filter;
pub mod generate;
pub mod jsdoc;
pub mod model;
pub mod options;
pub mod program;
pub mod session;

pub use error::{DocgenError, Result, SessionError};
pub use extractor::{ComponentDocParser, ReactDocgenParser};
pub use filter::{ScopeFilter, normalize_id};
pub use generate::{DocgenCodeBlock, DocgenCodeGenerator, GenerateRequest};
pub use model::{
    ComponentDoc, DefaultValue, EnumValue, ParentType, PropItem, PropItemType, SourceLocation,
};
pub use options::{
    CompilerOptions, ExtractorOptions, GenerateOptions, Options, PropFilter, ResolvedConfig,
    resolve,
};
pub use program::{Program, SourceFile};
pub use session::TypeAnalysisSession;
