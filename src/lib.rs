//! # Work Order Intake
//!
//! Identifies which partner company issued an incoming work-order PDF and
//! renders the company-specific prompt for the downstream AI extraction step.
//!
//! ## Core Concepts
//!
//! - **Company Registry**: Declarative catalog of companies and their sub-companies (two levels)
//! - **Prompt Strategy**: A pure function turning a file name and optional context into a prompt
//! - **Classifier**: Resolves a document to exactly one company using hints and configured markers
//! - **Catch-all (`SONOTA`)**: Classification succeeded but matched no specific partner
//! - **Unresolved sentinel (`UNKNOWN_OR_NOT_SET`)**: The document carried no usable evidence
//!
//! The catalog is built once and passed by reference; nothing in the pipeline
//! performs I/O or mutates shared state.
//!
//! ## Example
//!
//! ```rust,ignore
//! use work_order_intake::*;
//!
//! let catalog = IntakeCatalog::bundled()?;
//! let dispatcher = Dispatcher::new(&catalog);
//!
//! let descriptor = DocumentDescriptor::new("kawana-housing_0612.pdf")
//!     .with_text_sample("作業依頼書 川名ハウジング株式会社");
//!
//! let result = dispatcher.resolve_and_render(&descriptor)?;
//! assert_eq!(result.matched_company_id, "KAWANA_KENSETSU_HOUSING");
//! assert!(!result.is_fallback);
//! ```

pub mod catalog;
pub mod classifier;
pub mod dispatcher;
pub mod error;
pub mod prompts;
pub mod registry;
pub mod schema;
pub mod strategy;

pub use catalog::{CatalogBuilder, IntakeCatalog};
pub use classifier::{Classification, Classifier, TieBreak};
pub use dispatcher::Dispatcher;
pub use error::{IntakeError, Result};
pub use prompts::PromptInput;
pub use registry::{CompanyRegistry, SelectionOption};
pub use schema::*;
pub use strategy::{PromptStrategy, StrategyFn, StrategyKind, StrategyTable};

/// Convenience wrapper around [`Dispatcher::resolve_and_render`].
pub fn resolve_and_render(
    catalog: &IntakeCatalog,
    descriptor: &DocumentDescriptor,
) -> Result<ResolutionResult> {
    Dispatcher::new(catalog).resolve_and_render(descriptor)
}
