use crate::catalog::IntakeCatalog;
use crate::error::{IntakeError, Result};
use crate::schema::{DocumentDescriptor, ResolutionResult};
use log::{debug, error};

/// Classifies a document, looks up its company's strategy and renders the prompt.
///
/// Holds only a shared reference to the catalog; resolution performs no I/O and
/// mutates nothing, so one dispatcher can serve many threads.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a> {
    catalog: &'a IntakeCatalog,
}

impl<'a> Dispatcher<'a> {
    pub fn new(catalog: &'a IntakeCatalog) -> Self {
        Self { catalog }
    }

    pub fn resolve_and_render(&self, descriptor: &DocumentDescriptor) -> Result<ResolutionResult> {
        let classification = self.catalog.classifier().classify(descriptor);
        let company_id = classification.company_id.as_str();

        let record = self
            .catalog
            .registry()
            .get_by_id(company_id)
            .map_err(|e| internal_consistency(company_id, e))?;

        let strategy = self
            .catalog
            .strategies()
            .get_strategy(company_id)
            .map_err(|e| internal_consistency(company_id, e))?;

        let prompt_text = strategy.render(&descriptor.file_name, descriptor.context.as_ref());

        debug!(
            "Resolved {:?} to {} via {:?} (fallback: {}, strategy: {:?})",
            descriptor.file_name,
            company_id,
            classification.method,
            classification.is_fallback,
            strategy.kind()
        );

        Ok(ResolutionResult {
            display_name: record.display_name.clone(),
            is_fallback: classification.is_fallback,
            method: classification.method,
            matched_marker: classification.matched_marker,
            ambiguous_candidates: classification.ambiguous_candidates,
            matched_company_id: classification.company_id,
            prompt_text,
        })
    }

    /// Resolves each descriptor independently; results keep the input order.
    pub fn resolve_many(&self, descriptors: &[DocumentDescriptor]) -> Vec<Result<ResolutionResult>> {
        descriptors
            .iter()
            .map(|descriptor| self.resolve_and_render(descriptor))
            .collect()
    }
}

fn internal_consistency(company_id: &str, cause: IntakeError) -> IntakeError {
    error!(
        "Classifier returned {} but the catalog cannot serve it: {}",
        company_id, cause
    );
    IntakeError::InternalConsistency {
        company_id: company_id.to_string(),
        details: cause.to_string(),
    }
}
