//! Prompt strategy table: one prompt-construction strategy per registered company.
//!
//! The table is built once from a [`CompanyRegistry`] and never mutated. The
//! builder enforces a closed world: every registry record receives exactly one
//! strategy, and strategies cannot be registered for ids the registry does not
//! know.

use crate::error::{IntakeError, Result};
use crate::prompts::{self, PromptInput};
use crate::registry::CompanyRegistry;
use crate::schema::{CompanyRecord, CompanyStatus, ExtractionProfile, PromptContext, WorkOrderDraft};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Signature of a company-specific override template.
pub type StrategyFn = fn(&PromptInput<'_>) -> String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Generic work-order prompt for companies not specialized yet.
    Placeholder,
    /// Generic prompt enriched with the company's extraction profile.
    Profile,
    /// Company-specific template function registered in code.
    Custom,
    /// Prompt for documents whose issuer could not be determined.
    Unresolved,
}

/// Turns a document's file name and optional context into an extraction prompt.
pub trait PromptStrategy: Send + Sync + fmt::Debug {
    fn kind(&self) -> StrategyKind;

    fn render(&self, file_name: &str, context: Option<&PromptContext>) -> String;
}

#[derive(Debug, Clone)]
struct CompanyLabel {
    id: String,
    display_name: String,
    parent_display_name: Option<String>,
    output_schema: Arc<str>,
}

impl CompanyLabel {
    fn new(registry: &CompanyRegistry, record: &CompanyRecord, output_schema: Arc<str>) -> Self {
        Self {
            id: record.id.clone(),
            display_name: record.display_name.clone(),
            parent_display_name: registry
                .parent_of(&record.id)
                .map(|parent| parent.display_name.clone()),
            output_schema,
        }
    }

    fn input<'a>(&'a self, file_name: &'a str, context: Option<&'a PromptContext>) -> PromptInput<'a> {
        PromptInput {
            company_id: &self.id,
            display_name: &self.display_name,
            parent_display_name: self.parent_display_name.as_deref(),
            file_name,
            context,
            output_schema: &self.output_schema,
        }
    }
}

#[derive(Debug)]
pub struct PlaceholderStrategy {
    label: CompanyLabel,
}

impl PromptStrategy for PlaceholderStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Placeholder
    }

    fn render(&self, file_name: &str, context: Option<&PromptContext>) -> String {
        prompts::render_placeholder(&self.label.input(file_name, context))
    }
}

#[derive(Debug)]
pub struct ProfileStrategy {
    label: CompanyLabel,
    profile: ExtractionProfile,
}

impl PromptStrategy for ProfileStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Profile
    }

    fn render(&self, file_name: &str, context: Option<&PromptContext>) -> String {
        prompts::render_profile(&self.label.input(file_name, context), &self.profile)
    }
}

#[derive(Debug)]
pub struct UnresolvedStrategy {
    label: CompanyLabel,
}

impl PromptStrategy for UnresolvedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Unresolved
    }

    fn render(&self, file_name: &str, context: Option<&PromptContext>) -> String {
        prompts::render_unresolved(&self.label.input(file_name, context))
    }
}

pub struct FnStrategy {
    label: CompanyLabel,
    render_fn: StrategyFn,
}

impl fmt::Debug for FnStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStrategy")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl PromptStrategy for FnStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Custom
    }

    fn render(&self, file_name: &str, context: Option<&PromptContext>) -> String {
        (self.render_fn)(&self.label.input(file_name, context))
    }
}

#[derive(Debug)]
pub struct StrategyTable {
    strategies: BTreeMap<String, Box<dyn PromptStrategy>>,
}

impl StrategyTable {
    pub fn builder(registry: &CompanyRegistry) -> StrategyTableBuilder<'_> {
        StrategyTableBuilder {
            registry,
            custom: Vec::new(),
        }
    }

    pub fn get_strategy(&self, company_id: &str) -> Result<&dyn PromptStrategy> {
        self.strategies
            .get(company_id)
            .map(|strategy| strategy.as_ref())
            .ok_or_else(|| IntakeError::StrategyNotFound(company_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn company_ids(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }
}

pub struct StrategyTableBuilder<'r> {
    registry: &'r CompanyRegistry,
    custom: Vec<(String, StrategyFn)>,
}

impl<'r> StrategyTableBuilder<'r> {
    /// Override the strategy of one company with a template function.
    #[must_use]
    pub fn register(mut self, company_id: impl Into<String>, render_fn: StrategyFn) -> Self {
        self.custom.push((company_id.into(), render_fn));
        self
    }

    pub fn build(self) -> Result<StrategyTable> {
        let mut custom: BTreeMap<String, StrategyFn> = BTreeMap::new();
        for (company_id, render_fn) in self.custom {
            if !self.registry.contains(&company_id) {
                return Err(IntakeError::StrategyForUnknownCompany(company_id));
            }
            if custom.contains_key(&company_id) {
                return Err(IntakeError::DuplicateStrategy(company_id));
            }
            custom.insert(company_id, render_fn);
        }

        let output_schema: Arc<str> = Arc::from(WorkOrderDraft::schema_as_json()?);
        let mut strategies: BTreeMap<String, Box<dyn PromptStrategy>> = BTreeMap::new();

        for record in self.registry.list_all() {
            let label = CompanyLabel::new(self.registry, record, Arc::clone(&output_schema));

            let strategy: Box<dyn PromptStrategy> = match custom.remove(&record.id) {
                Some(render_fn) => Box::new(FnStrategy { label, render_fn }),
                None => match (record.status, &record.profile) {
                    (CompanyStatus::Unresolved, _) => Box::new(UnresolvedStrategy { label }),
                    (CompanyStatus::Placeholder, _) => Box::new(PlaceholderStrategy { label }),
                    (CompanyStatus::Active, Some(profile)) => Box::new(ProfileStrategy {
                        label,
                        profile: profile.clone(),
                    }),
                    (CompanyStatus::Active, None) => {
                        return Err(IntakeError::MissingStrategy(record.id.clone()))
                    }
                },
            };

            debug!("Registered {:?} strategy for {}", strategy.kind(), record.id);
            strategies.insert(record.id.clone(), strategy);
        }

        Ok(StrategyTable { strategies })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CATCH_ALL_COMPANY_ID, UNRESOLVED_COMPANY_ID};

    fn record(id: &str, name: &str, parent: Option<&str>, status: CompanyStatus) -> CompanyRecord {
        CompanyRecord {
            id: id.to_string(),
            display_name: name.to_string(),
            parent_id: parent.map(str::to_string),
            status,
            markers: Vec::new(),
            profile: None,
        }
    }

    fn registry() -> CompanyRegistry {
        let mut aoba = record("AOBA", "青葉電気工業", None, CompanyStatus::Active);
        aoba.profile = Some(ExtractionProfile {
            layout_notes: vec!["Order number is printed top right".to_string()],
            field_hints: BTreeMap::new(),
        });

        CompanyRegistry::new(vec![
            record(UNRESOLVED_COMPANY_ID, "未設定", None, CompanyStatus::Unresolved),
            aoba,
            record("AOBA_SETSUBI", "青葉設備サービス", Some("AOBA"), CompanyStatus::Placeholder),
            record("KAWANA", "川名建設", None, CompanyStatus::Active),
            record(CATCH_ALL_COMPANY_ID, "その他", None, CompanyStatus::Placeholder),
        ])
        .unwrap()
    }

    fn shouting(input: &PromptInput<'_>) -> String {
        format!("CUSTOM {} {}", input.company_id, input.file_name)
    }

    #[test]
    fn test_every_record_has_a_strategy() {
        let registry = registry();
        let table = StrategyTable::builder(&registry)
            .register("KAWANA", shouting)
            .build()
            .unwrap();

        assert_eq!(table.len(), registry.len());
        for record in registry.list_all() {
            assert!(table.get_strategy(&record.id).is_ok(), "missing {}", record.id);
        }

        let mut expected: Vec<&str> = registry.list_all().iter().map(|r| r.id.as_str()).collect();
        expected.sort_unstable();
        assert_eq!(table.company_ids().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_strategy_kinds_follow_status() {
        let registry = registry();
        let table = StrategyTable::builder(&registry)
            .register("KAWANA", shouting)
            .build()
            .unwrap();

        let kind = |id: &str| table.get_strategy(id).unwrap().kind();
        assert_eq!(kind(UNRESOLVED_COMPANY_ID), StrategyKind::Unresolved);
        assert_eq!(kind("AOBA"), StrategyKind::Profile);
        assert_eq!(kind("AOBA_SETSUBI"), StrategyKind::Placeholder);
        assert_eq!(kind("KAWANA"), StrategyKind::Custom);
        assert_eq!(kind(CATCH_ALL_COMPANY_ID), StrategyKind::Placeholder);
    }

    #[test]
    fn test_active_company_without_strategy_is_fatal() {
        let registry = registry();
        let result = StrategyTable::builder(&registry).build();

        assert!(matches!(result, Err(IntakeError::MissingStrategy(id)) if id == "KAWANA"));
    }

    #[test]
    fn test_strategy_for_unknown_company_is_fatal() {
        let registry = registry();
        let result = StrategyTable::builder(&registry)
            .register("KAWANA", shouting)
            .register("GHOST", shouting)
            .build();

        assert!(matches!(result, Err(IntakeError::StrategyForUnknownCompany(id)) if id == "GHOST"));
    }

    #[test]
    fn test_duplicate_registration_is_fatal() {
        let registry = registry();
        let result = StrategyTable::builder(&registry)
            .register("KAWANA", shouting)
            .register("KAWANA", shouting)
            .build();

        assert!(matches!(result, Err(IntakeError::DuplicateStrategy(id)) if id == "KAWANA"));
    }

    #[test]
    fn test_unknown_lookup_is_not_found() {
        let registry = registry();
        let table = StrategyTable::builder(&registry)
            .register("KAWANA", shouting)
            .build()
            .unwrap();

        assert!(matches!(
            table.get_strategy("NOPE"),
            Err(IntakeError::StrategyNotFound(id)) if id == "NOPE"
        ));
    }

    #[test]
    fn test_rendering_goes_through_the_right_template() {
        let registry = registry();
        let table = StrategyTable::builder(&registry)
            .register("KAWANA", shouting)
            .build()
            .unwrap();

        let custom = table.get_strategy("KAWANA").unwrap().render("roster.pdf", None);
        assert_eq!(custom, "CUSTOM KAWANA roster.pdf");

        let sub = table
            .get_strategy("AOBA_SETSUBI")
            .unwrap()
            .render("setsubi.pdf", None);
        assert!(sub.contains("青葉設備サービス (a division of 青葉電気工業)"));
        assert!(sub.contains("setsubi.pdf"));
        assert!(sub.contains("site_name"));

        let profile = table.get_strategy("AOBA").unwrap().render("ab.pdf", None);
        assert!(profile.contains("Order number is printed top right"));
    }
}
