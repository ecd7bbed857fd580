use crate::classifier::{Classifier, TieBreak};
use crate::error::Result;
use crate::prompts;
use crate::registry::CompanyRegistry;
use crate::schema::CompanyCatalogConfig;
use crate::strategy::{StrategyFn, StrategyTable};
use log::info;
use std::path::Path;

const BUNDLED_CATALOG: &str = include_str!("../data/companies.json");

/// Template overrides for bundled companies whose documents need more than a profile.
const BUILTIN_STRATEGIES: &[(&str, StrategyFn)] = &[
    ("KAWANA_KENSETSU", prompts::render_multi_site_roster),
    ("HOKUTO_KOGYO", prompts::render_duplicate_copy_form),
];

/// Registry, strategy table and classifier, built together once and then shared read-only.
#[derive(Debug)]
pub struct IntakeCatalog {
    registry: CompanyRegistry,
    strategies: StrategyTable,
    classifier: Classifier,
}

impl IntakeCatalog {
    pub fn builder(config: CompanyCatalogConfig) -> CatalogBuilder {
        CatalogBuilder {
            config,
            strategies: Vec::new(),
            tie_break: TieBreak::default(),
        }
    }

    pub fn from_config(config: CompanyCatalogConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: CompanyCatalogConfig = serde_json::from_str(json)?;
        Self::from_config(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// The catalog compiled into the crate, with its built-in template overrides.
    pub fn bundled() -> Result<Self> {
        let config: CompanyCatalogConfig = serde_json::from_str(BUNDLED_CATALOG)?;
        BUILTIN_STRATEGIES
            .iter()
            .fold(Self::builder(config), |builder, (id, render_fn)| {
                builder.with_strategy(*id, *render_fn)
            })
            .build()
    }

    pub fn registry(&self) -> &CompanyRegistry {
        &self.registry
    }

    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }
}

pub struct CatalogBuilder {
    config: CompanyCatalogConfig,
    strategies: Vec<(String, StrategyFn)>,
    tie_break: TieBreak,
}

impl CatalogBuilder {
    #[must_use]
    pub fn with_strategy(mut self, company_id: impl Into<String>, render_fn: StrategyFn) -> Self {
        self.strategies.push((company_id.into(), render_fn));
        self
    }

    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn build(self) -> Result<IntakeCatalog> {
        let registry = CompanyRegistry::new(self.config.companies)?;

        let strategies = self
            .strategies
            .into_iter()
            .fold(StrategyTable::builder(&registry), |builder, (id, render_fn)| {
                builder.register(id, render_fn)
            })
            .build()?;

        let classifier = Classifier::with_tie_break(&registry, self.tie_break)?;

        info!(
            "Intake catalog ready: {} companies ({} selectable), {} strategies",
            registry.len(),
            registry.list_selectable().len(),
            strategies.len()
        );

        Ok(IntakeCatalog {
            registry,
            strategies,
            classifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntakeError;
    use crate::schema::{CATCH_ALL_COMPANY_ID, UNRESOLVED_COMPANY_ID};
    use crate::strategy::StrategyKind;

    #[test]
    fn test_bundled_catalog_loads() {
        let catalog = IntakeCatalog::bundled().unwrap();

        assert!(catalog.registry().contains(UNRESOLVED_COMPANY_ID));
        assert!(catalog.registry().contains(CATCH_ALL_COMPANY_ID));
        assert_eq!(catalog.strategies().len(), catalog.registry().len());
    }

    #[test]
    fn test_bundled_builtin_overrides_are_custom() {
        let catalog = IntakeCatalog::bundled().unwrap();

        for (id, _) in BUILTIN_STRATEGIES {
            let strategy = catalog.strategies().get_strategy(id).unwrap();
            assert_eq!(strategy.kind(), StrategyKind::Custom, "{}", id);
        }
    }

    #[test]
    fn test_bundled_config_needs_its_overrides() {
        let config: CompanyCatalogConfig = serde_json::from_str(BUNDLED_CATALOG).unwrap();
        let result = IntakeCatalog::from_config(config);

        assert!(matches!(result, Err(IntakeError::MissingStrategy(_))));
    }

    #[test]
    fn test_tie_break_reaches_the_classifier() {
        let config: CompanyCatalogConfig = serde_json::from_str(BUNDLED_CATALOG).unwrap();
        let catalog = BUILTIN_STRATEGIES
            .iter()
            .fold(IntakeCatalog::builder(config), |builder, (id, render_fn)| {
                builder.with_strategy(*id, *render_fn)
            })
            .with_tie_break(TieBreak::SmallestId)
            .build()
            .unwrap();

        assert_eq!(catalog.classifier().tie_break(), TieBreak::SmallestId);
        assert_eq!(
            IntakeCatalog::bundled().unwrap().classifier().tie_break(),
            TieBreak::default()
        );
    }

    #[test]
    fn test_invalid_json_is_serialization_error() {
        let result = IntakeCatalog::from_json_str("{ \"companies\": [ { \"id\": 1 } ] }");
        assert!(matches!(result, Err(IntakeError::SerializationError(_))));
    }
}
