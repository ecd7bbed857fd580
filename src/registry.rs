use crate::error::{IntakeError, Result};
use crate::schema::{CompanyRecord, CompanyStatus, CATCH_ALL_COMPANY_ID, UNRESOLVED_COMPANY_ID};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A single entry of the user-facing company dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionOption {
    pub id: String,
    pub label: String,
    pub is_sub_company: bool,
}

/// Validated, immutable company catalog with a derived parent → children index.
#[derive(Debug, Clone)]
pub struct CompanyRegistry {
    records: Vec<CompanyRecord>,
    index: HashMap<String, usize>,
    children: BTreeMap<String, Vec<usize>>,
}

impl CompanyRegistry {
    pub fn new(records: Vec<CompanyRecord>) -> Result<Self> {
        let mut index = HashMap::with_capacity(records.len());

        for (idx, record) in records.iter().enumerate() {
            if record.id.trim().is_empty() || record.id.trim() != record.id {
                return Err(IntakeError::InvalidCompanyId(record.id.clone()));
            }
            if index.insert(record.id.clone(), idx).is_some() {
                return Err(IntakeError::DuplicateCompanyId(record.id.clone()));
            }
        }

        validate_sentinels(&records, &index)?;

        let mut children: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, record) in records.iter().enumerate() {
            let Some(parent_id) = &record.parent_id else {
                continue;
            };

            if parent_id == &record.id {
                return Err(IntakeError::SelfParent(record.id.clone()));
            }

            let parent = index.get(parent_id).map(|&i| &records[i]).ok_or_else(|| {
                IntakeError::UnknownParent {
                    company: record.id.clone(),
                    parent: parent_id.clone(),
                }
            })?;

            if parent.parent_id.is_some() {
                return Err(IntakeError::NestedTooDeep {
                    company: record.id.clone(),
                    parent: parent_id.clone(),
                });
            }

            if parent.id == UNRESOLVED_COMPANY_ID || parent.id == CATCH_ALL_COMPANY_ID {
                return Err(IntakeError::ReservedParent {
                    company: record.id.clone(),
                    parent: parent_id.clone(),
                });
            }

            children.entry(parent_id.clone()).or_default().push(idx);
        }

        for indices in children.values_mut() {
            indices.sort_by(|&a, &b| records[a].id.cmp(&records[b].id));
        }

        Ok(Self {
            records,
            index,
            children,
        })
    }

    pub fn get_by_id(&self, id: &str) -> Result<&CompanyRecord> {
        self.index
            .get(id)
            .map(|&idx| &self.records[idx])
            .ok_or_else(|| IntakeError::CompanyNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Every record in catalog order, the unresolved sentinel included.
    pub fn list_all(&self) -> &[CompanyRecord] {
        &self.records
    }

    /// Records a user may pick, in catalog order. Never contains the sentinel.
    pub fn list_selectable(&self) -> Vec<&CompanyRecord> {
        self.records
            .iter()
            .filter(|r| !r.is_unresolved_sentinel())
            .collect()
    }

    /// Sub-companies of `parent_id`, sorted by id. Empty for unknown ids.
    pub fn get_children(&self, parent_id: &str) -> Vec<&CompanyRecord> {
        self.children
            .get(parent_id)
            .map(|indices| indices.iter().map(|&idx| &self.records[idx]).collect())
            .unwrap_or_default()
    }

    pub fn parent_of(&self, id: &str) -> Option<&CompanyRecord> {
        let record = self.get_by_id(id).ok()?;
        let parent_id = record.parent_id.as_deref()?;
        self.get_by_id(parent_id).ok()
    }

    pub fn top_level(&self) -> impl Iterator<Item = &CompanyRecord> {
        self.records.iter().filter(|r| r.parent_id.is_none())
    }

    pub fn sub_companies(&self) -> impl Iterator<Item = &CompanyRecord> {
        self.records.iter().filter(|r| r.parent_id.is_some())
    }

    pub fn unresolved(&self) -> &CompanyRecord {
        &self.records[self.index[UNRESOLVED_COMPANY_ID]]
    }

    pub fn catch_all(&self) -> &CompanyRecord {
        &self.records[self.index[CATCH_ALL_COMPANY_ID]]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Dropdown entries: each top-level company followed by its sub-companies.
    pub fn selection_options(&self) -> Vec<SelectionOption> {
        let mut options = Vec::new();

        for parent in self.top_level().filter(|r| !r.is_unresolved_sentinel()) {
            options.push(SelectionOption {
                id: parent.id.clone(),
                label: parent.display_name.clone(),
                is_sub_company: false,
            });

            for child in self.get_children(&parent.id) {
                options.push(SelectionOption {
                    id: child.id.clone(),
                    label: format!("{} / {}", parent.display_name, child.display_name),
                    is_sub_company: true,
                });
            }
        }

        options
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Company Registry\n\n");
        output.push_str(&format!("**Companies:** {}\n\n", self.records.len()));

        for parent in self.top_level() {
            output.push_str(&format!(
                "- `{}` {}{}\n",
                parent.id,
                parent.display_name,
                status_marker(parent.status)
            ));
            for child in self.get_children(&parent.id) {
                output.push_str(&format!(
                    "  - `{}` {}{}\n",
                    child.id,
                    child.display_name,
                    status_marker(child.status)
                ));
            }
        }

        output
    }
}

fn status_marker(status: CompanyStatus) -> &'static str {
    match status {
        CompanyStatus::Active => "",
        CompanyStatus::Placeholder => " *(placeholder)*",
        CompanyStatus::Unresolved => " **[UNRESOLVED]**",
    }
}

fn validate_sentinels(records: &[CompanyRecord], index: &HashMap<String, usize>) -> Result<()> {
    let unresolved: Vec<&CompanyRecord> = records
        .iter()
        .filter(|r| r.status == CompanyStatus::Unresolved)
        .collect();

    match unresolved.as_slice() {
        [] => {
            return Err(IntakeError::InvalidSentinel(format!(
                "no record with status 'unresolved' (expected id {})",
                UNRESOLVED_COMPANY_ID
            )))
        }
        [sentinel] => {
            if sentinel.id != UNRESOLVED_COMPANY_ID {
                return Err(IntakeError::InvalidSentinel(format!(
                    "the unresolved record must have id {}, found {}",
                    UNRESOLVED_COMPANY_ID, sentinel.id
                )));
            }
            if sentinel.parent_id.is_some() {
                return Err(IntakeError::InvalidSentinel(format!(
                    "{} must not have a parent",
                    UNRESOLVED_COMPANY_ID
                )));
            }
        }
        many => {
            return Err(IntakeError::InvalidSentinel(format!(
                "expected exactly one record with status 'unresolved', found {}",
                many.len()
            )))
        }
    }

    let catch_all = index
        .get(CATCH_ALL_COMPANY_ID)
        .map(|&idx| &records[idx])
        .ok_or_else(|| IntakeError::MissingCatchAll(CATCH_ALL_COMPANY_ID.to_string()))?;

    if catch_all.parent_id.is_some() {
        return Err(IntakeError::InvalidSentinel(format!(
            "{} must be a top-level company",
            CATCH_ALL_COMPANY_ID
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn base_records() -> Vec<CompanyRecord> {
        vec![
            record(UNRESOLVED_COMPANY_ID, "未設定", None, CompanyStatus::Unresolved),
            record("KAWANA", "川名建設", None, CompanyStatus::Placeholder),
            record("KAWANA_REFORM", "川名リフォーム", Some("KAWANA"), CompanyStatus::Placeholder),
            record("KAWANA_HOUSING", "川名ハウジング", Some("KAWANA"), CompanyStatus::Placeholder),
            record(CATCH_ALL_COMPANY_ID, "その他", None, CompanyStatus::Placeholder),
        ]
    }

    #[test]
    fn test_registry_lookup_and_listing() {
        let registry = CompanyRegistry::new(base_records()).unwrap();

        assert_eq!(registry.len(), 5);
        assert_eq!(registry.get_by_id("KAWANA").unwrap().display_name, "川名建設");
        assert!(matches!(
            registry.get_by_id("NOPE"),
            Err(IntakeError::CompanyNotFound(id)) if id == "NOPE"
        ));

        assert!(registry
            .list_all()
            .iter()
            .any(|r| r.id == UNRESOLVED_COMPANY_ID));
        assert!(registry
            .list_selectable()
            .iter()
            .all(|r| r.id != UNRESOLVED_COMPANY_ID));
        assert_eq!(registry.list_selectable().len(), 4);
    }

    #[test]
    fn test_children_are_sorted_by_id() {
        let registry = CompanyRegistry::new(base_records()).unwrap();

        let children: Vec<&str> = registry
            .get_children("KAWANA")
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(children, vec!["KAWANA_HOUSING", "KAWANA_REFORM"]);

        assert!(registry.get_children("KAWANA_HOUSING").is_empty());
        assert!(registry.get_children("DOES_NOT_EXIST").is_empty());
        assert_eq!(registry.parent_of("KAWANA_REFORM").unwrap().id, "KAWANA");
        assert!(registry.parent_of("KAWANA").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut records = base_records();
        records.push(record("KAWANA", "重複", None, CompanyStatus::Placeholder));

        assert!(matches!(
            CompanyRegistry::new(records),
            Err(IntakeError::DuplicateCompanyId(id)) if id == "KAWANA"
        ));
    }

    #[test]
    fn test_blank_id_rejected() {
        let mut records = base_records();
        records.push(record("  ", "空", None, CompanyStatus::Placeholder));

        assert!(matches!(
            CompanyRegistry::new(records),
            Err(IntakeError::InvalidCompanyId(_))
        ));
    }

    #[test]
    fn test_three_level_nesting_rejected() {
        let mut records = base_records();
        records.push(record(
            "KAWANA_HOUSING_EAST",
            "川名ハウジング東",
            Some("KAWANA_HOUSING"),
            CompanyStatus::Placeholder,
        ));

        assert!(matches!(
            CompanyRegistry::new(records),
            Err(IntakeError::NestedTooDeep { .. })
        ));
    }

    #[test]
    fn test_unknown_and_self_parent_rejected() {
        let mut records = base_records();
        records.push(record("ORPHAN", "孤児", Some("MISSING"), CompanyStatus::Placeholder));
        assert!(matches!(
            CompanyRegistry::new(records),
            Err(IntakeError::UnknownParent { .. })
        ));

        let mut records = base_records();
        records.push(record("LOOP", "ループ", Some("LOOP"), CompanyStatus::Placeholder));
        assert!(matches!(
            CompanyRegistry::new(records),
            Err(IntakeError::SelfParent(id)) if id == "LOOP"
        ));
    }

    #[test]
    fn test_reserved_parent_rejected() {
        let mut records = base_records();
        records.push(record(
            "SONOTA_CHILD",
            "その他の子",
            Some(CATCH_ALL_COMPANY_ID),
            CompanyStatus::Placeholder,
        ));

        assert!(matches!(
            CompanyRegistry::new(records),
            Err(IntakeError::ReservedParent { .. })
        ));
    }

    #[test]
    fn test_sentinel_rules() {
        let mut records = base_records();
        records.retain(|r| r.id != UNRESOLVED_COMPANY_ID);
        assert!(matches!(
            CompanyRegistry::new(records),
            Err(IntakeError::InvalidSentinel(_))
        ));

        let mut records = base_records();
        records.push(record("ALSO_UNKNOWN", "不明", None, CompanyStatus::Unresolved));
        assert!(matches!(
            CompanyRegistry::new(records),
            Err(IntakeError::InvalidSentinel(_))
        ));

        let mut records = base_records();
        records.retain(|r| r.id != CATCH_ALL_COMPANY_ID);
        assert!(matches!(
            CompanyRegistry::new(records),
            Err(IntakeError::MissingCatchAll(_))
        ));
    }

    #[test]
    fn test_selection_options_group_children_under_parent() {
        let registry = CompanyRegistry::new(base_records()).unwrap();
        let options = registry.selection_options();

        let ids: Vec<&str> = options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["KAWANA", "KAWANA_HOUSING", "KAWANA_REFORM", CATCH_ALL_COMPANY_ID]
        );
        assert_eq!(options[1].label, "川名建設 / 川名ハウジング");
        assert!(options[1].is_sub_company);
    }

    #[test]
    fn test_registry_to_markdown() {
        let registry = CompanyRegistry::new(base_records()).unwrap();
        let markdown = registry.to_markdown();

        assert!(markdown.contains("# Company Registry"));
        assert!(markdown.contains("  - `KAWANA_HOUSING` 川名ハウジング"));
        assert!(markdown.contains("[UNRESOLVED]"));
    }
}
