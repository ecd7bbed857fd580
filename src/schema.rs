use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Id of the sentinel record used when the issuing company cannot be determined.
pub const UNRESOLVED_COMPANY_ID: &str = "UNKNOWN_OR_NOT_SET";

/// Id of the catch-all record for documents that match no specific partner.
pub const CATCH_ALL_COMPANY_ID: &str = "SONOTA";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    #[default]
    #[schemars(description = "The company has a specialized prompt (extraction profile or registered strategy).")]
    Active,

    #[schemars(description = "The company is known but its prompt has not been specialized yet. A generic work-order prompt is used.")]
    Placeholder,

    #[schemars(description = "Sentinel for 'could not determine company'. Exactly one record may carry this status.")]
    Unresolved,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MarkerSource {
    #[schemars(description = "Match against the uploaded file name only.")]
    FileName,

    #[schemars(description = "Match against the extracted header text sample only.")]
    Text,

    #[default]
    #[schemars(description = "Match against either the file name or the text sample.")]
    Any,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Marker {
    #[schemars(description = "Case-insensitive substring match. Full-width ASCII is folded to half-width before comparing.")]
    Contains {
        value: String,
        #[serde(default)]
        source: MarkerSource,
    },

    #[schemars(description = "Case-insensitive regular expression, evaluated against the normalized evidence.")]
    Pattern {
        regex: String,
        #[serde(default)]
        source: MarkerSource,
    },
}

impl Marker {
    pub fn source(&self) -> MarkerSource {
        match self {
            Marker::Contains { source, .. } | Marker::Pattern { source, .. } => *source,
        }
    }

    /// The configured marker text, used when reporting which marker fired.
    pub fn describe(&self) -> &str {
        match self {
            Marker::Contains { value, .. } => value,
            Marker::Pattern { regex, .. } => regex,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
pub struct ExtractionProfile {
    #[serde(default)]
    #[schemars(description = "Free-form notes about the issuer's document layout, rendered as a bullet list in the prompt.")]
    pub layout_notes: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Per-field hints keyed by WorkOrderDraft field name (e.g. 'site_name': 'Printed after the label 現場名').")]
    pub field_hints: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct CompanyRecord {
    #[schemars(description = "Unique stable identifier, uppercase snake case by convention (e.g. 'KAWANA_KENSETSU').")]
    pub id: String,

    #[schemars(description = "Human-readable company name shown to users. May contain non-ASCII text.")]
    pub display_name: String,

    #[serde(default)]
    #[schemars(description = "Id of the parent company when this record is a sub-company. The parent must itself be top-level.")]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub status: CompanyStatus,

    #[serde(default)]
    #[schemars(description = "Markers identifying documents issued by this company.")]
    pub markers: Vec<Marker>,

    #[serde(default)]
    #[schemars(description = "Issuer-specific prompt specialization for active companies.")]
    pub profile: Option<ExtractionProfile>,
}

impl CompanyRecord {
    pub fn is_sub_company(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn is_unresolved_sentinel(&self) -> bool {
        self.status == CompanyStatus::Unresolved
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
pub struct CompanyCatalogConfig {
    #[schemars(description = "All company records, in the order they should be listed to users.")]
    pub companies: Vec<CompanyRecord>,
}

impl CompanyCatalogConfig {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(CompanyCatalogConfig)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// Optional caller-supplied context forwarded to the prompt strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PromptContext {
    pub received_on: Option<NaiveDate>,
    pub page_count: Option<u32>,
    pub operator_note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DocumentDescriptor {
    pub file_name: String,
    #[serde(default)]
    pub raw_text_sample: Option<String>,
    #[serde(default)]
    pub explicit_company_hint: Option<String>,
    #[serde(default)]
    pub context: Option<PromptContext>,
}

impl DocumentDescriptor {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_text_sample(mut self, text: impl Into<String>) -> Self {
        self.raw_text_sample = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_company_hint(mut self, company_id: impl Into<String>) -> Self {
        self.explicit_company_hint = Some(company_id.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: PromptContext) -> Self {
        self.context = Some(context);
        self
    }

    /// True when there is no evidence at all to classify on.
    pub fn is_blank(&self) -> bool {
        self.file_name.trim().is_empty()
            && self
                .raw_text_sample
                .as_deref()
                .map_or(true, |t| t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// The caller named the company explicitly.
    ExplicitHint,
    /// A sub-company marker matched.
    SubCompanyMarker,
    /// A top-level company marker matched.
    CompanyMarker,
    /// Nothing matched; the catch-all company was used.
    CatchAll,
    /// The descriptor carried no usable evidence.
    Unresolved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolutionResult {
    pub matched_company_id: String,
    pub display_name: String,
    pub is_fallback: bool,
    pub method: ResolutionMethod,
    /// The marker text that fired, when resolved by marker.
    pub matched_marker: Option<String>,
    /// Other ids that matched at the same level and lost the tie-break.
    pub ambiguous_candidates: Vec<String>,
    pub prompt_text: String,
}

impl ResolutionResult {
    pub fn was_ambiguous(&self) -> bool {
        !self.ambiguous_candidates.is_empty()
    }
}

/// The structure the extraction model is asked to return for a work order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
pub struct WorkOrderDraft {
    #[schemars(description = "Name of the company that issued the work order, exactly as printed. Null if not printed.")]
    pub issuer_name: Option<String>,

    #[schemars(description = "Name of the work site (現場名).")]
    pub site_name: Option<String>,

    #[schemars(description = "Full postal address of the work site.")]
    pub site_address: Option<String>,

    #[schemars(description = "Scheduled work date in YYYY-MM-DD format. Convert Japanese era dates (e.g. 令和6年) to the Gregorian calendar.")]
    pub work_date: Option<NaiveDate>,

    #[schemars(description = "Scheduled start time in 24-hour HH:MM format.")]
    pub start_time: Option<String>,

    #[schemars(description = "Scheduled end time in 24-hour HH:MM format.")]
    pub end_time: Option<String>,

    #[schemars(description = "Summary of the work to be performed (作業内容).")]
    pub work_description: Option<String>,

    #[schemars(description = "Number of workers requested, if stated.")]
    pub required_workers: Option<u32>,

    #[schemars(description = "On-site contact person (担当者).")]
    pub contact_name: Option<String>,

    #[schemars(description = "On-site contact phone number, digits and hyphens only.")]
    pub contact_phone: Option<String>,

    #[serde(default)]
    #[schemars(description = "Any other instructions or notes that do not fit the fields above.")]
    pub remarks: Vec<String>,
}

impl WorkOrderDraft {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(WorkOrderDraft)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
