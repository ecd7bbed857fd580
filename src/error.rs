use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Company not found: {0}")]
    CompanyNotFound(String),

    #[error("No prompt strategy registered for company: {0}")]
    StrategyNotFound(String),

    #[error("Invalid company id {0:?}: ids must be non-empty and contain no surrounding whitespace")]
    InvalidCompanyId(String),

    #[error("Duplicate company id: {0}")]
    DuplicateCompanyId(String),

    #[error("Company {company} references unknown parent {parent}")]
    UnknownParent { company: String, parent: String },

    #[error("Company {0} cannot be its own parent")]
    SelfParent(String),

    #[error("Company {company} cannot be nested under {parent}: {parent} is itself a sub-company")]
    NestedTooDeep { company: String, parent: String },

    #[error("Company {company} cannot be nested under reserved record {parent}")]
    ReservedParent { company: String, parent: String },

    #[error("Invalid unresolved sentinel: {0}")]
    InvalidSentinel(String),

    #[error("Registry is missing the catch-all company {0}")]
    MissingCatchAll(String),

    #[error("Company {0} has an empty marker")]
    EmptyMarker(String),

    #[error("Invalid marker pattern {pattern:?} for company {company}: {source}")]
    InvalidMarker {
        company: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Active company {0} has neither an extraction profile nor a registered strategy")]
    MissingStrategy(String),

    #[error("Cannot register a strategy for unknown company: {0}")]
    StrategyForUnknownCompany(String),

    #[error("Strategy registered twice for company: {0}")]
    DuplicateStrategy(String),

    #[error("Internal consistency error for {company_id}: {details}")]
    InternalConsistency { company_id: String, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IntakeError>;
