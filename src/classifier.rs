//! Resolves a [`DocumentDescriptor`] to exactly one company id.
//!
//! Resolution order, first match wins:
//! 1. explicit company hint (ignored if it does not resolve),
//! 2. blank descriptor → unresolved sentinel,
//! 3. sub-company markers, then top-level company markers,
//! 4. catch-all company.

use crate::error::{IntakeError, Result};
use crate::registry::CompanyRegistry;
use crate::schema::{
    DocumentDescriptor, Marker, MarkerSource, ResolutionMethod, CATCH_ALL_COMPANY_ID,
    UNRESOLVED_COMPANY_ID,
};
use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Policy for choosing among several companies matched at the same level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Lexicographically smallest company id wins.
    #[default]
    SmallestId,
}

impl TieBreak {
    /// The single comparison point for ambiguous matches: `Less` means `a` wins.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            TieBreak::SmallestId => a.cmp(b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub company_id: String,
    pub method: ResolutionMethod,
    pub is_fallback: bool,
    pub matched_marker: Option<String>,
    pub ambiguous_candidates: Vec<String>,
}

impl Classification {
    fn direct(company_id: &str, method: ResolutionMethod, is_fallback: bool) -> Self {
        Self {
            company_id: company_id.to_string(),
            method,
            is_fallback,
            matched_marker: None,
            ambiguous_candidates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Contains(String),
    Pattern(Regex),
}

#[derive(Debug, Clone)]
struct CompiledMarker {
    source: MarkerSource,
    matcher: Matcher,
    label: String,
}

impl CompiledMarker {
    fn compile(company_id: &str, marker: &Marker) -> Result<Self> {
        let label = marker.describe().to_string();
        if label.trim().is_empty() {
            return Err(IntakeError::EmptyMarker(company_id.to_string()));
        }

        let matcher = match marker {
            Marker::Contains { value, .. } => Matcher::Contains(normalize(value.trim())),
            Marker::Pattern { regex, .. } => Matcher::Pattern(
                RegexBuilder::new(regex)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| IntakeError::InvalidMarker {
                        company: company_id.to_string(),
                        pattern: regex.clone(),
                        source,
                    })?,
            ),
        };

        Ok(Self {
            source: marker.source(),
            matcher,
            label,
        })
    }

    fn matches(&self, evidence: &Evidence) -> bool {
        let haystacks: [Option<&str>; 2] = match self.source {
            MarkerSource::FileName => [Some(evidence.file_name.as_str()), None],
            MarkerSource::Text => [evidence.text.as_deref(), None],
            MarkerSource::Any => [
                Some(evidence.file_name.as_str()),
                evidence.text.as_deref(),
            ],
        };

        haystacks
            .into_iter()
            .flatten()
            .filter(|haystack| !haystack.is_empty())
            .any(|haystack| match &self.matcher {
                Matcher::Contains(needle) => haystack.contains(needle.as_str()),
                Matcher::Pattern(regex) => regex.is_match(haystack),
            })
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    company_id: String,
    markers: Vec<CompiledMarker>,
}

impl Candidate {
    fn first_match(&self, evidence: &Evidence) -> Option<&CompiledMarker> {
        self.markers.iter().find(|marker| marker.matches(evidence))
    }
}

struct Evidence {
    file_name: String,
    text: Option<String>,
}

impl Evidence {
    fn from_descriptor(descriptor: &DocumentDescriptor) -> Self {
        Self {
            file_name: normalize(descriptor.file_name.trim()),
            text: descriptor
                .raw_text_sample
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(normalize),
        }
    }
}

/// Folds full-width ASCII and the ideographic space to half-width, then lowercases.
pub fn normalize(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{3000}' => ' ',
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone)]
pub struct Classifier {
    sub_companies: Vec<Candidate>,
    companies: Vec<Candidate>,
    exact_ids: BTreeSet<String>,
    known_ids: HashMap<String, String>,
    display_names: HashMap<String, String>,
    tie_break: TieBreak,
}

impl Classifier {
    pub fn new(registry: &CompanyRegistry) -> Result<Self> {
        Self::with_tie_break(registry, TieBreak::default())
    }

    pub fn with_tie_break(registry: &CompanyRegistry, tie_break: TieBreak) -> Result<Self> {
        let mut sub_companies = Vec::new();
        let mut companies = Vec::new();
        let mut exact_ids = BTreeSet::new();
        let mut known_ids = HashMap::new();
        let mut display_names = HashMap::new();

        for record in registry.list_all() {
            exact_ids.insert(record.id.clone());
            known_ids
                .entry(record.id.to_uppercase())
                .or_insert_with(|| record.id.clone());
            display_names
                .entry(record.display_name.trim().to_string())
                .or_insert_with(|| record.id.clone());

            let markers = record
                .markers
                .iter()
                .map(|marker| CompiledMarker::compile(&record.id, marker))
                .collect::<Result<Vec<_>>>()?;

            if record.id == UNRESOLVED_COMPANY_ID || record.id == CATCH_ALL_COMPANY_ID {
                if !markers.is_empty() {
                    warn!("Markers on reserved record {} are never matched", record.id);
                }
                continue;
            }

            if markers.is_empty() {
                continue;
            }

            let candidate = Candidate {
                company_id: record.id.clone(),
                markers,
            };
            if record.is_sub_company() {
                sub_companies.push(candidate);
            } else {
                companies.push(candidate);
            }
        }

        Ok(Self {
            sub_companies,
            companies,
            exact_ids,
            known_ids,
            display_names,
            tie_break,
        })
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    pub fn classify(&self, descriptor: &DocumentDescriptor) -> Classification {
        if let Some(hint) = descriptor.explicit_company_hint.as_deref() {
            match self.resolve_hint(hint) {
                Some(company_id) => {
                    return Classification::direct(
                        company_id,
                        ResolutionMethod::ExplicitHint,
                        false,
                    )
                }
                None => warn!(
                    "Ignoring company hint {:?} for {:?}: not a selectable company",
                    hint, descriptor.file_name
                ),
            }
        }

        if descriptor.is_blank() {
            debug!("Descriptor has no file name and no text sample; using unresolved sentinel");
            return Classification::direct(
                UNRESOLVED_COMPANY_ID,
                ResolutionMethod::Unresolved,
                true,
            );
        }

        let evidence = Evidence::from_descriptor(descriptor);

        let found = self
            .best_match(&self.sub_companies, &evidence, ResolutionMethod::SubCompanyMarker)
            .or_else(|| self.best_match(&self.companies, &evidence, ResolutionMethod::CompanyMarker));
        if let Some(found) = found {
            return found;
        }

        Classification::direct(CATCH_ALL_COMPANY_ID, ResolutionMethod::CatchAll, false)
    }

    /// Exact id, then case-insensitive id, then exact display name.
    /// The unresolved sentinel is never accepted as a hint.
    fn resolve_hint(&self, hint: &str) -> Option<&str> {
        let hint = hint.trim();
        if hint.is_empty() {
            return None;
        }

        let company_id = self
            .exact_ids
            .get(hint)
            .or_else(|| self.known_ids.get(&hint.to_uppercase()))
            .or_else(|| self.display_names.get(hint))?;

        if company_id == UNRESOLVED_COMPANY_ID {
            None
        } else {
            Some(company_id.as_str())
        }
    }

    fn best_match(
        &self,
        candidates: &[Candidate],
        evidence: &Evidence,
        method: ResolutionMethod,
    ) -> Option<Classification> {
        let mut matched: Vec<(&str, &CompiledMarker)> = candidates
            .iter()
            .filter_map(|c| c.first_match(evidence).map(|m| (c.company_id.as_str(), m)))
            .collect();

        matched.sort_by(|a, b| self.tie_break.compare(a.0, b.0));

        let mut matched = matched.into_iter();
        let (winner, marker) = matched.next()?;
        let ambiguous_candidates: Vec<String> = matched.map(|(id, _)| id.to_string()).collect();

        if !ambiguous_candidates.is_empty() {
            warn!(
                "Ambiguous {:?} match: chose {} over {:?}",
                method, winner, ambiguous_candidates
            );
        }

        Some(Classification {
            company_id: winner.to_string(),
            method,
            is_fallback: false,
            matched_marker: Some(marker.label.clone()),
            ambiguous_candidates,
        })
    }
}
