// Prompt templates for the work-order extraction step.
//
// Every function here is pure: the same input always renders the same text.

use crate::schema::{ExtractionProfile, PromptContext};

/// Everything a template may draw on when rendering a prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub company_id: &'a str,
    pub display_name: &'a str,
    pub parent_display_name: Option<&'a str>,
    pub file_name: &'a str,
    pub context: Option<&'a PromptContext>,
    pub output_schema: &'a str,
}

pub const SYSTEM_ROLE: &str = "You are a Work Order Extraction Specialist for a staffing and scheduling office.";

pub const GENERIC_EXTRACTION_RULES: &str = r#"
## EXTRACTION RULES

1. Extract ONLY what is written in the document. Never invent sites, dates or people.
2. If a field is not present, set it to null (or an empty array for `remarks`).
3. Dates:
   - Output dates as YYYY-MM-DD.
   - Convert Japanese era dates to the Gregorian calendar (令和6年 → 2024, 令和7年 → 2025).
   - If only month and day are printed, use the year of the document's issue date.
4. Times:
   - Output 24-hour HH:MM. "午後1時半" → "13:30".
   - A range such as "8:00〜17:00" gives `start_time` and `end_time`.
5. Phone numbers: keep digits and hyphens only.
6. Put anything that does not fit a field (parking, dress code, keys, safety notes) into `remarks`, one item per note.
"#;

pub const OUTPUT_INSTRUCTIONS: &str = "Return ONLY valid JSON matching this schema. Do not wrap it in markdown.";

/// Prompt for a company whose strategy has not been specialized yet.
pub fn render_placeholder(input: &PromptInput<'_>) -> String {
    let mut prompt = String::new();

    push_header(&mut prompt, input);
    push_document_section(&mut prompt, input);
    prompt.push_str(GENERIC_EXTRACTION_RULES);
    push_output_section(&mut prompt, input);

    prompt
}

/// Prompt for an active company specialized through its extraction profile.
pub fn render_profile(input: &PromptInput<'_>, profile: &ExtractionProfile) -> String {
    let mut prompt = String::new();

    push_header(&mut prompt, input);
    push_document_section(&mut prompt, input);

    if !profile.layout_notes.is_empty() {
        prompt.push_str(&format!(
            "\n## ABOUT {} DOCUMENTS\n\n",
            input.display_name
        ));
        for note in &profile.layout_notes {
            prompt.push_str(&format!("- {}\n", note));
        }
    }

    if !profile.field_hints.is_empty() {
        prompt.push_str("\n## FIELD HINTS\n\n");
        for (field, hint) in &profile.field_hints {
            prompt.push_str(&format!("- `{}`: {}\n", field, hint));
        }
    }

    prompt.push_str(GENERIC_EXTRACTION_RULES);
    push_output_section(&mut prompt, input);

    prompt
}

/// Prompt used when the issuing company could not be determined.
///
/// Asks the model to report `issuer_name`, which the caller may feed back as
/// an explicit company hint on a second pass.
pub fn render_unresolved(input: &PromptInput<'_>) -> String {
    let mut prompt = String::new();

    prompt.push_str(SYSTEM_ROLE);
    prompt.push_str("\n\nThe company that issued this work order could not be determined before extraction.\n");
    push_document_section(&mut prompt, input);
    prompt.push_str(
        "\n## IDENTIFY THE ISSUER\n\n\
         - Look at the letterhead, the 発注者 / 依頼元 block and any company stamp.\n\
         - Put the issuing company's name in `issuer_name` exactly as printed.\n\
         - If no issuer can be found, set `issuer_name` to null. Do not guess.\n",
    );
    prompt.push_str(GENERIC_EXTRACTION_RULES);
    push_output_section(&mut prompt, input);

    prompt
}

/// Roster-style orders that list several sites on one sheet, one row per site.
pub fn render_multi_site_roster(input: &PromptInput<'_>) -> String {
    let mut prompt = String::new();

    push_header(&mut prompt, input);
    push_document_section(&mut prompt, input);
    prompt.push_str(
        "\n## ROSTER LAYOUT\n\n\
         This issuer sends a weekly roster (週間作業予定表) with one table row per site.\n\
         - Treat EVERY table row as a separate work order.\n\
         - The date column applies to all rows below it until the next date appears.\n\
         - The 人数 column is `required_workers`.\n\
         - Rows struck through or marked 中止 are cancelled: skip them.\n\
         - Return a JSON ARRAY of objects, each matching the schema below. Return `[]` if every row is cancelled.\n",
    );
    prompt.push_str(GENERIC_EXTRACTION_RULES);
    push_output_section(&mut prompt, input);

    prompt
}

/// Forms where the header block is printed twice (issuer copy and contractor copy).
pub fn render_duplicate_copy_form(input: &PromptInput<'_>) -> String {
    let mut prompt = String::new();

    push_header(&mut prompt, input);
    push_document_section(&mut prompt, input);
    prompt.push_str(
        "\n## DUPLICATE COPY FORM\n\n\
         Each page contains the same order twice: 控 (issuer copy) on top, 受注者用 (contractor copy) below.\n\
         - Read the contractor copy. Ignore the issuer copy unless the contractor copy is illegible.\n\
         - Handwritten corrections override printed values.\n\
         - Extract ONE work order per page.\n",
    );
    prompt.push_str(GENERIC_EXTRACTION_RULES);
    push_output_section(&mut prompt, input);

    prompt
}

fn push_header(prompt: &mut String, input: &PromptInput<'_>) {
    prompt.push_str(SYSTEM_ROLE);
    prompt.push_str("\n\n");
    match input.parent_display_name {
        Some(parent) => prompt.push_str(&format!(
            "Extract the work order from the attached PDF issued by {} (a division of {}).\n",
            input.display_name, parent
        )),
        None => prompt.push_str(&format!(
            "Extract the work order from the attached PDF issued by {}.\n",
            input.display_name
        )),
    }
}

fn push_document_section(prompt: &mut String, input: &PromptInput<'_>) {
    prompt.push_str("\n## DOCUMENT\n\n");
    prompt.push_str(&format!("- File name: {:?}\n", input.file_name));
    prompt.push_str(&format!(
        "- Issuer: {} ({})\n",
        input.display_name, input.company_id
    ));

    if let Some(context) = input.context {
        if let Some(received_on) = context.received_on {
            prompt.push_str(&format!("- Received on: {}\n", received_on.format("%Y-%m-%d")));
        }
        if let Some(pages) = context.page_count {
            prompt.push_str(&format!("- Pages: {}\n", pages));
        }
        if let Some(note) = context.operator_note.as_deref().map(str::trim) {
            if !note.is_empty() {
                prompt.push_str(&format!("- Operator note: {}\n", note));
            }
        }
    }
}

fn push_output_section(prompt: &mut String, input: &PromptInput<'_>) {
    prompt.push_str("\n## OUTPUT FORMAT\n\n");
    prompt.push_str(OUTPUT_INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str(input.output_schema);
    prompt.push('\n');
}
