//! Human-readable document numbers of the form `CCC-DDD-TTT-NNN`
//! (company, department, document type, sequence).

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel::PgConnection;
use uuid::Uuid;

use super::error::{WorkflowError, WorkflowResult};
use crate::schema::documents;

/// Marks a document whose number has not been allocated yet.
pub const PENDING_PREFIX: &str = "PENDING-";

const SEGMENT_LEN: usize = 3;
const SEQUENCE_DIGITS: usize = 3;

pub fn is_pending(number: &str) -> bool {
    number.starts_with(PENDING_PREFIX)
}

/// `PENDING-{creation timestamp}-{id fragment}`; the fragment keeps two
/// documents created in the same millisecond distinct.
pub fn pending_placeholder(created_at: NaiveDateTime, document_id: Uuid) -> String {
    let simple = document_id.simple().to_string();
    format!(
        "{PENDING_PREFIX}{}-{}",
        created_at.format("%Y%m%d%H%M%S%3f"),
        &simple[..8]
    )
}

/// Letters only, uppercased, truncated to three characters and right-padded
/// with `X`.
pub fn code_segment(code: &str) -> String {
    let mut segment: String = code
        .chars()
        .filter(|ch| ch.is_ascii_alphabetic())
        .map(|ch| ch.to_ascii_uppercase())
        .take(SEGMENT_LEN)
        .collect();
    while segment.len() < SEGMENT_LEN {
        segment.push('X');
    }
    segment
}

pub fn build_prefix(company_code: &str, department_code: &str, type_code: &str) -> String {
    format!(
        "{}-{}-{}",
        code_segment(company_code),
        code_segment(department_code),
        code_segment(type_code)
    )
}

pub fn format_number(prefix: &str, sequence: u32) -> String {
    format!("{prefix}-{sequence:0width$}", width = SEQUENCE_DIGITS)
}

/// The numeric suffix of `number` when it belongs to `prefix`.
pub fn sequence_of(number: &str, prefix: &str) -> Option<u32> {
    let suffix = number.strip_prefix(prefix)?.strip_prefix('-')?;
    if suffix.is_empty() || !suffix.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

pub fn next_sequence<'a, I>(existing: I, prefix: &str) -> u32
where
    I: IntoIterator<Item = &'a str>,
{
    existing
        .into_iter()
        .filter(|number| !is_pending(number))
        .filter_map(|number| sequence_of(number, prefix))
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

/// Validates a manually supplied number against `AAA-AAA-AAA-NNN` and
/// returns it uppercased.
pub fn normalize_manual_number(input: &str) -> WorkflowResult<String> {
    let candidate = input.trim().to_ascii_uppercase();
    let groups: Vec<&str> = candidate.split('-').collect();

    let valid = groups.len() == 4
        && groups[..3]
            .iter()
            .all(|group| group.len() == SEGMENT_LEN && group.chars().all(|c| c.is_ascii_uppercase()))
        && groups[3].len() == SEQUENCE_DIGITS
        && groups[3].chars().all(|c| c.is_ascii_digit());

    if valid {
        Ok(candidate)
    } else {
        Err(WorkflowError::validation(format!(
            "invalid format: document number must look like XXX-XXX-XXX-000, got '{}'",
            input.trim()
        )))
    }
}

/// Allocates the next free number under `prefix`.
///
/// Must run inside a transaction: the advisory lock serializes concurrent
/// allocations for the same prefix until commit.
pub fn allocate_next(conn: &mut PgConnection, prefix: &str) -> QueryResult<String> {
    diesel::sql_query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind::<Text, _>(prefix)
        .execute(conn)?;

    let existing: Vec<String> = documents::table
        .filter(documents::document_number.like(format!("{prefix}-%")))
        .filter(documents::document_number.not_like(format!("{PENDING_PREFIX}%")))
        .select(documents::document_number)
        .load(conn)?;

    let sequence = next_sequence(existing.iter().map(String::as_str), prefix);
    Ok(format_number(prefix, sequence))
}

pub fn number_in_use(
    conn: &mut PgConnection,
    number: &str,
    except_document: Uuid,
) -> QueryResult<bool> {
    let holder: Option<Uuid> = documents::table
        .filter(documents::document_number.eq(number))
        .filter(documents::id.ne(except_document))
        .select(documents::id)
        .first(conn)
        .optional()?;
    Ok(holder.is_some())
}
