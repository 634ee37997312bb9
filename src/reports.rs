use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::{departments, documents};
use crate::workflow::numbering::is_pending;
use crate::workflow::status::DocumentStatus;

#[derive(Debug, Clone)]
pub struct ReportRow {
    pub status: String,
    pub department: String,
    pub document_number: String,
    pub target_approval_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub approved_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryReport {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_department: BTreeMap<String, usize>,
    pub open: usize,
    pub overdue: usize,
    pub pending_numbers: usize,
    pub approved_count: usize,
    pub average_days_to_approval: Option<f64>,
}

pub fn summarize(rows: &[ReportRow], today: NaiveDate) -> SummaryReport {
    let mut report = SummaryReport {
        total: rows.len(),
        ..SummaryReport::default()
    };
    for status in DocumentStatus::ALL {
        report.by_status.insert(status.label().to_string(), 0);
    }

    let mut approval_days = Vec::new();

    for row in rows {
        let status = row.status.parse::<DocumentStatus>().ok();
        let label = status.map_or_else(|| row.status.clone(), |s| s.label().to_string());
        *report.by_status.entry(label).or_default() += 1;
        *report.by_department.entry(row.department.clone()).or_default() += 1;

        if status.is_some_and(|s| s.is_open()) {
            report.open += 1;
            if row.target_approval_date.is_some_and(|target| target < today) {
                report.overdue += 1;
            }
        }

        if is_pending(&row.document_number) {
            report.pending_numbers += 1;
        }

        if let Some(approved_at) = row.approved_at {
            let elapsed = approved_at - row.created_at;
            approval_days.push(elapsed.num_seconds() as f64 / 86_400.0);
        }
    }

    report.approved_count = approval_days.len();
    if !approval_days.is_empty() {
        let mean = approval_days.iter().sum::<f64>() / approval_days.len() as f64;
        report.average_days_to_approval = Some((mean * 10.0).round() / 10.0);
    }

    report
}

pub fn load_rows(
    conn: &mut PgConnection,
    department_id: Option<Uuid>,
) -> QueryResult<Vec<ReportRow>> {
    let mut query = documents::table
        .inner_join(departments::table)
        .select((
            documents::status,
            departments::name,
            documents::document_number,
            documents::target_approval_date,
            documents::created_at,
            documents::approved_at,
        ))
        .into_boxed();

    if let Some(department_id) = department_id {
        query = query.filter(documents::department_id.eq(department_id));
    }

    let rows: Vec<(
        String,
        String,
        String,
        Option<NaiveDate>,
        NaiveDateTime,
        Option<NaiveDateTime>,
    )> = query.load(conn)?;

    Ok(rows
        .into_iter()
        .map(
            |(status, department, document_number, target_approval_date, created_at, approved_at)| {
                ReportRow {
                    status,
                    department,
                    document_number,
                    target_approval_date,
                    created_at,
                    approved_at,
                }
            },
        )
        .collect())
}
