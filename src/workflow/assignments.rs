use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{WorkflowError, WorkflowResult};
use super::status::RoleProgress;
use crate::config::AssignmentEditPolicy;
use crate::models::{Assignment, NewAssignment};
use crate::schema::document_assignments;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentRole {
    Submitter,
    Reviewer,
    Approver,
}

impl AssignmentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentRole::Submitter => "submitter",
            AssignmentRole::Reviewer => "reviewer",
            AssignmentRole::Approver => "approver",
        }
    }
}

impl FromStr for AssignmentRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "submitter" => Ok(AssignmentRole::Submitter),
            "reviewer" => Ok(AssignmentRole::Reviewer),
            "approver" => Ok(AssignmentRole::Approver),
            other => Err(format!("unknown assignment role '{other}'")),
        }
    }
}

impl fmt::Display for AssignmentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drops repeated ids while keeping first-seen order.
pub fn dedupe_preserving_order(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn new_row(
    document_id: Uuid,
    user_id: Uuid,
    role: AssignmentRole,
    sequence_order: i32,
    completed_at: Option<NaiveDateTime>,
) -> NewAssignment {
    NewAssignment {
        id: Uuid::new_v4(),
        document_id,
        user_id,
        role: role.as_str().to_string(),
        sequence_order,
        is_completed: completed_at.is_some(),
        completed_at,
        assignment_notes: None,
    }
}

/// Creates the submitter row (already discharged by creating the document)
/// and one row per reviewer and approver in input order.
pub fn create_assignments(
    conn: &mut PgConnection,
    document_id: Uuid,
    submitter: Uuid,
    reviewers: &[Uuid],
    approvers: &[Uuid],
    now: NaiveDateTime,
) -> QueryResult<Vec<Assignment>> {
    let mut rows = vec![new_row(
        document_id,
        submitter,
        AssignmentRole::Submitter,
        0,
        Some(now),
    )];

    for (position, user_id) in dedupe_preserving_order(reviewers).into_iter().enumerate() {
        rows.push(new_row(
            document_id,
            user_id,
            AssignmentRole::Reviewer,
            position as i32,
            None,
        ));
    }
    for (position, user_id) in dedupe_preserving_order(approvers).into_iter().enumerate() {
        rows.push(new_row(
            document_id,
            user_id,
            AssignmentRole::Approver,
            position as i32,
            None,
        ));
    }

    diesel::insert_into(document_assignments::table)
        .values(&rows)
        .get_results(conn)
}

pub fn load_for_document(
    conn: &mut PgConnection,
    document_id: Uuid,
) -> QueryResult<Vec<Assignment>> {
    document_assignments::table
        .filter(document_assignments::document_id.eq(document_id))
        .order((
            document_assignments::role.asc(),
            document_assignments::sequence_order.asc(),
        ))
        .load(conn)
}

pub fn find_for_user(
    conn: &mut PgConnection,
    document_id: Uuid,
    user_id: Uuid,
    role: AssignmentRole,
) -> QueryResult<Option<Assignment>> {
    document_assignments::table
        .filter(document_assignments::document_id.eq(document_id))
        .filter(document_assignments::user_id.eq(user_id))
        .filter(document_assignments::role.eq(role.as_str()))
        .first(conn)
        .optional()
}

/// Marks an assignment completed only if it is not already; the conditional
/// update makes exactly one of two racing callers win.
pub fn complete_assignment(
    conn: &mut PgConnection,
    assignment_id: Uuid,
    notes: Option<&str>,
    now: NaiveDateTime,
) -> WorkflowResult<Assignment> {
    let updated = diesel::update(
        document_assignments::table
            .filter(document_assignments::id.eq(assignment_id))
            .filter(document_assignments::is_completed.eq(false)),
    )
    .set((
        document_assignments::is_completed.eq(true),
        document_assignments::completed_at.eq(Some(now)),
        document_assignments::assignment_notes.eq(notes.map(str::to_string)),
    ))
    .get_result::<Assignment>(conn)
    .optional()?;

    updated.ok_or_else(|| WorkflowError::conflict("assignment already completed"))
}

pub fn role_progress(
    conn: &mut PgConnection,
    document_id: Uuid,
    role: AssignmentRole,
) -> QueryResult<RoleProgress> {
    let flags: Vec<bool> = document_assignments::table
        .filter(document_assignments::document_id.eq(document_id))
        .filter(document_assignments::role.eq(role.as_str()))
        .select(document_assignments::is_completed)
        .load(conn)?;

    let completed = flags.iter().filter(|done| **done).count();
    Ok(RoleProgress::new(flags.len(), completed))
}

pub fn pending_users(
    conn: &mut PgConnection,
    document_id: Uuid,
    role: AssignmentRole,
) -> QueryResult<Vec<Uuid>> {
    document_assignments::table
        .filter(document_assignments::document_id.eq(document_id))
        .filter(document_assignments::role.eq(role.as_str()))
        .filter(document_assignments::is_completed.eq(false))
        .order(document_assignments::sequence_order.asc())
        .select(document_assignments::user_id)
        .load(conn)
}

/// Changes needed to move one role's assignments to a desired user list.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// New users with their sequence order.
    pub insert: Vec<(Uuid, i32)>,
    /// Existing assignment ids that stay, with their new sequence order.
    pub reorder: Vec<(Uuid, i32)>,
    /// Assignment ids to delete.
    pub delete: Vec<Uuid>,
    /// Users whose completed assignment was kept although they were removed.
    pub preserved: Vec<Uuid>,
}

impl ReconcilePlan {
    pub fn added_users(&self) -> Vec<Uuid> {
        self.insert.iter().map(|(user_id, _)| *user_id).collect()
    }
}

pub fn plan_reconcile(
    existing: &[Assignment],
    desired: &[Uuid],
    policy: AssignmentEditPolicy,
) -> ReconcilePlan {
    let desired = dedupe_preserving_order(desired);
    let by_user: HashMap<Uuid, &Assignment> = existing.iter().map(|a| (a.user_id, a)).collect();
    let wanted: HashSet<Uuid> = desired.iter().copied().collect();

    let mut plan = ReconcilePlan::default();

    for (position, user_id) in desired.iter().enumerate() {
        let order = position as i32;
        match by_user.get(user_id) {
            Some(assignment) => {
                if assignment.sequence_order != order {
                    plan.reorder.push((assignment.id, order));
                }
            }
            None => plan.insert.push((*user_id, order)),
        }
    }

    for assignment in existing {
        if wanted.contains(&assignment.user_id) {
            continue;
        }
        if assignment.is_completed && policy == AssignmentEditPolicy::Preserve {
            plan.preserved.push(assignment.user_id);
        } else {
            plan.delete.push(assignment.id);
        }
    }

    plan
}

/// Applies a desired reviewer or approver list. Completion flags of kept
/// rows are never touched.
pub fn reconcile_assignments(
    conn: &mut PgConnection,
    document_id: Uuid,
    role: AssignmentRole,
    desired: &[Uuid],
    policy: AssignmentEditPolicy,
) -> QueryResult<ReconcilePlan> {
    let existing: Vec<Assignment> = document_assignments::table
        .filter(document_assignments::document_id.eq(document_id))
        .filter(document_assignments::role.eq(role.as_str()))
        .load(conn)?;

    let plan = plan_reconcile(&existing, desired, policy);

    if !plan.delete.is_empty() {
        diesel::delete(
            document_assignments::table.filter(document_assignments::id.eq_any(&plan.delete)),
        )
        .execute(conn)?;
    }

    for (assignment_id, order) in &plan.reorder {
        diesel::update(document_assignments::table.find(*assignment_id))
            .set(document_assignments::sequence_order.eq(*order))
            .execute(conn)?;
    }

    if !plan.insert.is_empty() {
        let rows: Vec<NewAssignment> = plan
            .insert
            .iter()
            .map(|(user_id, order)| new_row(document_id, *user_id, role, *order, None))
            .collect();
        diesel::insert_into(document_assignments::table)
            .values(&rows)
            .execute(conn)?;
    }

    Ok(plan)
}
