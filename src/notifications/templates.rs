use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmailTemplate {
    AssignmentReviewer,
    AssignmentApprover,
    ReviewSubmitted,
    ApprovalSubmitted,
    ReadyForApproval,
    Reminder,
    StatusChanged,
}

impl EmailTemplate {
    pub const ALL: [EmailTemplate; 7] = [
        EmailTemplate::AssignmentReviewer,
        EmailTemplate::AssignmentApprover,
        EmailTemplate::ReviewSubmitted,
        EmailTemplate::ApprovalSubmitted,
        EmailTemplate::ReadyForApproval,
        EmailTemplate::Reminder,
        EmailTemplate::StatusChanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmailTemplate::AssignmentReviewer => "assignmentReviewer",
            EmailTemplate::AssignmentApprover => "assignmentApprover",
            EmailTemplate::ReviewSubmitted => "reviewSubmitted",
            EmailTemplate::ApprovalSubmitted => "approvalSubmitted",
            EmailTemplate::ReadyForApproval => "readyForApproval",
            EmailTemplate::Reminder => "reminder",
            EmailTemplate::StatusChanged => "statusChanged",
        }
    }

    fn heading(&self) -> &'static str {
        match self {
            EmailTemplate::AssignmentReviewer => "New review assignment",
            EmailTemplate::AssignmentApprover => "New approval assignment",
            EmailTemplate::ReviewSubmitted => "Review submitted",
            EmailTemplate::ApprovalSubmitted => "Approval recorded",
            EmailTemplate::ReadyForApproval => "Ready for approval",
            EmailTemplate::Reminder => "Reminder",
            EmailTemplate::StatusChanged => "Document status changed",
        }
    }
}

impl FromStr for EmailTemplate {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|template| template.as_str() == value.trim())
            .ok_or_else(|| format!("unknown email template '{value}'"))
    }
}

impl fmt::Display for EmailTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders the HTML body for `template`. Missing data fields render empty.
pub fn render(template: EmailTemplate, data: &Map<String, Value>, base_url: &str) -> String {
    let title = field(data, "document_title");
    let number = field(data, "document_number");
    let actor = field(data, "actor_name");
    let document = if number.is_empty() {
        format!("<strong>{title}</strong>")
    } else {
        format!("<strong>{title}</strong> ({number})")
    };

    let lead = match template {
        EmailTemplate::AssignmentReviewer => {
            format!("You have been assigned to review {document}.")
        }
        EmailTemplate::AssignmentApprover => {
            format!("You have been assigned as an approver for {document}. You can record your decision once all reviews are complete.")
        }
        EmailTemplate::ReviewSubmitted => format!(
            "{actor} submitted a review of {document}: {}.",
            field(data, "decision")
        ),
        EmailTemplate::ApprovalSubmitted => {
            format!("{actor} recorded an approval for {document}.")
        }
        EmailTemplate::ReadyForApproval => {
            format!("All reviews of {document} are complete. It is ready for your approval.")
        }
        EmailTemplate::Reminder => format!("{} {document}", field(data, "message")),
        EmailTemplate::StatusChanged => {
            format!("{document} is now <strong>{}</strong>.", field(data, "status"))
        }
    };

    let mut body = String::new();
    body.push_str("<!DOCTYPE html><html><body style=\"font-family:sans-serif\">");
    body.push_str(&format!("<h2>{}</h2>", template.heading()));

    let recipient = field(data, "recipient_name");
    if !recipient.is_empty() {
        body.push_str(&format!("<p>Hello {recipient},</p>"));
    }
    body.push_str(&format!("<p>{lead}</p>"));

    let due = field(data, "due_date");
    if !due.is_empty() {
        body.push_str(&format!("<p>Target date: {due}</p>"));
    }

    let reason = field(data, "reason");
    if !reason.is_empty() {
        body.push_str(&format!("<p>Reason: {reason}</p>"));
    }

    let comment = field(data, "comment");
    if !comment.is_empty() {
        body.push_str(&format!("<blockquote>{comment}</blockquote>"));
    }

    if let Some(document_id) = data.get("document_id").and_then(Value::as_str) {
        let link = format!(
            "{}/documents/{}",
            base_url.trim_end_matches('/'),
            escape_html(document_id)
        );
        body.push_str(&format!("<p><a href=\"{link}\">Open document</a></p>"));
    }

    body.push_str("</body></html>");
    body
}

fn field(data: &Map<String, Value>, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(value)) => escape_html(value),
        Some(Value::Null) | None => String::new(),
        Some(other) => escape_html(&other.to_string()),
    }
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
