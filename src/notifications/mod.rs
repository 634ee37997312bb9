//! Outbound notifications: in-app notification rows and queued emails.
//!
//! Dispatch happens after a workflow transaction has committed and is best
//! effort. A failed insert or enqueue is logged and skipped; it never undoes
//! the transition that produced the notice.

use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::jobs::enqueue_email;
use crate::models::{Document, NewNotification, User};
use crate::schema::{notifications, users};
use crate::workflow::status::status_of;

pub mod mailer;
pub mod templates;

pub use mailer::{build_mailer, Mailer, MailerError, RenderedEmail};
pub use templates::EmailTemplate;

/// Something a user should hear about: one in-app notification plus one email.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub user_id: Uuid,
    pub document_id: Option<Uuid>,
    pub template: EmailTemplate,
    pub subject: String,
    pub message: String,
    pub data: Map<String, Value>,
}

impl Notice {
    pub fn for_document(
        user_id: Uuid,
        document: &Document,
        template: EmailTemplate,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut data = Map::new();
        data.insert("document_id".into(), Value::String(document.id.to_string()));
        data.insert(
            "document_title".into(),
            Value::String(document.title.clone()),
        );
        data.insert(
            "document_number".into(),
            Value::String(document.document_number.clone()),
        );
        data.insert(
            "status".into(),
            Value::String(status_of(document).label().to_string()),
        );
        if let Some(target) = document.target_approval_date {
            data.insert("due_date".into(), Value::String(target.to_string()));
        }

        Self {
            user_id,
            document_id: Some(document.id),
            template,
            subject: subject.into(),
            message: message.into(),
            data,
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

/// Queued email payload; also the body accepted by the send-email endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub template: EmailTemplate,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl OutgoingEmail {
    pub fn render(&self, base_url: &str) -> RenderedEmail {
        RenderedEmail {
            to: self.to.clone(),
            subject: self.subject.clone(),
            html: templates::render(self.template, &self.data, base_url),
        }
    }
}

/// Records and queues every notice; returns how many were fully dispatched.
pub fn dispatch(conn: &mut PgConnection, notices: &[Notice]) -> usize {
    let mut delivered = 0usize;

    for notice in notices {
        let recipient: User = match users::table.find(notice.user_id).first(conn) {
            Ok(user) => user,
            Err(err) => {
                warn!(user_id = %notice.user_id, error = %err, "skipping notice for unknown recipient");
                continue;
            }
        };

        let row = NewNotification {
            id: Uuid::new_v4(),
            user_id: recipient.id,
            document_id: notice.document_id,
            title: notice.subject.clone(),
            message: notice.message.clone(),
        };
        if let Err(err) = diesel::insert_into(notifications::table)
            .values(&row)
            .execute(conn)
        {
            warn!(user_id = %recipient.id, error = %err, "failed to store in-app notification");
        }

        let mut data = notice.data.clone();
        data.insert(
            "recipient_name".into(),
            Value::String(recipient.full_name.clone()),
        );
        let email = OutgoingEmail {
            to: recipient.email.clone(),
            subject: notice.subject.clone(),
            template: notice.template,
            data,
        };

        match enqueue_email(conn, &email) {
            Ok(job) => {
                debug!(job_id = %job.id, template = %notice.template, to = %email.to, "email queued");
                delivered += 1;
            }
            Err(err) => {
                warn!(template = %notice.template, to = %email.to, error = %err, "failed to queue email");
            }
        }
    }

    delivered
}
