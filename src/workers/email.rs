use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    jobs::{JOB_SEND_EMAIL, MAX_EMAIL_ATTEMPTS},
    models::Job,
    notifications::{MailerError, OutgoingEmail},
    state::AppState,
};

use super::{JobExecution, JobHandler};

const RETRY_DELAY: Duration = Duration::from_secs(60);

/// Delivers one queued email. Failures stay inside the queue; the workflow
/// transition that queued the message has long since committed.
pub struct SendEmailJob;

impl SendEmailJob {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SendEmailJob {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobHandler for SendEmailJob {
    fn job_type(&self) -> &'static str {
        JOB_SEND_EMAIL
    }

    async fn handle(&self, state: Arc<AppState>, job: Job) -> JobExecution {
        let email: OutgoingEmail = match serde_json::from_value(job.payload.clone()) {
            Ok(email) => email,
            Err(err) => {
                return JobExecution::Failed {
                    error: format!("invalid email payload: {err}"),
                }
            }
        };

        let rendered = email.render(&state.config.app_base_url);
        debug!(job_id = %job.id, to = %rendered.to, template = %email.template, "sending email");

        match state.mailer.send(&rendered).await {
            Ok(()) => JobExecution::Success,
            Err(err) => outcome_for_failure(&err, job.attempts),
        }
    }
}

fn outcome_for_failure(err: &MailerError, attempts: i32) -> JobExecution {
    if err.is_transient() && attempts < MAX_EMAIL_ATTEMPTS {
        JobExecution::Retry {
            delay: RETRY_DELAY,
            error: err.to_string(),
        }
    } else {
        JobExecution::Failed {
            error: err.to_string(),
        }
    }
}
