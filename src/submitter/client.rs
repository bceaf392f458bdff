//! HTTP client wrapper for Google Form submission.

use thiserror::Error;
use tracing::{debug, info};

use super::RateLimiter;
use crate::answers::AnswerRecord;
use crate::config::FormConfig;

/// Errors that can occur during form submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("No answer saved for required field '{field}'")]
    MissingAnswer { field: String },

    #[error("Form rejected the submission with HTTP status {status}")]
    Rejected { status: u16 },

    #[error("Network error during submission: {0}")]
    Network(#[from] reqwest::Error),
}

/// Outcome of one successful form submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionResult {
    /// HTTP status returned by the form endpoint.
    pub status: u16,
}

/// Builds the form-encoded payload for a record.
///
/// The payload contains exactly the record's field/value pairs, in stable
/// key order. Fails before any network activity when a required field has
/// no saved answer.
///
/// # Errors
///
/// Returns [`SubmitError::MissingAnswer`] naming the first required field
/// without a saved value.
pub fn build_payload(
    form: &FormConfig,
    record: &AnswerRecord,
) -> Result<Vec<(String, String)>, SubmitError> {
    for field in form.required_fields() {
        let missing = record.get(&field.key).is_none_or(str::is_empty);
        if missing {
            return Err(SubmitError::MissingAnswer {
                field: field.label.clone(),
            });
        }
    }

    Ok(record
        .iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect())
}

/// Submits saved answers to the configured Google Form.
pub struct FormSubmitter {
    /// The underlying HTTP client.
    client: reqwest::Client,

    /// Rate limiter spacing consecutive submissions.
    rate_limiter: RateLimiter,
}

impl FormSubmitter {
    /// Creates a new submitter with the given minimum interval between
    /// submissions.
    #[must_use]
    pub fn new(min_submit_interval_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            rate_limiter: RateLimiter::from_secs(min_submit_interval_secs),
        }
    }

    /// Submits one record to the form with a single HTTP POST.
    ///
    /// No retries are attempted; the caller decides how to react to a
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::MissingAnswer`] (before any network call) for
    /// an incomplete record, [`SubmitError::Rejected`] on a non-2xx
    /// response, or [`SubmitError::Network`] on a transport failure.
    pub async fn submit(
        &self,
        form: &FormConfig,
        record: &AnswerRecord,
    ) -> Result<SubmissionResult, SubmitError> {
        let payload = build_payload(form, record)?;
        let url = form.response_url();

        self.rate_limiter.wait_and_acquire().await;

        debug!("Submitting {} answer(s) to {}", payload.len(), url);

        let response = self.client.post(&url).form(&payload).send().await?;
        let status = response.status();

        if status.is_success() {
            info!("Form accepted submission (HTTP {})", status.as_u16());
            Ok(SubmissionResult {
                status: status.as_u16(),
            })
        } else {
            Err(SubmitError::Rejected {
                status: status.as_u16(),
            })
        }
    }

    /// Returns the time remaining until the next submission is allowed.
    pub async fn time_until_allowed(&self) -> std::time::Duration {
        self.rate_limiter.time_until_allowed().await
    }
}

impl std::fmt::Debug for FormSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSubmitter")
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormField;

    fn form() -> FormConfig {
        FormConfig {
            url: "https://docs.google.com/forms/d/e/ABC123/viewform".to_owned(),
            fields: vec![
                FormField::new("entry.1".to_owned(), "temperature".to_owned(), true),
                FormField::new("entry.2".to_owned(), "remarks".to_owned(), false),
            ],
        }
    }

    #[test]
    fn test_payload_contains_exactly_the_saved_pairs() {
        let mut record = AnswerRecord::new();
        record.set("entry.1", "36.5");
        record.set("entry.2", "feeling fine");

        let payload = build_payload(&form(), &record).unwrap();
        assert_eq!(
            payload,
            vec![
                ("entry.1".to_owned(), "36.5".to_owned()),
                ("entry.2".to_owned(), "feeling fine".to_owned()),
            ]
        );
    }

    #[test]
    fn test_payload_omits_unanswered_optional_fields() {
        let mut record = AnswerRecord::new();
        record.set("entry.1", "36.5");

        let payload = build_payload(&form(), &record).unwrap();
        assert_eq!(payload, vec![("entry.1".to_owned(), "36.5".to_owned())]);
    }

    #[test]
    fn test_empty_record_fails_with_missing_answer() {
        let record = AnswerRecord::new();

        let err = build_payload(&form(), &record).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::MissingAnswer { ref field } if field == "temperature"
        ));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut record = AnswerRecord::new();
        record.set("entry.1", "");

        assert!(matches!(
            build_payload(&form(), &record),
            Err(SubmitError::MissingAnswer { .. })
        ));
    }

    #[tokio::test]
    async fn test_submit_incomplete_record_makes_no_network_call() {
        // The form URL resolves nowhere; an attempted request would fail
        // with a network error rather than the pre-flight MissingAnswer.
        let mut bad_host = form();
        bad_host.url = "http://127.0.0.1:1/formResponse".to_owned();

        let submitter = FormSubmitter::new(0);
        let err = submitter
            .submit(&bad_host, &AnswerRecord::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SubmitError::MissingAnswer { .. }));
    }
}
