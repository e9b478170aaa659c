//! Contact form validation and mail dispatch
//!
//! [`submit`] validates a [`ContactForm`], composes an [`OutgoingMail`] and
//! hands it to a [`MailRelay`]. Every outcome is reported as a
//! [`SubmissionResult`]; nothing here panics on bad input or a failed relay.
//!
//! The bundled relay is [`OutboxRelay`], which appends each message as one
//! JSON line to `outbox.jsonl` in the state directory. Real transports plug in
//! by implementing [`MailRelay`].

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use validator::{Validate, ValidationErrors};

pub const MESSAGE_SENT: &str = "Your message has been sent successfully!";
pub const MESSAGE_INVALID: &str = "Validation failed. Please check your inputs.";
pub const MESSAGE_FAILED: &str = "Failed to send your message. Please try again later.";

const SUBJECT_PREFIX: &str = "FireGuard Contact: ";
const OUTBOX_FILE: &str = "outbox.jsonl";

/// Fields are checked after trimming, see [`ContactForm::validated`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ContactForm {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 10, message = "Message must be at least 10 characters"))]
    pub message: String,
}

/// Field names in form order, used to order reported errors
const FIELDS: [&str; 5] = ["first_name", "last_name", "email", "subject", "message"];

/// One rejected form field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl ContactForm {
    /// Trims every field, validates the result and returns it.
    ///
    /// # Errors
    ///
    /// Returns all field errors, in form order, not just the first.
    pub fn validated(&self) -> std::result::Result<Self, Vec<FieldError>> {
        let form = self.trimmed();
        match Validate::validate(&form) {
            Ok(()) => Ok(form),
            Err(errors) => Err(field_errors(&errors)),
        }
    }

    fn trimmed(&self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            subject: self.subject.trim().to_string(),
            message: self.message.trim().to_string(),
        }
    }
}

/// Flattens `errors` to the first message of each field, in form order
fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let by_field = errors.field_errors();
    FIELDS
        .iter()
        .filter_map(|field| {
            let error = by_field.get(*field)?.first()?;
            let message = error.message.as_deref().unwrap_or(&*error.code);
            Some(FieldError::new(field, message))
        })
        .collect()
}

/// Account used to relay contact mail
#[derive(Clone, PartialEq, Eq)]
pub struct RelayCredentials {
    pub user: String,
    pub password: String,
    pub recipient: String,
}

impl std::fmt::Debug for RelayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .finish()
    }
}

impl RelayCredentials {
    /// Reads `EMAIL_USER`, `EMAIL_PASSWORD` and `EMAIL_RECIPIENT`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mail`] if the user or password is unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], reading from an arbitrary source. Blank
    /// values count as unset; the recipient defaults to the user.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let user = get("EMAIL_USER").ok_or_else(|| Error::mail("EMAIL_USER is not set"))?;
        let password =
            get("EMAIL_PASSWORD").ok_or_else(|| Error::mail("EMAIL_PASSWORD is not set"))?;
        let recipient = get("EMAIL_RECIPIENT").unwrap_or_else(|| user.clone());

        Ok(Self {
            user,
            password,
            recipient,
        })
    }
}

/// Composed message, ready for a relay
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl OutgoingMail {
    /// Builds the mail for an already validated form
    pub fn compose(form: &ContactForm, credentials: &RelayCredentials) -> Self {
        let name = format!("{} {}", form.first_name, form.last_name);
        let text = format!(
            "Name: {name}\nEmail: {}\n\nMessage:\n{}\n",
            form.email, form.message
        );
        let html = format!(
            "<h2>New Contact Form Submission</h2>\n\
             <p><strong>Name:</strong> {}</p>\n\
             <p><strong>Email:</strong> {}</p>\n\
             <p><strong>Subject:</strong> {}</p>\n\
             <h3>Message:</h3>\n\
             <p>{}</p>\n",
            escape_html(&name),
            escape_html(&form.email),
            escape_html(&form.subject),
            escape_html(&form.message).replace('\n', "<br>"),
        );

        Self {
            from: credentials.user.clone(),
            to: credentials.recipient.clone(),
            subject: format!("{SUBJECT_PREFIX}{}", form.subject),
            text,
            html,
        }
    }
}

/// Escapes user text for the HTML body. Both quote styles are escaped so the
/// output is also safe inside single- or double-quoted attributes.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            // HTML 4 has no &apos;, the numeric form works everywhere
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Mail transport
pub trait MailRelay {
    /// Account the mail is sent from and to
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mail`] if the relay is not configured.
    fn credentials(&self) -> Result<&RelayCredentials>;

    /// Delivers one message
    fn deliver(&self, mail: OutgoingMail) -> impl Future<Output = Result<()>> + Send;
}

/// Outcome reported back to the form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl SubmissionResult {
    fn sent() -> Self {
        Self {
            success: true,
            message: MESSAGE_SENT.to_string(),
            errors: Vec::new(),
        }
    }

    fn invalid(errors: Vec<FieldError>) -> Self {
        Self {
            success: false,
            message: MESSAGE_INVALID.to_string(),
            errors,
        }
    }

    fn failed() -> Self {
        Self {
            success: false,
            message: MESSAGE_FAILED.to_string(),
            errors: Vec::new(),
        }
    }
}

/// Validates `form` and relays it.
pub async fn submit<R: MailRelay>(form: &ContactForm, relay: &R) -> SubmissionResult {
    let form = match form.validated() {
        Ok(form) => form,
        Err(errors) => {
            tracing::info!(errors = errors.len(), "Contact form rejected");
            return SubmissionResult::invalid(errors);
        }
    };

    let credentials = match relay.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::error!("Error sending email: {e}");
            return SubmissionResult::failed();
        }
    };

    let mail = OutgoingMail::compose(&form, credentials);
    match relay.deliver(mail).await {
        Ok(()) => {
            tracing::info!(subject = %form.subject, "Contact message sent");
            SubmissionResult::sent()
        }
        Err(e) => {
            tracing::error!("Error sending email: {e}");
            SubmissionResult::failed()
        }
    }
}

/// One queued message in the outbox file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub queued_at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    pub mail: OutgoingMail,
}

/// Relay that queues messages in a local JSON-lines file
#[derive(Debug, Clone)]
pub struct OutboxRelay {
    path: PathBuf,
    credentials: Option<RelayCredentials>,
}

impl OutboxRelay {
    pub fn new(path: impl Into<PathBuf>, credentials: Option<RelayCredentials>) -> Self {
        Self {
            path: path.into(),
            credentials,
        }
    }

    /// Outbox in the state directory, credentials from the environment
    ///
    /// # Errors
    ///
    /// Returns `Err` if the state directory cannot be determined.
    pub fn from_env() -> Result<Self> {
        let mut path = crate::utils::get_state_dir()
            .ok_or_else(|| Error::Internal("State directory not found".to_string()))?;
        path.push(OUTBOX_FILE);

        let credentials = match RelayCredentials::from_env() {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                tracing::warn!("Mail relay not configured: {e}");
                None
            }
        };
        Ok(Self::new(path, credentials))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the most recent queued messages, newest first
    ///
    /// # Errors
    ///
    /// Returns `Err` if the outbox cannot be read.
    pub async fn read_recent(&self, count: usize) -> Result<Vec<OutboxEntry>> {
        let content = tokio::fs::read_to_string(&self.path).await?;

        Ok(content
            .lines()
            .rev()
            .filter_map(|line| serde_json::from_str(line).ok())
            .take(count)
            .collect())
    }
}

impl MailRelay for OutboxRelay {
    fn credentials(&self) -> Result<&RelayCredentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| Error::mail("relay credentials are not configured"))
    }

    async fn deliver(&self, mail: OutgoingMail) -> Result<()> {
        let entry = OutboxEntry {
            queued_at: chrono::Utc::now(),
            mail,
        };
        let json = serde_json::to_string(&entry)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::mail(format!("cannot open outbox: {e}")))?;

        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.sync_all().await?;

        tracing::debug!(path = %self.path.display(), "Queued contact mail");
        Ok(())
    }
}
