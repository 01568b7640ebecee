use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailboxes, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::submission::record::SubmissionRecord;
use crate::submission::reference::ReferenceId;

#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub body: Bytes,
}

/// Files sent with the notification. The sign-off document always comes first.
#[derive(Debug, Clone, Default)]
pub struct AttachmentSet {
    items: Vec<Attachment>,
}

impl AttachmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filename: impl Into<String>, body: impl Into<Bytes>) {
        self.items.push(Attachment {
            filename: filename.into(),
            body: body.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn filenames(&self) -> Vec<String> {
        self.items.iter().map(|a| a.filename.clone()).collect()
    }
}

/// A fully resolved notification, independent of the transport.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    pub text: String,
    pub attachments: AttachmentSet,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), String>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| format!("SMTP relay error: {e}"))?
        } else {
            let tls = TlsParameters::new(config.host.clone())
                .map_err(|e| format!("SMTP TLS error: {e}"))?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .tls(Tls::Opportunistic(tls))
        };

        let mut builder = builder.port(config.port);
        if let Some(user) = &config.user {
            builder = builder.credentials(Credentials::new(
                user.clone(),
                config.pass.clone().unwrap_or_default(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), String> {
        let message = build_message(mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| format!("Failed to send email: {e}"))?;
        Ok(())
    }
}

pub fn build_message(mail: &OutgoingMail) -> Result<Message, String> {
    let mut builder = Message::builder()
        .from(
            mail.from
                .parse()
                .map_err(|e| format!("Invalid from address: {e}"))?,
        )
        .subject(mail.subject.clone());

    for mailbox in mailboxes(&mail.to, "to")? {
        builder = builder.to(mailbox);
    }
    for mailbox in mailboxes(&mail.cc, "cc")? {
        builder = builder.cc(mailbox);
    }
    for mailbox in mailboxes(&mail.bcc, "bcc")? {
        builder = builder.bcc(mailbox);
    }

    let pdf = ContentType::parse("application/pdf")
        .map_err(|e| format!("Invalid attachment content type: {e}"))?;

    let mut body = MultiPart::mixed().singlepart(SinglePart::plain(mail.text.clone()));
    for attachment in mail.attachments.iter() {
        body = body.singlepart(
            MimeAttachment::new(attachment.filename.clone())
                .body(attachment.body.to_vec(), pdf.clone()),
        );
    }

    builder
        .multipart(body)
        .map_err(|e| format!("Failed to build email: {e}"))
}

fn mailboxes(list: &str, field: &str) -> Result<Vec<lettre::message::Mailbox>, String> {
    if list.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: Mailboxes = list
        .parse()
        .map_err(|e| format!("Invalid {field} address: {e}"))?;
    Ok(parsed.into_iter().collect())
}

/// Sends sign-off documents to the resolved recipient. Exists only when a
/// mail transport is configured.
pub struct Notifier {
    config: SmtpConfig,
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    pub fn new(config: SmtpConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self { config, mailer }
    }

    pub fn compose(
        &self,
        reference: &ReferenceId,
        record: &SubmissionRecord,
        attachments: AttachmentSet,
    ) -> Result<OutgoingMail, String> {
        let to = resolve_recipient(record, &self.config)
            .ok_or_else(|| "No recipient: set toEmail, NOTIFY_TO or SMTP_USER".to_string())?;
        let from = self
            .config
            .sender()
            .ok_or_else(|| "No sender: set MAIL_FROM or SMTP_USER".to_string())?
            .to_string();

        Ok(OutgoingMail {
            from,
            to,
            cc: record.cc_email.clone().unwrap_or_default(),
            bcc: record.bcc_email.clone().unwrap_or_default(),
            subject: record
                .subject
                .clone()
                .unwrap_or_else(|| default_subject(reference)),
            text: record
                .message
                .clone()
                .unwrap_or_else(|| default_body(reference, record)),
            attachments,
        })
    }

    pub async fn notify(
        &self,
        reference: &ReferenceId,
        record: &SubmissionRecord,
        attachments: AttachmentSet,
    ) -> Result<(), String> {
        let mail = self.compose(reference, record, attachments)?;
        self.mailer.send(&mail).await?;
        tracing::info!(
            reference = %reference,
            to = %mail.to,
            attachments = mail.attachments.len(),
            "Sign-off emailed"
        );
        Ok(())
    }
}

/// First non-empty of: the record's `toEmail`, `NOTIFY_TO`, `SMTP_USER`.
pub fn resolve_recipient(record: &SubmissionRecord, config: &SmtpConfig) -> Option<String> {
    [
        record.to_email.as_deref(),
        config.notify_to.as_deref(),
        config.user.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|candidate| !candidate.is_empty())
    .map(str::to_string)
}

pub fn default_subject(reference: &ReferenceId) -> String {
    format!("OSD Sign-Off {reference}")
}

pub fn default_body(reference: &ReferenceId, record: &SubmissionRecord) -> String {
    format!(
        "New OSD submission {reference} from {} at {}.",
        record.driver_name.as_deref().unwrap_or("Driver"),
        record.location.as_deref().unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn smtp(notify_to: Option<&str>, user: Option<&str>) -> SmtpConfig {
        SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            secure: false,
            user: user.map(str::to_string),
            pass: None,
            notify_to: notify_to.map(str::to_string),
            from: Some("osd@example.com".to_string()),
        }
    }

    #[derive(Default)]
    struct Capture(Mutex<Vec<OutgoingMail>>);

    #[async_trait]
    impl Mailer for Capture {
        async fn send(&self, mail: &OutgoingMail) -> Result<(), String> {
            self.0.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    #[test]
    fn recipient_prefers_record_then_default_then_username() {
        let config = smtp(Some("dispatch@example.com"), Some("smtp-user@example.com"));
        let mut record = SubmissionRecord {
            to_email: Some("  driver-boss@example.com ".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_recipient(&record, &config).as_deref(),
            Some("driver-boss@example.com")
        );

        record.to_email = Some("   ".into());
        assert_eq!(
            resolve_recipient(&record, &config).as_deref(),
            Some("dispatch@example.com")
        );

        let config = smtp(None, Some("smtp-user@example.com"));
        assert_eq!(
            resolve_recipient(&record, &config).as_deref(),
            Some("smtp-user@example.com")
        );

        assert_eq!(resolve_recipient(&record, &smtp(None, None)), None);
    }

    #[test]
    fn defaults_embed_reference_driver_and_location() {
        let reference = ReferenceId::generate();
        let record = SubmissionRecord {
            location: Some("Dock 7".into()),
            ..Default::default()
        };
        assert_eq!(default_subject(&reference), format!("OSD Sign-Off {reference}"));
        assert_eq!(
            default_body(&reference, &record),
            format!("New OSD submission {reference} from Driver at Dock 7.")
        );
    }

    #[test]
    fn explicit_subject_message_and_copies_pass_through() {
        let notifier = Notifier::new(smtp(Some("dispatch@example.com"), None), Arc::new(Capture::default()));
        let record = SubmissionRecord {
            subject: Some("Dock 7 exceptions".into()),
            message: Some("See attached.".into()),
            cc_email: Some("a@example.com, b@example.com".into()),
            ..Default::default()
        };
        let mail = notifier
            .compose(&ReferenceId::generate(), &record, AttachmentSet::new())
            .unwrap();

        assert_eq!(mail.subject, "Dock 7 exceptions");
        assert_eq!(mail.text, "See attached.");
        assert_eq!(mail.cc, "a@example.com, b@example.com");
        assert_eq!(mail.bcc, "");
    }

    #[test]
    fn compose_fails_without_recipient() {
        let notifier = Notifier::new(smtp(None, None), Arc::new(Capture::default()));
        let err = notifier
            .compose(&ReferenceId::generate(), &SubmissionRecord::default(), AttachmentSet::new())
            .unwrap_err();
        assert!(err.contains("No recipient"));
    }

    #[tokio::test]
    async fn notify_hands_attachments_to_the_mailer() {
        let capture = Arc::new(Capture::default());
        let notifier = Notifier::new(smtp(Some("dispatch@example.com"), None), capture.clone());
        let reference = ReferenceId::generate();
        let mut attachments = AttachmentSet::new();
        attachments.push(reference.document_filename(), b"%PDF-doc".to_vec());
        attachments.push(reference.companion_attachment_name(), b"%PDF-bol".to_vec());

        notifier
            .notify(&reference, &SubmissionRecord::default(), attachments)
            .await
            .unwrap();

        let sent = capture.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].attachments.filenames(),
            vec![reference.document_filename(), reference.companion_attachment_name()]
        );
    }

    #[test]
    fn message_carries_copies_and_pdf_parts() {
        let mut attachments = AttachmentSet::new();
        attachments.push("OSD_abcd1234.pdf", b"%PDF-1.7".to_vec());
        let mail = OutgoingMail {
            from: "osd@example.com".into(),
            to: "dispatch@example.com".into(),
            cc: "a@example.com, b@example.com".into(),
            bcc: String::new(),
            subject: "OSD Sign-Off abcd1234".into(),
            text: "hello".into(),
            attachments,
        };

        let formatted = String::from_utf8(build_message(&mail).unwrap().formatted()).unwrap();
        assert!(formatted.contains("To: dispatch@example.com"));
        assert!(formatted.contains("a@example.com"));
        assert!(formatted.contains("b@example.com"));
        assert!(formatted.contains("application/pdf"));
        assert!(formatted.contains("OSD_abcd1234.pdf"));
    }

    #[test]
    fn invalid_copy_address_is_an_error() {
        let mail = OutgoingMail {
            from: "osd@example.com".into(),
            to: "dispatch@example.com".into(),
            cc: "not an address".into(),
            bcc: String::new(),
            subject: "s".into(),
            text: "t".into(),
            attachments: AttachmentSet::new(),
        };
        assert!(build_message(&mail).unwrap_err().contains("cc"));
    }
}
