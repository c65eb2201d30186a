use std::time::Duration;

use async_trait::async_trait;
use futures_util::future;
use mail_builder::MessageBuilder;
use mail_send::SmtpClientBuilder;

use crate::{
    models::{referrals::Referral, referrers::Referrer},
    settings,
};

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Could not connect to mail server: {0}")]
    Connection(String),
    #[error("Could not deliver message to {0}: {1}")]
    Delivery(String, String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Sends one message. No retry is attempted on failure.
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError>;
}

/// Accepts only a bare `local@domain` mailbox. The address ends up verbatim in
/// the `To:` header and the `RCPT TO` command, so anything that could close
/// the angle brackets or start a new line is refused.
pub fn check_recipient(address: &str) -> Result<(), MailError> {
    let forbidden = |c: char| {
        c.is_ascii_control()
            || c.is_whitespace()
            || matches!(c, '<' | '>' | ',' | ';' | ':' | '"' | '(' | ')' | '[' | ']' | '\\')
    };

    let well_formed = match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !address.chars().any(forbidden)
        }
        None => false,
    };

    if well_formed {
        Ok(())
    } else {
        Err(MailError::Delivery(
            address.escape_debug().to_string(),
            "not a single mailbox address".to_string(),
        ))
    }
}

pub struct SmtpMailer {
    host: String,
    port: u16,
    implicit_tls: bool,
    username: String,
    password: String,
    from: String,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(settings: &settings::Smtp) -> Self {
        SmtpMailer {
            host: settings.host.clone(),
            port: settings.port,
            implicit_tls: settings.implicit_tls,
            username: settings.username.clone(),
            password: settings.password.clone(),
            from: settings.sender().to_string(),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        check_recipient(&mail.to)?;

        let message = MessageBuilder::new()
            .from(self.from.as_str())
            .to(mail.to.as_str())
            .subject(mail.subject.as_str())
            .html_body(mail.html.as_str());

        // One connection per message lets notifications go out concurrently.
        let mut client = SmtpClientBuilder::new(self.host.as_str(), self.port)
            .implicit_tls(self.implicit_tls)
            .credentials((self.username.as_str(), self.password.as_str()))
            .timeout(self.timeout)
            .connect()
            .await
            .map_err(|e| MailError::Connection(e.to_string()))?;

        client
            .send(message)
            .await
            .map_err(|e| MailError::Delivery(mail.to.clone(), e.to_string()))?;

        if let Err(e) = client.quit().await {
            log::debug!("SMTP quit after delivery to {} failed: {}", mail.to, e);
        }

        Ok(())
    }
}

/// Outcome of the post-commit notifications of one submission.
#[derive(Debug, Default)]
pub struct NotificationReport {
    pub failures: Vec<String>,
}

impl NotificationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sends the admin and referee notifications concurrently and waits for
/// both, whatever the outcome of either.
pub async fn notify_submission(
    mailer: &dyn Mailer,
    admin_email: &str,
    referrer: &Referrer,
    referral: &Referral,
) -> NotificationReport {
    let admin = admin_notification(admin_email, referrer, referral);
    let referee = referee_notification(referrer, referral);

    let (admin_result, referee_result) =
        future::join(mailer.send(&admin), mailer.send(&referee)).await;

    let mut report = NotificationReport::default();
    for (kind, result) in [("admin", admin_result), ("referee", referee_result)] {
        if let Err(e) = result {
            log::warn!("Referral {} {} notification failed: {}", referral.id, kind, e);
            report
                .failures
                .push(format!("The {} notification email could not be sent.", kind));
        }
    }

    report
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn phone_or_default(phone: &Option<String>) -> String {
    phone
        .as_deref()
        .map(escape)
        .unwrap_or_else(|| "Not provided".to_string())
}

pub fn admin_notification(
    admin_email: &str,
    referrer: &Referrer,
    referral: &Referral,
) -> OutboundMail {
    let html = format!(
        r#"<h2>New Referral Received</h2>
<h3>Referrer Details:</h3>
<p><strong>Name:</strong> {}</p>
<p><strong>Email:</strong> {}</p>
<p><strong>Phone:</strong> {}</p>
<p><strong>Total Referrals:</strong> {}</p>
<h3>Referee Details:</h3>
<p><strong>Name:</strong> {}</p>
<p><strong>Email:</strong> {}</p>
<p><strong>Phone:</strong> {}</p>
<p><strong>Field of Work:</strong> {}</p>
<p><strong>Program:</strong> {}</p>
"#,
        escape(&referrer.name),
        escape(&referrer.email),
        phone_or_default(&referrer.phone),
        referrer.referral_count,
        escape(&referral.name),
        escape(&referral.email),
        phone_or_default(&referral.phone),
        escape(&referral.field_of_work),
        escape(&referral.program),
    );

    OutboundMail {
        to: admin_email.to_string(),
        subject: "New Referral Submission".to_string(),
        html,
    }
}

pub fn referee_notification(referrer: &Referrer, referral: &Referral) -> OutboundMail {
    let program = escape(&referral.program);
    let html = format!(
        r#"<h2>Welcome to Our Program!</h2>
<p>Hello {name},</p>
<p>You have been referred to our {program} program by {referrer}.</p>
<p>We're excited to have you join us! Our team will review your details and contact you soon.</p>
<h3>Program Details:</h3>
<p><strong>Selected Program:</strong> {program}</p>
<p><strong>Your Field of Work:</strong> {field}</p>
<br>
<p>If you have any questions, feel free to reach out to us.</p>
<p>Best regards,<br>The Team</p>
"#,
        name = escape(&referral.name),
        program = program,
        referrer = escape(&referrer.name),
        field = escape(&referral.field_of_work),
    );

    OutboundMail {
        to: referral.email.clone(),
        subject: "You have been referred to our program".to_string(),
        html,
    }
}
