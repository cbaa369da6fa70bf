//! Digest formatting and hand-off to the mail transport.

use std::sync::Arc;

use {
    chrono::{DateTime, Utc},
    chrono_tz::Tz,
    slackntell_mail::{Mailer, OutgoingMail},
    tracing::{error, info},
};

const SUBJECT_TAG: &str = "[slackntell]";

/// One historical chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telling {
    pub ts: DateTime<Utc>,
    /// Sender display name, already resolved.
    pub user: String,
    pub text: String,
}

/// Everything needed for one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    /// Resolved name of the triggering conversation.
    pub context: Option<String>,
    /// Resolved name of the triggering sender.
    pub user: Option<String>,
    /// Oldest first.
    pub tellings: Vec<Telling>,
}

/// `[slackntell] #context @user`, each suffix omitted when unresolved.
pub fn subject(context: Option<&str>, user: Option<&str>) -> String {
    let mut subject = String::from(SUBJECT_TAG);
    if let Some(context) = context {
        subject.push_str(" #");
        subject.push_str(context);
    }
    if let Some(user) = user {
        subject.push_str(" @");
        subject.push_str(user);
    }
    subject
}

/// One `HH:MM:SS @user: text` line per telling.
pub fn body(tellings: &[Telling], timezone: Tz) -> String {
    tellings
        .iter()
        .map(|t| {
            format!(
                "{} @{}: {}",
                t.ts.with_timezone(&timezone).format("%H:%M:%S"),
                t.user,
                t.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders digests and sends them to a fixed recipient.
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    from: String,
    to: String,
    timezone: Tz,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, from: String, to: String, timezone: Tz) -> Self {
        Self {
            mailer,
            from,
            to,
            timezone,
        }
    }

    pub fn render(&self, digest: &Digest) -> OutgoingMail {
        OutgoingMail {
            from: self.from.clone(),
            to: self.to.clone(),
            subject: subject(digest.context.as_deref(), digest.user.as_deref()),
            body: body(&digest.tellings, self.timezone),
        }
    }

    /// Send one digest. A transport failure is logged and reported as
    /// `false`; it never stops the relay.
    pub async fn notify(&self, digest: Digest) -> bool {
        let mail = self.render(&digest);
        let subject = mail.subject.clone();
        match self.mailer.send(mail).await {
            Ok(()) => {
                info!(%subject, lines = digest.tellings.len(), "digest sent");
                true
            },
            Err(e) => {
                error!(%subject, error = %e, "failed to send digest");
                false
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::test_support::RecordingMailer,
        chrono::TimeZone,
        rstest::rstest,
    };

    fn telling(h: u32, m: u32, s: u32, user: &str, text: &str) -> Telling {
        Telling {
            ts: Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap(),
            user: user.into(),
            text: text.into(),
        }
    }

    #[rstest]
    #[case(Some("general"), Some("alice"), "[slackntell] #general @alice")]
    #[case(Some("general"), None, "[slackntell] #general")]
    #[case(None, Some("alice"), "[slackntell] @alice")]
    #[case(None, None, "[slackntell]")]
    fn subject_omits_unresolved_parts(
        #[case] context: Option<&str>,
        #[case] user: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(subject(context, user), expected);
    }

    #[test]
    fn body_lines_are_newline_joined() {
        let tellings = vec![
            telling(9, 15, 0, "alice", "standup?"),
            telling(9, 16, 5, "bob", "in 5"),
        ];
        assert_eq!(
            body(&tellings, Tz::UTC),
            "09:15:00 @alice: standup?\n09:16:05 @bob: in 5"
        );
    }

    #[test]
    fn body_renders_in_configured_timezone() {
        let tellings = vec![telling(9, 15, 0, "alice", "hi")];
        assert_eq!(
            body(&tellings, chrono_tz::Europe::Berlin),
            "10:15:00 @alice: hi"
        );
    }

    #[test]
    fn empty_digest_has_empty_body() {
        assert_eq!(body(&[], Tz::UTC), "");
    }

    #[tokio::test]
    async fn notify_hands_rendered_mail_to_transport() {
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = Notifier::new(
            mailer.clone(),
            "relay@example.com".into(),
            "me@example.com".into(),
            Tz::UTC,
        );
        let sent = notifier
            .notify(Digest {
                context: Some("general".into()),
                user: Some("alice".into()),
                tellings: vec![telling(8, 0, 0, "alice", "morning")],
            })
            .await;

        assert!(sent);
        let mails = mailer.mails();
        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].from, "relay@example.com");
        assert_eq!(mails[0].to, "me@example.com");
        assert_eq!(mails[0].subject, "[slackntell] #general @alice");
        assert_eq!(mails[0].body, "08:00:00 @alice: morning");
    }

    #[tokio::test]
    async fn transport_failure_is_absorbed() {
        let mailer = Arc::new(RecordingMailer::failing());
        let notifier = Notifier::new(
            mailer.clone(),
            "relay@example.com".into(),
            "me@example.com".into(),
            Tz::UTC,
        );
        let sent = notifier
            .notify(Digest {
                context: None,
                user: None,
                tellings: Vec::new(),
            })
            .await;
        assert!(!sent);
        assert!(mailer.mails().is_empty());
    }
}
