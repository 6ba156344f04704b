mod smtp;
mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::users::UserRecord;

pub use smtp::SmtpMailer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Transport for transactional email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()>;
}

/// Builds and dispatches the registration and reset emails.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    frontend_base_url: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, frontend_base_url: impl Into<String>) -> Self {
        Self {
            mailer,
            frontend_base_url: frontend_base_url.into(),
        }
    }

    pub fn verification_link(&self, user: &UserRecord, token: &str) -> String {
        let mut url = format!("{}/verify-email?token={}", self.frontend_base_url, token);
        if user.rider.is_some() {
            url.push_str(&format!("&userId={}", user.id));
        }
        url
    }

    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.frontend_base_url, token)
    }

    pub async fn send_registration(&self, user: &UserRecord, token: &str) -> anyhow::Result<()> {
        let link = self.verification_link(user, token);
        let email = templates::registration(user, &link);
        self.dispatch(email, "registration").await
    }

    pub async fn send_password_reset(&self, user: &UserRecord, token: &str) -> anyhow::Result<()> {
        let link = self.reset_link(token);
        let email = templates::password_reset(user, &link);
        self.dispatch(email, "password reset").await
    }

    async fn dispatch(&self, email: OutgoingEmail, purpose: &'static str) -> anyhow::Result<()> {
        let to = email.to.clone();
        match self.mailer.send(email).await {
            Ok(()) => {
                info!(%to, purpose, "email sent");
                Ok(())
            }
            Err(e) => {
                error!(%to, purpose, error = %e, "email delivery failed");
                Err(e)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingMailer;
    use super::*;
    use crate::users::{RiderDetails, Role};
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn customer() -> UserRecord {
        let now = OffsetDateTime::now_utc();
        UserRecord {
            id: Uuid::new_v4(),
            first_name: "Ngozi".into(),
            last_name: "Eze".into(),
            email: "ngozi@x.com".into(),
            phone: "+1".into(),
            password_hash: String::new(),
            role: Role::Customer,
            is_verified: false,
            verify_email_token: "tok".into(),
            reset_token: None,
            reset_token_expiry: None,
            rider: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn registration_email_embeds_verification_link() {
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = Notifier::new(mailer.clone(), "https://app.test");
        let user = customer();
        notifier.send_registration(&user, "tok123").await.unwrap();

        let sent = mailer.last().unwrap();
        assert_eq!(sent.to, "ngozi@x.com");
        assert!(sent.body.contains("Hi Ngozi Eze"));
        assert!(sent.body.contains("https://app.test/verify-email?token=tok123"));
    }

    #[test]
    fn rider_verification_link_carries_user_id() {
        let notifier = Notifier::new(Arc::new(RecordingMailer::default()), "https://app.test");
        let mut user = customer();
        user.role = Role::Ryder;
        user.rider = Some(RiderDetails {
            city: "Lagos".into(),
            bike_doc: "a".into(),
            valid_id_card: "b".into(),
            passport_photo: "c".into(),
        });
        let link = notifier.verification_link(&user, "t");
        assert_eq!(link, format!("https://app.test/verify-email?token=t&userId={}", user.id));
    }

    #[tokio::test]
    async fn delivery_failure_is_returned() {
        let mailer = Arc::new(RecordingMailer::default());
        mailer.fail_sends(true);
        let notifier = Notifier::new(mailer.clone(), "https://app.test");
        assert!(notifier.send_password_reset(&customer(), "r").await.is_err());
        assert!(mailer.sent().is_empty());
    }
}
