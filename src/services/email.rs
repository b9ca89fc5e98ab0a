use async_trait::async_trait;
use std::env;
use tracing::info;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Abstraction de l'envoi d'email, injectée dans les routes au démarrage
/// Permet de substituer un faux sender dans les tests
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), String>;
}

/// Sender de production: API HTTP de Resend
pub struct ResendMailer {
    api_key: String,
    from_email: String,
    client: reqwest::Client,
}

impl ResendMailer {
    pub fn from_env() -> Self {
        let api_key = env::var("RESEND_API_KEY")
            .expect("RESEND_API_KEY must be set in .env file");
        let from_email = env::var("RESEND_FROM_EMAIL")
            .expect("RESEND_FROM_EMAIL must be set in .env file");

        Self {
            api_key,
            from_email,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmailSender for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), String> {
        let body = serde_json::json!({
            "from": format!("TrackMyHomeschool <{}>", self.from_email),
            "to": [to],
            "subject": subject,
            "html": html,
        });

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Resend request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Resend returned status {}", response.status()));
        }

        info!("Email sent to {}: {}", to, subject);
        Ok(())
    }
}

/// Corps HTML de l'email d'OTP d'inscription
pub fn otp_email_html(otp: &str) -> String {
    format!(
        r#"
        <p>Hi there,</p>
        <p>Your OTP is: <strong>{}</strong></p>
        <p>This code will expire in 10 minutes.</p>
        <br/>
        <p>Thanks,<br/>Track My Homeschool Team</p>
        "#,
        otp
    )
}

/// Corps HTML de l'email d'OTP de reset password
pub fn reset_otp_email_html(otp: &str) -> String {
    format!(
        r#"
        <p>Hello,</p>
        <p>Your OTP for resetting your password is: <strong>{}</strong></p>
        <p>This code will expire in 10 minutes.</p>
        <br/>
        <p>Track My Homeschool Team</p>
        "#,
        otp
    )
}
