use crate::config::EmailConfig;
use crate::errors::{ServiceError, ServiceResult};
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::str::FromStr;

pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    config: EmailConfig,
}

impl EmailService {
    /// Creates a new EmailService instance
    pub fn new(config: EmailConfig) -> ServiceResult<Self> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| ServiceError::validation(format!("Invalid SMTP host: {e}")))?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        Ok(Self { mailer, config })
    }

    /// Sends the registration confirmation code to a new sign-up
    pub async fn send_verification_email(
        &self,
        recipient_email: &str,
        recipient_name: Option<&str>,
        otp: &str,
        ttl_minutes: i64,
    ) -> ServiceResult<()> {
        let subject = "Confirm your email address";
        let name = recipient_name.unwrap_or("there");

        let html_content = self.build_otp_html(
            name,
            "Use the code below to confirm your email address and finish creating your account.",
            otp,
            ttl_minutes,
        );
        let text_content = format!(
            "Hi {name},\n\nYour verification code is: {otp}\n\nIt expires in {ttl_minutes} minutes. If you didn't sign up, you can safely ignore this email.\n"
        );

        self.send_email(recipient_email, subject, &html_content, &text_content)
            .await
    }

    /// Sends a password-reset code to an existing user
    pub async fn send_password_reset_email(
        &self,
        recipient_email: &str,
        recipient_name: Option<&str>,
        otp: &str,
        ttl_minutes: i64,
    ) -> ServiceResult<()> {
        let subject = "Reset your password";
        let name = recipient_name.unwrap_or("there");

        let html_content = self.build_otp_html(
            name,
            "Use the code below to reset your password.",
            otp,
            ttl_minutes,
        );
        let text_content = format!(
            "Hi {name},\n\nYour password reset code is: {otp}\n\nIt expires in {ttl_minutes} minutes. If you didn't request a reset, you can safely ignore this email.\n"
        );

        self.send_email(recipient_email, subject, &html_content, &text_content)
            .await
    }

    /// Sends a generic email
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> ServiceResult<()> {
        let from_mailbox = Mailbox::from_str(&format!(
            "{} <{}>",
            self.config.from_name, self.config.from_email
        ))
        .map_err(|e| ServiceError::validation(format!("Invalid from email: {e}")))?;

        let to_mailbox = Mailbox::from_str(to_email)
            .map_err(|e| ServiceError::validation(format!("Invalid recipient email: {e}")))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_content.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_content.to_string()),
                    ),
            )
            .map_err(|e| ServiceError::validation(format!("Failed to build email: {e}")))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| ServiceError::external_service(format!("Failed to send email: {e}")))?;

        Ok(())
    }

    fn build_otp_html(
        &self,
        recipient_name: &str,
        instruction: &str,
        otp: &str,
        ttl_minutes: i64,
    ) -> String {
        format!(
            r#"
            <!DOCTYPE html>
            <html>
            <head>
                <meta charset="UTF-8">
                <title>Your verification code</title>
            </head>
            <body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
                <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
                    <p>Hi {},</p>

                    <p>{}</p>

                    <div style="text-align: center; margin: 30px 0;">
                        <span style="font-size: 32px; letter-spacing: 8px; font-weight: bold;
                                     background-color: #f4f6f8; padding: 12px 24px;
                                     border-radius: 5px; display: inline-block;">
                            {}
                        </span>
                    </div>

                    <hr style="border: none; border-top: 1px solid #ecf0f1; margin: 30px 0;">

                    <p style="font-size: 12px; color: #7f8c8d;">
                        This code will expire in {} minutes. If you didn't request it,
                        you can safely ignore this email.
                    </p>
                </div>
            </body>
            </html>
            "#,
            recipient_name, instruction, otp, ttl_minutes
        )
    }
}
