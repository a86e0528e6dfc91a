use tracing::info;

/// Simulated outbound mail. Messages are written to the log instead of a
/// provider; swap the body of `send` for a real transport when one exists.
#[derive(Debug, Clone, Default)]
pub struct MailerService;

impl MailerService {
    pub fn new() -> Self {
        Self
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) {
        info!(to, subject, "sending mail\n{body}");
    }
}
