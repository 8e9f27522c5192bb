//! Outbound mail
//!
//! Delivery itself is an external concern; the service only renders the
//! message and hands it to a [`Mailer`].

use async_trait::async_trait;

use crate::domain::events::OrderEvent;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Mail {
    pub fn order_confirmed(from: &str, to: &str, username: &str, event: &OrderEvent) -> Self {
        let OrderEvent::Confirmed { order_id, address, lines, .. } = event;
        let mut body = format!("{username}, your order #{order_id} has been placed!\n");
        for line in lines {
            body.push_str(&format!("{} ({} pcs)\n", line.name, line.quantity));
        }
        body.push_str(&format!("Delivery address: {address}\n"));
        Self { from: from.to_string(), to: to.to_string(), subject: "Order confirmation".to_string(), body }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), String>;
}

/// Writes outgoing mail to the log instead of delivering it.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), String> {
        tracing::info!(target: "mail", to = %mail.to, subject = %mail.subject, body = %mail.body, "Mail queued");
        Ok(())
    }
}
