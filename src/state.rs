use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::domain::events::DomainEvent;
use crate::domain::pricing::PricingPolicy;
use crate::services::events::EventPublisher;
use crate::services::google::GoogleOAuth;
use crate::services::mailer::{LogMailer, Mailer, SmtpMailer};
use crate::services::razorpay::RazorpayClient;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub events: EventPublisher,
    pub mailer: Arc<dyn Mailer>,
    /// `None` when online payment is not configured.
    pub razorpay: Option<RazorpayClient>,
    pub google: Option<GoogleOAuth>,
}

impl AppState {
    /// Builds clients from `config`; external connections are made lazily.
    pub fn new(db: PgPool, config: Config, events: EventPublisher) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(std::time::Duration::from_secs(15)).build()?;
        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp, &config.mail_from)?),
            None => Arc::new(LogMailer),
        };
        let razorpay = config.razorpay.clone().map(|rp| RazorpayClient::new(http.clone(), rp));
        let google = config.google.clone().map(|g| GoogleOAuth::new(http, g));
        Ok(Self { db, config: Arc::new(config), events, mailer, razorpay, google })
    }

    pub fn pricing(&self) -> PricingPolicy { self.config.pricing() }

    pub async fn publish(&self, events: Vec<DomainEvent>) { self.events.publish(events).await }
}
