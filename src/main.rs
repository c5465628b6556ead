use anyhow::{Context, Result};
use tracing::{error, info};

use noble_erp::{format, logging, Config, Credential, Domain, Portal};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env();
    let portal = Portal::initialize(config).await?;

    let user_id: i64 = std::env::var("ERP_USER_ID")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);
    let username = std::env::var("ERP_USERNAME").context("ERP_USERNAME not set")?;
    let secret = std::env::var("ERP_PASSWORD").context("ERP_PASSWORD not set")?;
    portal
        .save_credential(Credential { user_id, username, secret })
        .await?;

    for domain in [Domain::Attendance, Domain::Fees, Domain::Exam, Domain::Profile] {
        match portal.extract(domain, user_id).await {
            Ok(record) => info!("\n{}", format::format(&record)),
            Err(e) => error!("{domain}: {e}"),
        }
    }

    portal.invalidate(user_id).await;
    Ok(())
}
