//! Live-browser smoke tests. These need a local Chromium and reachable
//! portal credentials, so they are ignored by default:
//! `cargo test -- --ignored`.

use noble_erp::browser::{BrowserPool, EnginePool};
use noble_erp::{format, logging, Config, Credential, Domain, Portal};

fn env_credential() -> Credential {
    Credential {
        user_id: 1,
        username: std::env::var("ERP_USERNAME").expect("ERP_USERNAME not set"),
        secret: std::env::var("ERP_PASSWORD").expect("ERP_PASSWORD not set"),
    }
}

#[tokio::test]
#[ignore]
async fn test_engine_probe_launch() {
    logging::init();
    let config = Config::from_env();

    let pool = BrowserPool::start(config).await.expect("engine should launch");
    let ctx = pool.acquire().await.expect("context should be acquirable");
    pool.release(ctx).await;
}

#[tokio::test]
#[ignore]
async fn test_login_and_session_reuse() {
    logging::init();
    let config = Config::from_env();

    let portal = Portal::initialize(config).await.expect("portal init failed");
    portal.save_credential(env_credential()).await.unwrap();

    let first = portal.get_or_create(1).await.expect("login failed");
    let second = portal.get_or_create(1).await.expect("reuse failed");
    assert_eq!(first.context_serial, second.context_serial);

    portal.invalidate(1).await;
}

#[tokio::test]
#[ignore]
async fn test_full_fetch_cycle() {
    logging::init();
    let config = Config::from_env();

    let portal = Portal::initialize(config).await.expect("portal init failed");
    portal.save_credential(env_credential()).await.unwrap();

    for domain in [Domain::Attendance, Domain::Fees, Domain::Exam, Domain::Profile] {
        let record = portal.extract(domain, 1).await.expect("extraction errored");
        println!("{}", format::format(&record));
    }

    portal.invalidate(1).await;
}
