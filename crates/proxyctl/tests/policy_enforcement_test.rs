//! integration tests for the policy enforcement loop: quota and expiry
//! scans disabling embedded clients and re-pushing affected nodes.

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::MasterFixture;
use proxyctl::AccountEnforcer;
use proxyctl_db::Database;
use proxyctl_types::{
    Account, AccountClient, Inbound, NodeId,
    test_utils::{TestAccountBuilder, TestInboundBuilder, TestNodeBuilder},
};

const TWO_CLIENTS: &str =
    r#"{"clients":[{"id":"u1","email":"a@x","enable":true},{"id":"u2","email":"b@x","enable":true}]}"#;

/// create an inbound on `node_id` with the given embedded clients, and
/// an account associated with `emails` of those clients.
async fn seed_account(
    fixture: &MasterFixture,
    node_id: NodeId,
    tag: &str,
    account: Account,
    emails: &[&str],
) -> (Inbound, Account) {
    let inbound = fixture
        .db
        .create_inbound(
            &TestInboundBuilder::new(0, node_id.0)
                .with_tag(tag)
                .with_settings(TWO_CLIENTS)
                .build(),
        )
        .await
        .unwrap();
    let account = fixture.db.create_account(&account).await.unwrap();
    for email in emails {
        fixture
            .db
            .add_account_client(&AccountClient {
                account_id: account.id,
                inbound_id: inbound.id,
                email: email.to_string(),
            })
            .await
            .unwrap();
    }
    (inbound, account)
}

fn enforcer(fixture: &MasterFixture) -> AccountEnforcer {
    AccountEnforcer::new(fixture.db.clone(), fixture.state.pusher.clone())
}

#[tokio::test]
async fn only_over_quota_accounts_are_disabled_and_runs_are_idempotent() {
    let fixture = MasterFixture::new().await;
    let node_id = fixture.node.id;

    // one account at its quota, one safely under it
    let (in_a, over) = seed_account(
        &fixture,
        node_id,
        "in-over",
        TestAccountBuilder::new(0).with_quota(1000).build(),
        &["a@x"],
    )
    .await;
    let (in_b, _under) = seed_account(
        &fixture,
        node_id,
        "in-under",
        TestAccountBuilder::new(0).with_quota(1000).build(),
        &["a@x"],
    )
    .await;
    fixture
        .db
        .record_client_traffic(in_a.id, "a@x", 600, 400)
        .await
        .unwrap();
    fixture
        .db
        .record_client_traffic(in_b.id, "a@x", 100, 100)
        .await
        .unwrap();

    let acker = fixture.connect_node().await.auto_ack();
    let report = enforcer(&fixture).run_once().await;

    assert_eq!(report.over_quota, vec![over.id]);
    assert!(report.expired.is_empty());
    assert_eq!(report.pushed, vec![node_id]);
    assert!(report.push_failures.is_empty());

    // the over-quota account's client is disabled in the embedded
    // settings and its traffic row; the under-quota one is untouched
    let reloaded = fixture.db.get_inbound(in_a.id).await.unwrap().unwrap();
    assert!(!reloaded.clients()[0].enable);
    assert!(reloaded.clients()[1].enable, "b@x belongs to no account");
    let traffic = fixture
        .db
        .get_client_traffic(in_a.id, "a@x")
        .await
        .unwrap()
        .unwrap();
    assert!(!traffic.enable);

    let untouched = fixture.db.get_inbound(in_b.id).await.unwrap().unwrap();
    assert!(untouched.clients().iter().all(|c| c.enable));

    // a second run over the same state disables nothing and pushes nothing
    let report = enforcer(&fixture).run_once().await;
    assert!(report.is_noop(), "second run was not a no-op: {report:?}");

    acker.abort();
}

#[tokio::test]
async fn expired_accounts_are_disabled() {
    let fixture = MasterFixture::new().await;
    let node_id = fixture.node.id;

    let (inbound, expired) = seed_account(
        &fixture,
        node_id,
        "in-expired",
        TestAccountBuilder::new(0)
            .with_expiry(Utc::now() - ChronoDuration::hours(1))
            .build(),
        &["a@x", "b@x"],
    )
    .await;
    let (fresh_in, _fresh) = seed_account(
        &fixture,
        node_id,
        "in-fresh",
        TestAccountBuilder::new(0)
            .with_expiry(Utc::now() + ChronoDuration::hours(1))
            .build(),
        &["a@x"],
    )
    .await;

    let acker = fixture.connect_node().await.auto_ack();
    let report = enforcer(&fixture).run_once().await;

    assert_eq!(report.expired, vec![expired.id]);
    assert!(report.over_quota.is_empty());
    assert_eq!(report.pushed, vec![node_id]);

    let reloaded = fixture.db.get_inbound(inbound.id).await.unwrap().unwrap();
    assert!(reloaded.clients().iter().all(|c| !c.enable));
    let reloaded = fixture.db.get_inbound(fresh_in.id).await.unwrap().unwrap();
    assert!(reloaded.clients().iter().all(|c| c.enable));

    acker.abort();
}

#[tokio::test]
async fn disabled_accounts_are_skipped_entirely() {
    let fixture = MasterFixture::new().await;

    let (inbound, _account) = seed_account(
        &fixture,
        fixture.node.id,
        "in-disabled",
        TestAccountBuilder::new(0)
            .with_quota(10)
            .with_enable(false)
            .build(),
        &["a@x"],
    )
    .await;
    fixture
        .db
        .record_client_traffic(inbound.id, "a@x", 100, 100)
        .await
        .unwrap();

    let report = enforcer(&fixture).run_once().await;
    assert!(report.is_noop(), "disabled account triggered work: {report:?}");
}

#[tokio::test]
async fn push_failure_for_one_node_does_not_block_others() {
    let fixture = MasterFixture::new().await;
    let connected = fixture.node.id;
    let offline = fixture
        .db
        .create_node(&TestNodeBuilder::new(0).with_name("edge-2").build())
        .await
        .unwrap();

    let (in_a, account_a) = seed_account(
        &fixture,
        connected,
        "in-connected",
        TestAccountBuilder::new(0).with_quota(100).build(),
        &["a@x"],
    )
    .await;
    let (in_b, account_b) = seed_account(
        &fixture,
        offline.id,
        "in-offline",
        TestAccountBuilder::new(0).with_quota(100).build(),
        &["b@x"],
    )
    .await;
    fixture
        .db
        .record_client_traffic(in_a.id, "a@x", 100, 0)
        .await
        .unwrap();
    fixture
        .db
        .record_client_traffic(in_b.id, "b@x", 100, 0)
        .await
        .unwrap();

    // only the fixture's node holds a channel
    let acker = fixture.connect_node().await.auto_ack();
    let report = enforcer(&fixture).run_once().await;

    let mut over_quota = report.over_quota.clone();
    over_quota.sort_by_key(|a| a.0);
    assert_eq!(over_quota, vec![account_a.id, account_b.id]);
    assert_eq!(report.pushed, vec![connected]);
    assert_eq!(report.push_failures.len(), 1);
    assert_eq!(report.push_failures[0].0, offline.id);

    // both accounts' clients were disabled regardless of push outcome
    for inbound_id in [in_a.id, in_b.id] {
        let inbound = fixture.db.get_inbound(inbound_id).await.unwrap().unwrap();
        let clients = inbound.clients();
        assert!(!clients[0].enable);
    }

    acker.abort();
}
