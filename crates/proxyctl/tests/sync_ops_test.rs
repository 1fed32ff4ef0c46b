//! integration tests for state mutations: every update re-pushes the
//! owning node, and reassigning a record to a different node pushes the
//! old owner as well.

mod common;

use common::{MasterFixture, NODE_SECRET};
use proxyctl::{update_inbound, update_outbound, update_routing_rule};
use proxyctl_db::Database;
use proxyctl_types::test_utils::{
    TestInboundBuilder, TestNodeBuilder, TestOutboundBuilder, TestRuleBuilder,
};

#[tokio::test]
async fn updating_an_inbound_pushes_its_owner() {
    let fixture = MasterFixture::new().await;
    let mut inbound = fixture
        .db
        .create_inbound(
            &TestInboundBuilder::new(0, fixture.node.id.0)
                .with_tag("in1")
                .with_port(10000)
                .build(),
        )
        .await
        .unwrap();

    let acker = fixture.connect_node().await.auto_ack();

    inbound.port = 20000;
    let report = update_inbound(&fixture.db, &fixture.state.pusher, &inbound)
        .await
        .unwrap();
    assert_eq!(report.pushed, vec![fixture.node.id]);
    assert!(report.failures.is_empty());

    let reloaded = fixture.db.get_inbound(inbound.id).await.unwrap().unwrap();
    assert_eq!(reloaded.port, 20000);

    acker.abort();
}

#[tokio::test]
async fn reassigning_an_outbound_pushes_both_nodes() {
    let fixture = MasterFixture::new().await;
    let old_node = fixture.node.id;
    let new_node = fixture
        .db
        .create_node(
            &TestNodeBuilder::new(0)
                .with_name("edge-2")
                .with_secret(NODE_SECRET)
                .build(),
        )
        .await
        .unwrap();

    let mut outbound = fixture
        .db
        .create_outbound(
            &TestOutboundBuilder::new(0, old_node.0)
                .with_tag("relay")
                .build(),
        )
        .await
        .unwrap();

    let old_acker = fixture.connect_node().await.auto_ack();
    let new_acker = fixture
        .connect_as(&new_node.name, NODE_SECRET)
        .await
        .auto_ack();

    outbound.node_id = new_node.id;
    let report = update_outbound(&fixture.db, &fixture.state.pusher, &outbound)
        .await
        .unwrap();

    // the old owner's compiled config lost the outbound; both converge
    assert_eq!(report.pushed, vec![old_node, new_node.id]);
    assert!(report.failures.is_empty());

    assert!(fixture
        .db
        .list_outbounds_for_node(old_node)
        .await
        .unwrap()
        .is_empty());
    let moved = fixture.db.list_outbounds_for_node(new_node.id).await.unwrap();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].tag, "relay");

    old_acker.abort();
    new_acker.abort();
}

#[tokio::test]
async fn reassigning_a_rule_reports_unreachable_nodes_without_failing() {
    let fixture = MasterFixture::new().await;
    let old_node = fixture.node.id;
    let new_node = fixture
        .db
        .create_node(&TestNodeBuilder::new(0).with_name("edge-2").build())
        .await
        .unwrap();

    let mut rule = fixture
        .db
        .create_routing_rule(
            &TestRuleBuilder::new(0, old_node.0)
                .with_outbound_tag("relay")
                .build(),
        )
        .await
        .unwrap();

    // only the old owner is connected
    let acker = fixture.connect_node().await.auto_ack();

    rule.node_id = new_node.id;
    let report = update_routing_rule(&fixture.db, &fixture.state.pusher, &rule)
        .await
        .unwrap();

    // the mutation itself succeeded; the unreachable node is reported,
    // not thrown
    assert_eq!(report.pushed, vec![old_node]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, new_node.id);

    let moved = fixture.db.list_rules_for_node(new_node.id).await.unwrap();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].outbound_tag, "relay");

    acker.abort();
}
