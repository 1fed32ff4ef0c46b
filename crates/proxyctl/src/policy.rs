//! the policy enforcement loop.
//!
//! on a fixed interval, scans enabled accounts for exhausted quotas and
//! passed expiries, disables the offending embedded clients, and
//! re-pushes configuration to every affected node. failures are logged
//! per account or per node and never abort a run.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use proxyctl_db::{Database, ProxyctlDb};
use proxyctl_types::{Account, AccountId, NodeId};

use crate::push::ConfigPusher;

/// what one enforcement run did.
#[derive(Debug, Default)]
pub struct EnforcementReport {
    /// accounts whose clients were disabled for exhausting their quota.
    pub over_quota: Vec<AccountId>,
    /// accounts whose clients were disabled for being expired.
    pub expired: Vec<AccountId>,
    /// nodes that received a re-push.
    pub pushed: Vec<NodeId>,
    /// nodes whose re-push failed, with the failure rendered.
    pub push_failures: Vec<(NodeId, String)>,
}

impl EnforcementReport {
    /// whether the run changed anything or attempted any push.
    pub fn is_noop(&self) -> bool {
        self.over_quota.is_empty()
            && self.expired.is_empty()
            && self.pushed.is_empty()
            && self.push_failures.is_empty()
    }
}

/// periodically disables over-quota and expired accounts' clients.
#[derive(Clone)]
pub struct AccountEnforcer {
    db: ProxyctlDb,
    pusher: ConfigPusher,
}

impl AccountEnforcer {
    /// create an enforcer over the given store and pusher.
    pub fn new(db: ProxyctlDb, pusher: ConfigPusher) -> Self {
        Self { db, pusher }
    }

    /// run one enforcement cycle.
    ///
    /// disabling an already-disabled client changes nothing and records
    /// no affected node, so a second run over the same state is a no-op
    /// with no duplicate pushes.
    pub async fn run_once(&self) -> EnforcementReport {
        let mut report = EnforcementReport::default();
        let mut affected: HashSet<NodeId> = HashSet::new();

        let accounts = match self.db.list_enabled_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!(error = %e, "enforcement run skipped: failed to list accounts");
                return report;
            }
        };

        let now = Utc::now();
        for account in accounts {
            // quota scan
            if self.quota_exhausted(&account).await {
                match self.disable_account_clients(&account).await {
                    Ok(nodes) if !nodes.is_empty() => {
                        info!(account = %account.id, "account over quota, clients disabled");
                        report.over_quota.push(account.id);
                        affected.extend(nodes);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(account = %account.id, error = %e, "failed to disable over-quota clients");
                    }
                }
                continue;
            }

            // expiry scan
            if account.is_expired(now) {
                match self.disable_account_clients(&account).await {
                    Ok(nodes) if !nodes.is_empty() => {
                        info!(account = %account.id, "account expired, clients disabled");
                        report.expired.push(account.id);
                        affected.extend(nodes);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(account = %account.id, error = %e, "failed to disable expired clients");
                    }
                }
            }
        }

        // one push per affected node, deduplicated; a failed node never
        // blocks the others
        let mut nodes: Vec<NodeId> = affected.into_iter().collect();
        nodes.sort_by_key(|n| n.0);
        for node_id in nodes {
            match self.pusher.push_config(node_id).await {
                Ok(()) => report.pushed.push(node_id),
                Err(e) => {
                    warn!(node = %node_id, error = %e, "enforcement push failed");
                    report.push_failures.push((node_id, e.to_string()));
                }
            }
        }

        report
    }

    async fn quota_exhausted(&self, account: &Account) -> bool {
        if account.quota <= 0 {
            return false;
        }
        match self.db.list_traffic_for_account(account.id).await {
            Ok(traffic) => {
                let used: i64 = traffic.iter().map(|t| t.total()).sum();
                account.quota_exhausted(used)
            }
            Err(e) => {
                warn!(account = %account.id, error = %e, "failed to aggregate account traffic");
                false
            }
        }
    }

    /// disable every client under the account, returning the owning
    /// node of each client whose state actually changed.
    async fn disable_account_clients(
        &self,
        account: &Account,
    ) -> Result<HashSet<NodeId>, proxyctl_db::Error> {
        let mut nodes = HashSet::new();
        for assoc in self.db.list_account_clients(account.id).await? {
            let Some(mut inbound) = self.db.get_inbound(assoc.inbound_id).await? else {
                debug!(account = %account.id, inbound = %assoc.inbound_id, "dangling account client");
                continue;
            };
            if inbound.set_client_enabled(&assoc.email, false) {
                self.db.update_inbound(&inbound).await?;
                self.db
                    .set_client_traffic_enabled(assoc.inbound_id, &assoc.email, false)
                    .await?;
                nodes.insert(inbound.node_id);
            }
        }
        Ok(nodes)
    }

    /// spawn the background enforcement task.
    ///
    /// runs a cycle every `interval` until the returned handle is
    /// dropped or aborted.
    pub fn spawn_enforcer(self, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if interval.is_zero() {
                debug!("policy enforcement disabled (interval = 0)");
                return;
            }

            info!(interval_secs = interval.as_secs(), "starting policy enforcement loop");

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let report = self.run_once().await;
                if !report.is_noop() {
                    info!(
                        over_quota = report.over_quota.len(),
                        expired = report.expired.len(),
                        pushed = report.pushed.len(),
                        failed = report.push_failures.len(),
                        "enforcement cycle completed"
                    );
                }
            }
        })
    }
}
