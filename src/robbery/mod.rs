//! Network scan and greedy choice of banks to rob.
//!
//! Every known peer is asked for `BA` and `BN`; peers holding money are
//! ranked by money per client and taken in that order until the target is
//! reached. The ranking divides by at least [`RATIO_EPSILON`], so a bank that
//! reports no clients ranks very high instead of dividing by zero. This is a
//! heuristic, not an optimal subset selection.

use std::{path::PathBuf, sync::Arc};

use tracing::info;

use crate::{
    i18n::{Catalog, MessageKey},
    peer::{load_peers, PeerTransport},
};

pub const RATIO_EPSILON: f64 = 0.1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanCandidate {
    pub address: String,
    pub money: u64,
    pub clients: u64,
}

impl ScanCandidate {
    pub fn ratio(&self) -> f64 {
        let clients = (self.clients as f64).max(RATIO_EPSILON);
        self.money as f64 / clients
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RobberyPlan {
    pub targets: Vec<String>,
    pub loot: u64,
    pub clients: u64,
}

/// Greedy pick: best money/client ratio first, stop once `target` is covered.
pub fn select_targets(mut candidates: Vec<ScanCandidate>, target: u64) -> RobberyPlan {
    // stable, equal ratios keep scan order
    candidates.sort_by(|a, b| b.ratio().total_cmp(&a.ratio()));

    let mut plan = RobberyPlan::default();
    for bank in candidates {
        if plan.loot >= target {
            break;
        }
        plan.loot = plan.loot.saturating_add(bank.money);
        plan.clients = plan.clients.saturating_add(bank.clients);
        plan.targets.push(bank.address);
    }
    plan
}

pub struct RobberyPlanner {
    transport: Arc<dyn PeerTransport>,
    peers_path: PathBuf,
    catalog: Catalog,
}

impl RobberyPlanner {
    pub fn new(
        transport: Arc<dyn PeerTransport>,
        peers_path: impl Into<PathBuf>,
        catalog: Catalog,
    ) -> Self {
        Self {
            transport,
            peers_path: peers_path.into(),
            catalog,
        }
    }

    /// Queries every peer except `own_address`, one after another.
    pub fn scan(&self, own_address: &str) -> Vec<ScanCandidate> {
        let peers = load_peers(&self.peers_path);
        let mut candidates = Vec::new();
        for address in peers {
            if address == own_address {
                continue;
            }
            let money = reported_number(&self.transport.send(&address, "BA"), "BA");
            let clients = reported_number(&self.transport.send(&address, "BN"), "BN");
            if money > 0 {
                info!(peer = %address, money, clients, "scan: bank holds money");
                candidates.push(ScanCandidate {
                    address,
                    money,
                    clients,
                });
            }
        }
        candidates
    }

    pub fn plan(&self, target: u64, own_address: &str) -> String {
        info!(goal = target, "robbery scan started");
        let plan = select_targets(self.scan(own_address), target);
        if plan.loot == 0 {
            return self.catalog.translate(MessageKey::RobberyNothing).to_string();
        }
        let banks = plan
            .targets
            .join(self.catalog.translate(MessageKey::RobberyJoin));
        self.catalog.render(
            MessageKey::RobberyPlan,
            &[
                ("target", target.to_string()),
                ("banks", banks),
                ("loot", plan.loot.to_string()),
                ("clients", plan.clients.to_string()),
            ],
        )
    }
}

/// Number after `code` in a reply like `BA 1500`; anything unexpected counts as 0.
fn reported_number(response: &str, code: &str) -> u64 {
    if !response.starts_with(code) {
        return 0;
    }
    response
        .split_whitespace()
        .nth(1)
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}
