use std::{path::PathBuf, str::FromStr, sync::Arc};

use tracing::{error, info};

use crate::{
    error::BankError,
    i18n::{Catalog, MessageKey},
    identity::NodeIdentity,
    ledger::{store::LedgerStore, Amount, LedgerError},
    peer::PeerTransport,
    robbery::RobberyPlanner,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountOp {
    Deposit,
    Withdraw,
    Balance,
    Remove,
}

impl AccountOp {
    pub fn code(self) -> &'static str {
        match self {
            AccountOp::Deposit => "AD",
            AccountOp::Withdraw => "AW",
            AccountOp::Balance => "AB",
            AccountOp::Remove => "AR",
        }
    }
}

/// External account reference `id/host`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountRef {
    pub id: String,
    pub host: String,
}

impl FromStr for AccountRef {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(id), Some(host), None) if !id.is_empty() && !host.is_empty() => Ok(Self {
                id: id.to_string(),
                host: host.to_string(),
            }),
            _ => Err(BankError::Format),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    BankCode,
    BankNumber,
    BankAmount,
    AccountCreate,
    RobberyPlan {
        target: Amount,
    },
    /// Amount stays raw: it is only validated once the command runs locally.
    Account {
        op: AccountOp,
        account: AccountRef,
        amount: Option<String>,
    },
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, BankError> {
        let mut tokens = line.split_whitespace();
        let code = tokens.next().ok_or(BankError::Format)?.to_ascii_uppercase();
        let op = match code.as_str() {
            "BC" => return Ok(Command::BankCode),
            "BN" => return Ok(Command::BankNumber),
            "BA" => return Ok(Command::BankAmount),
            "AC" => return Ok(Command::AccountCreate),
            "RP" => {
                let target: Amount = match tokens.next() {
                    Some(raw) => raw.parse().map_err(|_| BankError::Format)?,
                    None => 0,
                };
                return Ok(Command::RobberyPlan { target });
            }
            "AD" => AccountOp::Deposit,
            "AW" => AccountOp::Withdraw,
            "AB" => AccountOp::Balance,
            "AR" => AccountOp::Remove,
            _ => return Err(BankError::UnknownCommand),
        };
        let account: AccountRef = tokens.next().ok_or(BankError::Format)?.parse()?;
        Ok(Command::Account {
            op,
            account,
            amount: tokens.next().map(str::to_string),
        })
    }
}

/// Turns one request line into one response line.
///
/// Account commands for other nodes are relayed verbatim to the owning node
/// and its answer is returned untouched.
pub struct Dispatcher {
    store: LedgerStore,
    identity: NodeIdentity,
    peers: Arc<dyn PeerTransport>,
    planner: RobberyPlanner,
    catalog: Catalog,
}

impl Dispatcher {
    pub fn new(
        store: LedgerStore,
        identity: NodeIdentity,
        peers: Arc<dyn PeerTransport>,
        peers_path: impl Into<PathBuf>,
        catalog: Catalog,
    ) -> Self {
        let planner = RobberyPlanner::new(Arc::clone(&peers), peers_path, catalog);
        Self {
            store,
            identity,
            peers,
            planner,
            catalog,
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn catalog(&self) -> Catalog {
        self.catalog
    }

    pub fn dispatch(&self, line: &str) -> String {
        let line = line.trim();
        if line.is_empty() {
            return String::new();
        }
        match self.execute(line) {
            Ok(response) => response,
            Err(err) => self.render_error(&err),
        }
    }

    /// Response for a request that could not even be decoded as text.
    pub fn malformed(&self) -> String {
        self.render_error(&BankError::Format)
    }

    fn execute(&self, line: &str) -> Result<String, BankError> {
        let own = self.identity.address();
        match Command::parse(line)? {
            Command::BankCode => Ok(format!("BC {own}")),
            Command::BankNumber => Ok(format!("BN {}", self.store.read(|ledger| ledger.len()))),
            Command::BankAmount => Ok(format!("BA {}", self.store.read(|ledger| ledger.total()))),
            Command::AccountCreate => {
                let id = self.store.update(|ledger| {
                    ledger
                        .open_account(&mut rand::thread_rng())
                        .map_err(BankError::from)
                })?;
                info!(account = %id, "account created");
                Ok(format!("AC {id}/{own}"))
            }
            Command::RobberyPlan { target } => Ok(self.planner.plan(target, own)),
            Command::Account {
                op,
                account,
                amount,
            } => {
                if self.identity.is_local(&account.host) {
                    self.execute_local(op, &account.id, amount.as_deref())
                } else {
                    info!(peer = %account.host, "proxying {}", op.code());
                    Ok(self.peers.send(&account.host, line))
                }
            }
        }
    }

    fn execute_local(
        &self,
        op: AccountOp,
        id: &str,
        amount: Option<&str>,
    ) -> Result<String, BankError> {
        match op {
            AccountOp::Deposit => {
                self.store.update(|ledger| -> Result<_, BankError> {
                    ledger.balance(id)?;
                    Ok(ledger.deposit(id, parse_amount(amount)?)?)
                })?;
            }
            AccountOp::Withdraw => {
                self.store.update(|ledger| -> Result<_, BankError> {
                    ledger.balance(id)?;
                    Ok(ledger.withdraw(id, parse_amount(amount)?)?)
                })?;
            }
            AccountOp::Balance => {
                let balance = self.store.read(|ledger| ledger.balance(id))?;
                return Ok(format!("AB {balance}"));
            }
            AccountOp::Remove => {
                self.store
                    .update(|ledger| ledger.remove(id).map_err(BankError::from))?;
                info!(account = %id, "account removed");
            }
        }
        Ok(op.code().to_string())
    }

    fn render_error(&self, err: &BankError) -> String {
        let key = match err {
            BankError::Format => MessageKey::InvalidFormat,
            BankError::UnknownCommand => MessageKey::UnknownCommand,
            BankError::Ledger(LedgerError::UnknownAccount { .. }) => MessageKey::AccountNotFound,
            BankError::Ledger(LedgerError::InsufficientFunds { .. }) => MessageKey::LowFunds,
            BankError::Ledger(LedgerError::AccountNotEmpty { .. }) => MessageKey::AccountNotEmpty,
            BankError::Ledger(LedgerError::Exhausted) => MessageKey::LedgerFull,
            BankError::Ledger(LedgerError::Overflow { .. }) | BankError::Store(_) => {
                error!("command failed: {err}");
                return self.catalog.with_detail(MessageKey::Internal, err);
            }
        };
        self.catalog.translate(key).to_string()
    }
}

fn parse_amount(raw: Option<&str>) -> Result<Amount, BankError> {
    raw.ok_or(BankError::Format)?
        .parse()
        .map_err(|_| BankError::Format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Language;
    use std::sync::Mutex;

    const OWN: &str = "10.0.0.5";

    #[derive(Default)]
    struct RecordingPeers {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl PeerTransport for RecordingPeers {
        fn send(&self, address: &str, command: &str) -> String {
            self.sent
                .lock()
                .unwrap()
                .push((address.to_string(), command.to_string()));
            if command.starts_with("AB") {
                "AB 999".to_string()
            } else {
                "ER remote says no".to_string()
            }
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        peers: Arc<RecordingPeers>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let peers = Arc::new(RecordingPeers::default());
        let dispatcher = Dispatcher::new(
            LedgerStore::new(dir.path().join("data.json")),
            NodeIdentity::new(OWN, 65525),
            peers.clone(),
            dir.path().join("peers.txt"),
            Catalog::new(Language::En),
        );
        Fixture {
            dispatcher,
            peers,
            _dir: dir,
        }
    }

    fn create(d: &Dispatcher) -> String {
        let reply = d.dispatch("AC");
        let reference = reply.strip_prefix("AC ").expect("AC reply").to_string();
        assert!(reference.ends_with(&format!("/{OWN}")));
        reference
    }

    #[test]
    fn bank_code_is_own_address() {
        let f = fixture();
        assert_eq!(f.dispatcher.dispatch("BC"), "BC 10.0.0.5");
        assert_eq!(f.dispatcher.dispatch("bc"), "BC 10.0.0.5");
    }

    #[test]
    fn created_accounts_start_empty_and_are_counted() {
        let f = fixture();
        let d = &f.dispatcher;
        assert_eq!(d.dispatch("BN"), "BN 0");
        let a = create(d);
        let b = create(d);
        assert_ne!(a, b);
        assert_eq!(d.dispatch(&format!("AB {a}")), "AB 0");
        assert_eq!(d.dispatch("BN"), "BN 2");
        assert_eq!(d.dispatch("BA"), "BA 0");
    }

    #[test]
    fn deposit_and_withdraw_keep_balance_non_negative() {
        let f = fixture();
        let d = &f.dispatcher;
        let acc = create(d);
        assert_eq!(d.dispatch(&format!("AD {acc} 300")), "AD");
        assert_eq!(d.dispatch(&format!("aw {acc} 100")), "AW");
        assert_eq!(d.dispatch(&format!("AW {acc} 201")), "ER Insufficient funds.");
        assert_eq!(d.dispatch(&format!("AB {acc}")), "AB 200");

        let other = create(d);
        d.dispatch(&format!("AD {other} 50"));
        assert_eq!(d.dispatch("BA"), "BA 250");
    }

    #[test]
    fn remove_only_empty_accounts() {
        let f = fixture();
        let d = &f.dispatcher;
        let acc = create(d);
        d.dispatch(&format!("AD {acc} 1"));
        assert_eq!(
            d.dispatch(&format!("AR {acc}")),
            "ER Cannot delete account with remaining funds."
        );
        d.dispatch(&format!("AW {acc} 1"));
        assert_eq!(d.dispatch(&format!("AR {acc}")), "AR");
        assert_eq!(d.dispatch(&format!("AB {acc}")), "ER Account not found.");
        assert_eq!(d.dispatch("BN"), "BN 0");
    }

    #[test]
    fn loopback_alias_is_served_locally() {
        let f = fixture();
        let d = &f.dispatcher;
        let acc = create(d);
        let id = acc.split('/').next().unwrap();
        assert_eq!(d.dispatch(&format!("AD {id}/127.0.0.1 5")), "AD");
        assert_eq!(d.dispatch(&format!("AB {id}/localhost")), "AB 5");
        assert!(f.peers.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn own_listen_port_is_never_proxied() {
        let f = fixture();
        let d = &f.dispatcher;
        let acc = create(d);
        let id = acc.split('/').next().unwrap();
        for host in ["127.0.0.1:65525", "localhost:65525", "10.0.0.5:65525"] {
            assert_eq!(d.dispatch(&format!("AB {id}/{host}")), "AB 0", "{host}");
        }
        assert!(f.peers.sent.lock().unwrap().is_empty());

        assert_eq!(d.dispatch(&format!("AB {id}/127.0.0.1:65526")), "AB 999");
        assert_eq!(f.peers.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn malformed_requests_are_format_errors() {
        let f = fixture();
        let d = &f.dispatcher;
        let acc = create(d);
        for line in [
            "AD".to_string(),
            "AB 12345".to_string(),
            "AB 1/2/3".to_string(),
            "AB /10.0.0.5".to_string(),
            format!("AD {acc}"),
            format!("AD {acc} abc"),
            format!("AW {acc} -5"),
            "RP lots".to_string(),
        ] {
            assert_eq!(d.dispatch(&line), "ER Invalid command format.", "{line}");
        }
    }

    #[test]
    fn missing_account_beats_bad_amount() {
        let f = fixture();
        assert_eq!(
            f.dispatcher.dispatch("AD 11111/10.0.0.5 abc"),
            "ER Account not found."
        );
    }

    #[test]
    fn unknown_code_is_rejected() {
        let f = fixture();
        assert_eq!(f.dispatcher.dispatch("XY 1"), "ER Unknown command.");
        assert_eq!(f.dispatcher.dispatch("   "), "");
    }

    #[test]
    fn foreign_accounts_are_proxied_verbatim() {
        let f = fixture();
        let d = &f.dispatcher;
        assert_eq!(d.dispatch("ab 12345/10.0.0.77"), "AB 999");
        assert_eq!(d.dispatch("AD 12345/10.0.0.77   abc"), "ER remote says no");
        let sent = f.peers.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![
                ("10.0.0.77".to_string(), "ab 12345/10.0.0.77".to_string()),
                ("10.0.0.77".to_string(), "AD 12345/10.0.0.77   abc".to_string()),
            ]
        );
    }

    #[test]
    fn robbery_without_money_reports_nothing() {
        let f = fixture();
        assert_eq!(
            f.dispatcher.dispatch("RP 1000"),
            "RP There is no money in the network to rob."
        );
    }

    #[test]
    fn unwritable_ledger_is_an_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let d = Dispatcher::new(
            LedgerStore::new(dir.path().join("missing-dir").join("data.json")),
            NodeIdentity::new(OWN, 65525),
            Arc::new(RecordingPeers::default()),
            dir.path().join("peers.txt"),
            Catalog::new(Language::En),
        );
        let reply = d.dispatch("AC");
        assert!(reply.starts_with("ER Internal server error. ("), "{reply}");
        assert_eq!(d.dispatch("BN"), "BN 0");
    }

    #[test]
    fn parse_keeps_amount_raw() {
        assert_eq!(
            Command::parse("aw 10001/10.0.0.9 15").unwrap(),
            Command::Account {
                op: AccountOp::Withdraw,
                account: AccountRef {
                    id: "10001".into(),
                    host: "10.0.0.9".into(),
                },
                amount: Some("15".into()),
            }
        );
        assert_eq!(
            Command::parse("RP").unwrap(),
            Command::RobberyPlan { target: 0 }
        );
    }
}
