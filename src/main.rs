use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use tracing::{error, info, warn};

use bank_node::{
    config::{self, NodeConfig},
    dispatch::Dispatcher,
    i18n::{Catalog, Language, MessageKey},
    identity::NodeIdentity,
    ledger::store::LedgerStore,
    peer::PeerClient,
    server::{bind_listener, BankServer},
};

//==================== CLI ====================//

#[derive(Parser)]
#[command(name = "bank-node", version, about = "P2P bank node (hacker edition)")]
struct Args {
    /// Адрес, на котором слушаем
    #[arg(long, default_value = config::DEFAULT_HOST)]
    host: String,

    /// Порт; по договорённости 65525..=65535
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Язык ответов: cs / en / fr
    #[arg(short, long, default_value = "cs")]
    lang: String,

    /// Таймаут бездействия клиента, секунды
    #[arg(long, default_value_t = config::DEFAULT_IDLE_TIMEOUT.as_secs())]
    idle_timeout: u64,

    /// Таймаут запроса к другой банке, секунды
    #[arg(long, default_value_t = config::DEFAULT_PEER_TIMEOUT.as_secs())]
    peer_timeout: u64,

    /// Порт для адресов пиров без явного порта
    #[arg(long, default_value_t = config::DEFAULT_PORT)]
    peer_port: u16,

    /// Файл с балансами
    #[arg(long, default_value = config::DEFAULT_LEDGER_FILE)]
    ledger: PathBuf,

    /// Список пиров, по одному адресу на строку
    #[arg(long, default_value = config::DEFAULT_PEERS_FILE)]
    peers: PathBuf,

    /// Адрес ноды для BC/AC (по умолчанию IP исходящего интерфейса)
    #[arg(long)]
    advertise: Option<String>,
}

impl Args {
    fn into_config(self) -> NodeConfig {
        let language = match self.lang.parse::<Language>() {
            Ok(lang) => lang,
            Err(err) => {
                warn!("{err}, falling back to cs");
                Language::Cs
            }
        };
        NodeConfig {
            host: self.host,
            port: self.port,
            idle_timeout: Duration::from_secs(self.idle_timeout),
            peer_timeout: Duration::from_secs(self.peer_timeout),
            peer_port: self.peer_port,
            ledger_path: self.ledger,
            peers_path: self.peers,
            language,
            advertise: self.advertise,
        }
    }
}

//==================== main ====================//

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bank_node=info".parse().expect("static directive")),
        )
        .init();

    let cfg = Args::parse().into_config();
    if !cfg.port_in_range() {
        warn!(
            "port {} is outside the agreed range {:?}",
            cfg.port,
            config::PORT_RANGE
        );
    }

    let catalog = Catalog::new(cfg.language);
    let identity = NodeIdentity::resolve(cfg.advertise.clone(), cfg.port);
    let peers = Arc::new(PeerClient::new(catalog, cfg.peer_timeout, cfg.peer_port));
    let dispatcher = Dispatcher::new(
        LedgerStore::new(cfg.ledger_path.clone()),
        identity,
        peers,
        cfg.peers_path.clone(),
        catalog,
    );

    // bind/listen — единственная фатальная ошибка
    let listener = match bind_listener(&cfg.listen_addr()) {
        Ok(listener) => listener,
        Err(err) => {
            error!("cannot listen on {}: {err}", cfg.listen_addr());
            std::process::exit(1);
        }
    };

    let node = dispatcher.identity().address().to_string();
    let server = BankServer::new(listener, Arc::new(dispatcher), cfg.idle_timeout);
    let bound = server
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| cfg.listen_addr());
    info!(
        "{} {} (node {}, lang {}, ledger {})",
        catalog.translate(MessageKey::ServerStarted),
        bound,
        node,
        cfg.language,
        cfg.ledger_path.display()
    );

    server.serve();
}
