use std::{env, process, time::Duration};

use bank_node::{
    config,
    i18n::{Catalog, Language},
    peer::PeerClient,
};

fn usage() -> ! {
    eprintln!(
        "Usage:
  bank-client <address> <command...> [--timeout-ms=<N>] [--lang=<cs|en|fr>] [--port=<N>]

Notes:
  - <address>  : IP или IP:port банки (без порта — 65525 или --port)
  - <command>  : строка протокола, например: BC | AC | AD 10001/10.0.0.5 100 | RP 500
  - ответ печатается в stdout; ошибки сети тоже приходят строкой 'ER ...'"
    );
    process::exit(1)
}

fn flag(args: &[String], name: &str) -> Option<String> {
    for a in args {
        if let Some(rest) = a.strip_prefix(&format!("--{}=", name)) {
            return Some(rest.to_string());
        }
    }
    None
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    if positional.len() < 2 {
        usage();
    }
    let address = positional[0];
    let command = positional[1..]
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let timeout_ms: u64 = flag(&args, "timeout-ms")
        .unwrap_or_else(|| "5000".into())
        .parse()
        .unwrap_or(5000);
    let port: u16 = flag(&args, "port")
        .and_then(|p| p.parse().ok())
        .unwrap_or(config::DEFAULT_PORT);
    let lang = flag(&args, "lang")
        .and_then(|l| l.parse::<Language>().ok())
        .unwrap_or(Language::En);

    let client = PeerClient::new(Catalog::new(lang), Duration::from_millis(timeout_ms), port);
    let reply = client.send_with_timeout(address, &command, client.timeout());
    println!("{reply}");
    if reply.starts_with("ER") {
        process::exit(2);
    }
}
