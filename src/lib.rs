//! One node of the classroom P2P bank network.
//!
//! The node speaks a line-based text protocol over TCP and is assembled from
//! a handful of small modules:
//!
//! * [`ledger`] — account balances and the locked, atomically saved ledger file.
//! * [`peer`] — one-shot outbound client used for proxying and scanning.
//! * [`dispatch`] — command parsing, local execution vs. proxying.
//! * [`robbery`] — network scan and greedy choice of banks to rob.
//! * [`server`] — accept loop and per-connection handler threads.
//!
//! Texts shown to clients come from [`i18n`]; runtime knobs live in [`config`].

pub mod config;
pub mod dispatch;
pub mod i18n;
pub mod identity;
pub mod ledger;
pub mod peer;
pub mod robbery;
pub mod server;

mod error;

pub use error::BankError;
