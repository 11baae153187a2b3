//! User-facing texts in Czech, English and French.
//!
//! The [`Catalog`] is a plain value picked at startup and handed to every
//! component that renders a response, there is no process-wide language switch.

use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Cs,
    En,
    Fr,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Cs => "cs",
            Language::En => "en",
            Language::Fr => "fr",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown language '{0}'")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cs" => Ok(Language::Cs),
            "en" => Ok(Language::En),
            "fr" => Ok(Language::Fr),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKey {
    Internal,
    UnknownCommand,
    InvalidFormat,
    AccountNotFound,
    LowFunds,
    AccountNotEmpty,
    LedgerFull,
    PeerTimeout,
    PeerRefused,
    PeerEmpty,
    PeerNetwork,
    RobberyNothing,
    /// Template with `{target}`, `{banks}`, `{loot}`, `{clients}`.
    RobberyPlan,
    /// Word joining bank addresses in the robbery plan.
    RobberyJoin,
    ServerStarted,
}

impl MessageKey {
    pub const ALL: [MessageKey; 15] = [
        MessageKey::Internal,
        MessageKey::UnknownCommand,
        MessageKey::InvalidFormat,
        MessageKey::AccountNotFound,
        MessageKey::LowFunds,
        MessageKey::AccountNotEmpty,
        MessageKey::LedgerFull,
        MessageKey::PeerTimeout,
        MessageKey::PeerRefused,
        MessageKey::PeerEmpty,
        MessageKey::PeerNetwork,
        MessageKey::RobberyNothing,
        MessageKey::RobberyPlan,
        MessageKey::RobberyJoin,
        MessageKey::ServerStarted,
    ];

    pub fn is_error(self) -> bool {
        !matches!(
            self,
            MessageKey::RobberyNothing
                | MessageKey::RobberyPlan
                | MessageKey::RobberyJoin
                | MessageKey::ServerStarted
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Catalog {
    lang: Language,
}

impl Catalog {
    pub fn new(lang: Language) -> Self {
        Self { lang }
    }

    pub fn language(&self) -> Language {
        self.lang
    }

    pub fn translate(&self, key: MessageKey) -> &'static str {
        lookup(key, self.lang)
    }

    /// Translates `key` and substitutes `{name}` placeholders.
    pub fn render(&self, key: MessageKey, args: &[(&str, String)]) -> String {
        let mut text = self.translate(key).to_string();
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }

    /// Error text followed by a detail in parentheses, e.g. `ER Timeout (10.0.0.7)`.
    pub fn with_detail(&self, key: MessageKey, detail: impl fmt::Display) -> String {
        format!("{} ({detail})", self.translate(key))
    }
}

fn lookup(key: MessageKey, lang: Language) -> &'static str {
    use Language::*;
    use MessageKey::*;
    match (key, lang) {
        (Internal, Cs) => "ER Interní chyba serveru.",
        (Internal, En) => "ER Internal server error.",
        (Internal, Fr) => "ER Erreur interne du serveur.",

        (UnknownCommand, Cs) => "ER Neznámý příkaz.",
        (UnknownCommand, En) => "ER Unknown command.",
        (UnknownCommand, Fr) => "ER Commande inconnue.",

        (InvalidFormat, Cs) => "ER Chybný formát příkazu.",
        (InvalidFormat, En) => "ER Invalid command format.",
        (InvalidFormat, Fr) => "ER Format de commande invalide.",

        (AccountNotFound, Cs) => "ER Účet nenalezen.",
        (AccountNotFound, En) => "ER Account not found.",
        (AccountNotFound, Fr) => "ER Compte introuvable.",

        (LowFunds, Cs) => "ER Nedostatek finančních prostředků.",
        (LowFunds, En) => "ER Insufficient funds.",
        (LowFunds, Fr) => "ER Fonds insuffisants.",

        (AccountNotEmpty, Cs) => "ER Nelze smazat účet, na kterém jsou peníze.",
        (AccountNotEmpty, En) => "ER Cannot delete account with remaining funds.",
        (AccountNotEmpty, Fr) => "ER Impossible de supprimer un compte avec des fonds.",

        (LedgerFull, Cs) => "ER Banka nemá volná čísla účtů.",
        (LedgerFull, En) => "ER No free account numbers left.",
        (LedgerFull, Fr) => "ER Plus aucun numéro de compte disponible.",

        (PeerTimeout, Cs) => "ER Timeout, banka neodpovídá",
        (PeerTimeout, En) => "ER Timeout, bank is not responding",
        (PeerTimeout, Fr) => "ER Timeout, la banque ne répond pas",

        (PeerRefused, Cs) => "ER Connection refused, banka neběží",
        (PeerRefused, En) => "ER Connection refused, bank is not running",
        (PeerRefused, Fr) => "ER Connection refused, la banque ne tourne pas",

        (PeerEmpty, Cs) => "ER Prázdná odpověď (empty response)",
        (PeerEmpty, En) => "ER Empty response",
        (PeerEmpty, Fr) => "ER Réponse vide (empty response)",

        (PeerNetwork, Cs) => "ER Chyba sítě",
        (PeerNetwork, En) => "ER Network error",
        (PeerNetwork, Fr) => "ER Erreur réseau",

        (RobberyNothing, Cs) => "RP V síti nejsou žádné peníze k loupeži.",
        (RobberyNothing, En) => "RP There is no money in the network to rob.",
        (RobberyNothing, Fr) => "RP Il n'y a pas d'argent à voler dans le réseau.",

        (RobberyPlan, Cs) => "RP K dosažení cíle {target} je třeba vyloupit banky: {banks}. Získáte celkem {loot} a bude poškozeno {clients} klientů.",
        (RobberyPlan, En) => "RP To reach the target of {target}, rob the banks: {banks}. You get {loot} in total and {clients} clients will be affected.",
        (RobberyPlan, Fr) => "RP Pour atteindre l'objectif {target}, il faut braquer les banques : {banks}. Vous obtenez {loot} au total et {clients} clients seront lésés.",

        (RobberyJoin, Cs) => " a ",
        (RobberyJoin, En) => " and ",
        (RobberyJoin, Fr) => " et ",

        (ServerStarted, Cs) => "Server spuštěn na portu",
        (ServerStarted, En) => "Server started on port",
        (ServerStarted, Fr) => "Serveur démarré sur le port",
    }
}
