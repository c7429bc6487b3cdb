use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};

use apollo_config::dumping::{ser_param, SerializeConfig};
use apollo_config::{ParamPath, ParamPrivacyInput, SerializedParam};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const GATEWAY_PORT: u16 = 8080;

/// Everything the Admission API needs at startup: where to bind, where the
/// chain node lives, how to sign outgoing transactions, and where the
/// Ledger's database is. Loaded once into an immutable bundle, the way
/// `original_source/src/config.py` reads `TEZOS_RPC`/`SECRET_KEY`/`LEVEL`
/// from the environment exactly once at import time.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct GatewayConfig {
    pub ip: IpAddr,
    pub port: u16,

    /// URL of the chain node the `ChainOracle` implementation talks to.
    pub rpc_endpoint: String,

    /// The relayer's own chain address, used by the Reconciler to recognize
    /// its own balance-update entries (§4.5 step 2).
    pub relayer_address: String,

    /// The relayer's signing key, either given directly or obtained from a
    /// subprocess. Mirrors `config.py`'s `SECRET_KEY`/`SECRET_KEY_CMD` pair:
    /// when `secret_key_cmd` is set it takes precedence over `secret_key`.
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub secret_key_cmd: Option<String>,

    pub database_url: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            ip: IpAddr::from(Ipv4Addr::UNSPECIFIED),
            port: GATEWAY_PORT,
            rpc_endpoint: String::new(),
            relayer_address: String::new(),
            secret_key: None,
            secret_key_cmd: None,
            database_url: String::new(),
            log_level: default_log_level(),
        }
    }
}

impl GatewayConfig {
    pub fn ip_and_port(&self) -> (IpAddr, u16) {
        (self.ip, self.port)
    }
}

impl SerializeConfig for GatewayConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from_iter([
            ser_param("ip", &self.ip.to_string(), "The gateway's HTTP bind ip.", ParamPrivacyInput::Public),
            ser_param("port", &self.port, "The gateway's HTTP bind port.", ParamPrivacyInput::Public),
            ser_param(
                "rpc_endpoint",
                &self.rpc_endpoint,
                "URL of the chain node backing the ChainOracle.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "relayer_address",
                &self.relayer_address,
                "The relayer's own chain address.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "secret_key",
                &self.secret_key.clone().unwrap_or_default(),
                "The relayer's signing key, if given directly rather than via secret_key_cmd.",
                ParamPrivacyInput::Private,
            ),
            ser_param(
                "secret_key_cmd",
                &self.secret_key_cmd.clone().unwrap_or_default(),
                "Subprocess command whose stdout is the relayer's signing key.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "database_url",
                &self.database_url,
                "Connection string for the Credit Ledger's database.",
                ParamPrivacyInput::Private,
            ),
            ser_param("log_level", &self.log_level, "Log level filter.", ParamPrivacyInput::Public),
        ])
    }
}
