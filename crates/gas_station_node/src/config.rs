use std::collections::BTreeMap;

use apollo_config::dumping::{prepend_sub_config_name, SerializeConfig};
use apollo_config::{ParamPath, SerializedParam};
use gas_station_gateway_config::GatewayConfig;
use gas_station_scheduler_config::SchedulerConfig;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Top-level config of the node binary: the union of every component's own
/// config, the way `apollo_node`'s aggregate config nests each component's
/// `SerializeConfig` under its own sub-path.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate, PartialEq)]
pub struct GasStationConfig {
    #[validate(nested)]
    pub gateway: GatewayConfig,
    #[validate(nested)]
    pub scheduler: SchedulerConfig,
}

impl SerializeConfig for GasStationConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        let mut dump = BTreeMap::new();
        dump.append(&mut prepend_sub_config_name(self.gateway.dump(), "gateway"));
        dump.append(&mut prepend_sub_config_name(self.scheduler.dump(), "scheduler"));
        dump
    }
}
