use std::collections::BTreeMap;
use std::time::Duration;

use apollo_config::converters::deserialize_milliseconds_to_duration;
use apollo_config::dumping::{ser_param, SerializeConfig};
use apollo_config::{ParamPath, ParamPrivacyInput, SerializedParam};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Configuration of the Batch Scheduler's coordinator loop (§4.4) and the
/// Fee Reconciler it spawns (§4.5).
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct SchedulerConfig {
    /// Period of the flush tick, in milliseconds. Overrides the Oracle's
    /// own `blockDelay` when set to a nonzero value; `0` means "use the
    /// Oracle's reported block delay as-is".
    #[serde(deserialize_with = "deserialize_milliseconds_to_duration")]
    pub block_delay_override_millis: Duration,

    /// Buffer size of the coordinator's enqueue inbox, mirroring
    /// `LocalServerConfig::channel_buffer_size`.
    #[validate(range(min = 1))]
    pub inbox_buffer_size: usize,

    /// Number of `findOperation` retries the Reconciler performs per batch
    /// before abandoning (K in spec.md §4.5; default matches the original
    /// `while nb_try < 4` loop).
    #[validate(range(min = 1))]
    pub reconciler_max_retries: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            block_delay_override_millis: Duration::from_millis(0),
            inbox_buffer_size: 256,
            reconciler_max_retries: 4,
        }
    }
}

impl SerializeConfig for SchedulerConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from_iter([
            ser_param(
                "block_delay_override_millis",
                &self.block_delay_override_millis.as_millis(),
                "Flush tick period in milliseconds; 0 defers to the Oracle's reported block \
                 delay.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "inbox_buffer_size",
                &self.inbox_buffer_size,
                "Buffer size of the coordinator's enqueue inbox.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "reconciler_max_retries",
                &self.reconciler_max_retries,
                "Number of findOperation polls the Fee Reconciler attempts before abandoning a \
                 batch.",
                ParamPrivacyInput::Public,
            ),
        ])
    }
}
