//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                     |
//! |-------------|--------------------|---------------------------------|
//! | `hardware`  | SensorPort         | embedded-hal GPIO, current ADC  |
//! |             | ActuatorPort       | embedded-hal GPIO relays        |
//! | `sim`       | SensorPort         | simulated reservoirs and pumps  |
//! |             | ActuatorPort       |                                 |
//! | `kv_store`  | StoragePort        | in-memory / filesystem store    |
//! |             | ConfigPort         | postcard blob in a StoragePort  |
//! | `log_sink`  | EventSink          | `log` facade                    |
//! | `time`      | ClockPort          | host monotonic + wall clock     |

pub mod hardware;
pub mod kv_store;
pub mod log_sink;
pub mod sim;
pub mod time;
