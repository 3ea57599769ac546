//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements     | Connects to               |
//! |---------------|----------------|---------------------------|
//! | `flight_log`  | FlightLogPort  | any StoragePort           |
//! | `log_sink`    | EventSink      | `log` facade              |
//! | `nvs`         | StoragePort    | in-memory key/value store |

pub mod flight_log;
pub mod log_sink;
pub mod nvs;
