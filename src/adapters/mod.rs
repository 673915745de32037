//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                   |
//! |----------------|--------------------|-------------------------------|
//! | `camera`       | CameraPort         | Test pattern / snapshot replay|
//! | `light`        | LightPort          | Simulated bulb, timeout guard |
//! | `time`         | ClockPort          | System wall clock             |
//! | `rig`          | all device ports   | Bundles camera, light, clock  |
//! | `file_store`   | SnapshotStore      | Storage directory (inline)    |
//! | `background`   | SnapshotStore      | Writer task via channel       |
//! | `config_file`  | ConfigPort         | JSON config file              |
//! | `linear_model` | Scorer             | JSON linear model             |
//! | `log_sink`     | EventSink          | `log` facade                  |

pub mod background;
pub mod camera;
pub mod config_file;
pub mod file_store;
pub mod light;
pub mod linear_model;
pub mod log_sink;
pub mod rig;
pub mod time;
