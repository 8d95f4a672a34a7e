//! onetouch - Rust implementation of the OneTouch glucometer protocol
//!
//! Retrieves stored glucose readings from a OneTouch meter over a BLE-UART
//! style byte pipe.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `onetouch-core`: Error taxonomy, measurement record, device clock
//! - `onetouch-transport`: Outbound byte sink abstraction
//! - `onetouch-session`: Frame codec with CRC16 and stop-and-wait fragmentation
//! - `onetouch-application`: Commands, responses and the sync state machine
//! - `onetouch-client`: Async client running the session in a tokio task
//! - `onetouch-meter`: Simulated meter for hardware-free testing
//!
//! # Usage
//!
//! ```no_run
//! use onetouch::client::MeterClientBuilder;
//! ```

// Re-export core types
pub use onetouch_core::{Measurement, OneTouchError, OneTouchResult};

// Re-export the synchronous session API
pub use onetouch_application::{
    ApplicationSink, LimitKind, MeterSession, SessionConfig, SessionState, SyncState,
};
pub use onetouch_transport::TransportSink;

pub mod session {
    pub use onetouch_session::*;
}

pub mod application {
    pub use onetouch_application::*;
}

// Re-export client API
pub mod client {
    pub use onetouch_client::*;
}

// Re-export the simulator
pub mod meter {
    pub use onetouch_meter::*;
}
