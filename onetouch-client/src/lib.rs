//! Async OneTouch meter client
//!
//! Runs a meter session inside a tokio task. Outbound chunks come out of an
//! unbounded channel for whatever owns the radio link; inbound chunks and
//! commands go in through the cloneable [`MeterClient`] handle; results come
//! back as [`MeterEvent`]s.
//!
//! # Usage
//!
//! ```rust,no_run
//! use onetouch_client::MeterClientBuilder;
//! use std::time::Duration;
//!
//! # async fn demo() -> onetouch_core::OneTouchResult<()> {
//! let (client, mut channels) = MeterClientBuilder::new()
//!     .mtu(20)
//!     .poll_interval(Duration::from_secs(60))
//!     .build()?;
//!
//! client.connect().await?;
//! while let Some(event) = channels.events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod client;
pub mod event;

pub use builder::MeterClientBuilder;
pub use client::{MeterChannels, MeterClient};
pub use event::{EventSink, MeterEvent};
