//! Log sinks for hosts embedding the store.
//!
//! The store only ever talks to the `log` facade. Hosts that want to pull diagnostics into their
//! own loop can install [`ChannelLogger`] and drain the receiving side.

mod channel;

pub use channel::{ChannelLogger, LogMessage};
