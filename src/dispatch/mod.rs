//! Demultiplexing of inbound typed messages to independent subscribers

mod dispatcher;

pub use dispatcher::{EventDispatcher, Subscription};
