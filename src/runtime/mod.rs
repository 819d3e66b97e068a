mod channel;

pub use channel::{Channel, ChannelEvent, ChannelOptions};
