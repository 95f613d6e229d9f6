//! Chat platform side of the proxy: the `ChatChannel` port, bot commands,
//! reply splitting, and the dispatcher both transports feed.

pub mod chunk;
pub mod command;
pub mod dispatcher;
pub mod port;
