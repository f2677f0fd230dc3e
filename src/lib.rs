pub mod acceptor;
pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod message;
pub mod queue;
pub mod reader;
pub mod server;
pub mod sweeper;
pub mod table;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use message::{decode_message, DecodeError, Message, MessageBody, MessageOrError, SoftwareError};
pub use queue::QueueItem;
pub use server::Server;
pub use table::{ConnectionTable, TableError};
