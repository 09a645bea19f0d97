//! Connection management
//!
//! A [`Connection`] is owned by the task serving one WebSocket. Everything
//! else (the registry, routing decisions) only ever sees a
//! [`ConnectionHandle`], which cannot keep the connection alive.

mod connection;
mod handle;

pub use connection::{Connection, ConnectionId, ConnectionState};
pub use handle::{ConnectionHandle, ForwardError};
