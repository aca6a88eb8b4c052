//! WebSocket transport: upgrade handler, wire protocol and outbound fan-out

pub mod broadcast;
pub mod handler;
pub mod protocol;
