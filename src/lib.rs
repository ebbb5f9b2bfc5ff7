//! drawsync: a shared drawing surface kept in sync over websockets.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each room holds one authoritative action log. Clients send strokes and
//! structural commands (undo, redo, clear); the room's coordinator applies
//! them in arrival order and tells every connection what changed. Cursor
//! positions ride the same sockets but never touch the log.

pub mod action;
pub mod action_log;
pub mod config;
pub mod coordinator;
pub mod frame;
pub mod presence;
pub mod protocol;
pub mod routes;
pub mod services;
pub mod state;
