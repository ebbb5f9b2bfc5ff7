//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own locking and delivery so route handlers can stay
//! focused on protocol translation. The protocol rules themselves live in
//! `coordinator` and never see a socket.

pub mod room;
