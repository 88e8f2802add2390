//! RescueSync reference authority: accepts sync items from offline-first
//! clients and keeps the authoritative copy of every request.

pub mod server;
