//! A small string key/value store served over TCP.
//!
//! Requests are single text lines. The client half-closes its socket to mark
//! the end of a request; the server answers with a single reply and closes.
//!
//! ## Command set
//! - `SET <key> <value>`
//! - `GET <key>`
//! - `DEL <key>`
//! - `EXISTS <key>`
//! - `EXPIRE <key> <duration in humantime format>`
//! - `INCR <key>` / `DECR <key>`
//! - `CLEAR`
//! - `SAVE` / `LOAD`

pub mod command;
pub mod connection;
pub mod persistence;
pub mod store;
pub mod wire;
