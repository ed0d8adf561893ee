//! Launch bridge: start sessions on this machine from an HTTP request.
//!
//! The bridge resolves an identifier, writes the session manifest, and
//! starts a detached supervisor process for it. It answers as soon as the
//! spawn call returns and never observes how the session ends.

pub mod pages;
pub mod server;

pub use server::{launch_detached, router, serve, serve_listener, BridgeState, LaunchTicket};
