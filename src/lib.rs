//! fieldlink: a two-seat WebRTC signaling rendezvous. One technician, one
//! expert per room; the server relays their negotiation messages verbatim
//! and never touches media.

pub mod signaling;
