pub mod daemon_client;
pub mod fragments;
pub mod insight;
pub mod memory;
