//! Packgo pack-and-ship station agent
//!
//! This library implements the operator-side packgo workflow: claiming
//! orders from a shared pick queue under a server-issued lease, decoding
//! keyboard-wedge barcode scans into pick progress, and printing shipping
//! labels through a local print bridge once an order is fully picked.

pub mod config;
pub mod models;
pub mod pick;
pub mod scan;
pub mod services;
pub mod station;
