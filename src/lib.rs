//! TIE measurement capture and charting for PTP hardware clocks.
//!
//! Consumes the line-oriented output of the external `OpenTimeInstrument`
//! process, keeps bounded per-channel sample rings with rolling statistics,
//! and produces charts and CSV snapshots on demand. The instrument itself
//! (ioctls, PTP protocol) stays external; only its text protocol is spoken
//! here.

pub mod capture;
pub mod config;
pub mod device;
