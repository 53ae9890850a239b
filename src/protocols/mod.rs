//! Protocol implementations.
//!
//! - `device`: text command protocol for the shared device

pub mod device;
