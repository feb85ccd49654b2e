//! Websprite engine crate.
//!
//! Columnar (struct-of-arrays) instance storage for instanced sprite
//! rendering, plus the platform + GPU runtime pieces that upload and draw it.

pub mod soa;

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
