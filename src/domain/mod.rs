//! Domain Layer
//!
//! Catalog entities, value objects, ports and pure services. No I/O.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;
