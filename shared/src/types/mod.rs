//! Attribute, value and snapshot types

pub mod attribute;
pub mod snapshot;
