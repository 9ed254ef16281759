//! Route handlers organized by resource

pub mod guides;
pub mod health;
