//! Repository layer for database operations

pub mod homepage;
pub mod responses;
pub mod surveys;
