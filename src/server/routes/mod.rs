pub(crate) mod admin;
pub(crate) mod export;
pub(crate) mod health;
pub(crate) mod homepage;
pub(crate) mod responses;
pub(crate) mod surveys;
