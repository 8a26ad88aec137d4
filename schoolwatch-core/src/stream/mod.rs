pub mod address;
pub mod decoder_session;
pub mod manager;
pub mod schedule;
