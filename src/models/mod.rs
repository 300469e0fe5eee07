pub mod enums;

pub mod dac;
pub mod dar;
pub mod dataset;
pub mod election;
pub mod user;
pub mod vote;
