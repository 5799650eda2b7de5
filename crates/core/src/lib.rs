#![forbid(unsafe_code)]

pub mod forest;
pub mod model;
pub mod time;
pub mod views;

pub use forest::{Forest, ForestError, NodeRef};
pub use time::Clock;
