//! Seeded greedy autoplay and difficulty probing over the stage API.

mod action;
mod config;
mod error;
mod greedy;
mod objective;
mod simulator;
mod trace;

pub use action::*;
pub use config::*;
pub use error::*;
pub use greedy::*;
pub use objective::*;
pub use simulator::*;
pub use trace::*;
