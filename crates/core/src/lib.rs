//! Box-match stage engine. Keep this crate free of IO and platform concerns.

pub mod boxes;
pub mod combo;
pub mod config;
pub mod dispenser;
pub mod distribution;
pub mod error;
pub mod events;
pub mod rail;
pub mod registry;
pub mod rng;
pub mod rules;
pub mod services;
pub mod session;
pub mod shuffle;
pub mod spec;
pub mod stage;
pub mod timer;
pub mod token;
pub mod window;

pub use boxes::*;
pub use combo::*;
pub use config::*;
pub use dispenser::*;
pub use distribution::*;
pub use error::*;
pub use events::*;
pub use rail::*;
pub use registry::*;
pub use rng::*;
pub use rules::*;
pub use services::*;
pub use session::*;
pub use shuffle::*;
pub use spec::*;
pub use stage::*;
pub use timer::*;
pub use token::*;
pub use window::*;
