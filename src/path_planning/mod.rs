// Path Planning algorithms module

pub mod heuristics;
pub mod a_star;
pub mod path_smoothing;

pub use heuristics::*;
pub use a_star::*;
pub use path_smoothing::*;
