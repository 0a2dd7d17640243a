//! Permission evaluation

pub mod evaluator;
pub mod modes;

pub use evaluator::{check_modes, evaluate, FileStat, Verdict};
pub use modes::{Access, RequestedModes};
