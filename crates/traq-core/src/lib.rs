pub mod error;
pub mod gate;
pub mod git;
pub mod health;
pub mod io;
pub mod lifecycle;
pub mod paths;
pub mod policy;
pub mod refs;
pub mod state;
pub mod store;

pub use error::{Result, TraqError};
