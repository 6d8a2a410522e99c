pub mod action;
pub mod backup;
pub mod config;
pub mod error;
pub mod executor;
pub mod extract;
pub mod forge;
pub mod git;
pub mod io;
pub mod markup;
pub mod paths;
pub mod pipeline;
pub mod publish;
pub mod result;
pub mod types;
pub mod validate;

pub use error::{Result, SeoError};
