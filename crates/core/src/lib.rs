pub mod error;
pub mod logging;

pub mod analysis;
pub mod config;
pub mod content;
pub mod document;
pub mod index;
pub mod model;
pub mod persistence;
pub mod resolve;
pub mod runtime;
pub mod scanner;
pub mod syntax;

pub use error::{Result, StylescopeError};
pub use runtime::{StylescopeEngine, StylescopeEngineBuilder};
