//! HTTP handlers.

pub mod demo;
pub mod generate;
pub mod health;
pub mod jobs;

pub use demo::*;
pub use generate::*;
pub use health::*;
pub use jobs::*;
