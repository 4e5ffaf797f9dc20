//! Domain layer - Pure business logic.

pub mod blueprint;
pub mod error;
pub mod ffmpeg;
pub mod paths;
pub mod validator;
