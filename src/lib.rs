//! Leaf Doctor
//!
//! 葉の写真を Gemini に送り、病害診断を表示するCLIのライブラリ部分。

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod render;
