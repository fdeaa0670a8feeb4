mod boilerplate;
mod builder;
mod classify;
mod config;
mod fragments;
mod lines;
mod position_index;
mod title;


pub use builder::OutlineBuilder;
pub use config::HeuristicsConfig;
#[cfg(test)]
pub use lines::{PageLines, TextLine};
