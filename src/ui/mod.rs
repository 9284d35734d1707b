pub mod help;
pub mod input;
pub mod renderer;
pub mod sound;
