pub mod metadata;
pub mod renderer;
pub mod state;
