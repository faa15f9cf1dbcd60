pub mod game;
pub mod market;
pub mod quality;
pub mod team;

pub use game::*;
pub use market::*;
pub use quality::*;
pub use team::*;
