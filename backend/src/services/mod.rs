pub mod export;
pub mod match_browser;
pub mod normalize;
pub mod predictor;
pub mod repository;
pub mod team_stats;

pub use export::*;
pub use match_browser::*;
pub use predictor::*;
pub use repository::*;
