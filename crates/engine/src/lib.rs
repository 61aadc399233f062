pub use channels::Channel;
pub use error::EngineError;
pub use ops::{Engine, EngineBuilder};
pub use promotions::{Promotion, PromotionStatus};

mod channels;
mod error;
mod ops;
mod promotions;

type ResultEngine<T> = Result<T, EngineError>;
