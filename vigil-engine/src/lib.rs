pub mod bins;
pub mod classify;
pub mod config;
pub mod likelihood;
pub mod posterior;
pub mod scheduler;
pub mod session;

pub use config::{ConfigError, TestConfig};
pub use likelihood::{LikelihoodTable, Ratios, TableError};
pub use posterior::{PosteriorEngine, PosteriorSnapshot, PriorError};
pub use scheduler::{IsiScheduler, StimulusWait};
pub use session::{Session, SessionState};
