pub mod outcome;
pub mod ports;
pub mod record;

pub use outcome::{Outcome, OutcomeClass, Vigilance};
pub use ports::{InputSource, ResultsSink, StimulusPresenter};
pub use record::TrialRecord;
