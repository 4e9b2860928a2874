//! Domain models for the clinic core.

mod appointment;
mod encounter;
mod facility;
mod invoice;
mod patient;

pub use appointment::*;
pub use encounter::*;
pub use facility::*;
pub use invoice::*;
pub use patient::*;
