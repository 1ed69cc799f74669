mod error;
mod health_check;
mod subscribers;

pub use error::*;
pub use health_check::*;
pub use subscribers::*;
