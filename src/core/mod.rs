pub mod config;
pub mod error;
pub mod types;

pub use config::{load_rules, RulesConfig};
pub use error::{Rejection, RejectionKind, SibylError};
pub use types::{Direction, Position, Round, Side, UnitId};
