//! Domain layer for tx-guardian
//!
//! Architecture: Pure Domain Logic - violations, program model and type hierarchy
//! carry no I/O and no host concerns

pub mod hierarchy;
pub mod model;
pub mod violations;
