// Domain layer - Core types and error taxonomy

pub mod errors;
pub mod model;
