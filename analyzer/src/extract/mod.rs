pub mod occurrence;
pub mod payloads;
pub mod rules;
pub mod span;
pub mod steps;
