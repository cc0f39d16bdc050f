// Embeddable dashboard engine: parameter resolution, substitution, grid layout, embed codec and sessions
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
