// Domain layer - Dashboard, card, parameter and board models
pub mod board;
pub mod card;
pub mod dashboard;
pub mod event;
pub mod parameter;
pub mod query;

#[cfg(test)]
pub(crate) mod fixtures;
