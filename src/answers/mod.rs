//! Saved answer storage module.
//!
//! Persists each user's chosen field values for the target form.

mod store;

pub use store::{AnswerRecord, AnswerStore, StoreError};
