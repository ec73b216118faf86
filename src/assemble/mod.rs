//! Dataset assembly: first-observation selection, left joins, derived scores.
//!
//! The assembler turns visit-keyed source tables into one row per person
//! (the first chronological qualifying observation inside the collection
//! window), enriched with auxiliary measures via key-preserving left joins.

pub mod join;
pub mod score;
pub mod window;

pub use join::{left_join, left_join_many};
pub use score::{Recode, derive_total_score};
pub use window::{SelectedObservations, collection_start, first_observation, first_observation_strict};
