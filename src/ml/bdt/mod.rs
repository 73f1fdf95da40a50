//! Boosted decision trees over the mass-inflated, balanced sample.

mod model;
mod tree;

pub use model::{Bdt, BdtOptions, BdtReport};
pub use tree::{BoostOptions, Node, Tree, TreeEnsemble, TreeError};
