mod diff;
pub mod labels;

pub use diff::Reconciler;
