pub mod normalize;
pub mod snapshot_model;
