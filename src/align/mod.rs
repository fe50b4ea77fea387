pub mod aligner;
pub mod scorer;
