pub mod assemble;
pub mod metrics;
pub mod naming;
pub mod normalize;
pub mod validate;
