pub mod converter;
pub mod dimensions;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod plan;
pub mod store;
pub mod tempfiles;
