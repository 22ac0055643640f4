pub mod client;
pub mod error;
pub mod model;

pub use client::ReferralsApi;
pub use error::ReferralsError;
pub use model::*;
