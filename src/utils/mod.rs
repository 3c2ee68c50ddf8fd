pub mod timeout;

pub use timeout::bounded;
