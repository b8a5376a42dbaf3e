pub mod converters;
pub mod error;
pub mod providers;
pub mod stream;
