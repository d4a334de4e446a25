pub mod health;
pub mod stream;

pub use health::healthcheck;
pub use stream::{global_stream, watchlist_stream};
