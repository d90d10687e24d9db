//! Scripted connections and row builders for exercising the engine without a
//! database server. Enabled by the `test-utils` feature.

mod mock;
mod test_helpers;

pub use mock::{ExecutedCommand, MockConnection, MockEvent, MockHandle, MockResponse};
pub use test_helpers::{create_test_row, mock_service};
