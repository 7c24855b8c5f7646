//! Reusable mock types for testing the optimization layer without a
//! network.


pub use transport_mock::{MockBehavior, MockTransport};
