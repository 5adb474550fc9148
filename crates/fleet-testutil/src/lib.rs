//! In-memory fakes for every `fleet-types` port, shared across the workspace's
//! test suites. Grounded on the teacher's fakes-over-mocks testing philosophy:
//! no `mockall`/`wiremock` dev-dependency here, just hand-written stand-ins
//! that are cheap to reason about and don't encode expectations in macros.

pub mod clock;
pub mod fake_driver;
pub mod fake_metrics;
pub mod fake_session_store;

pub use clock::FakeClock;
pub use fake_driver::{FakeBrowserHandle, FakeDriver, FakePageHandle};
pub use fake_metrics::{FakeMetricsSink, RecordedCounter, RecordedGauge, RecordedHistogram};
pub use fake_session_store::FakeSessionStore;
