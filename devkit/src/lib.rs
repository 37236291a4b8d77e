/*!
# Swasthya DevKit - Stubs and test utilities

Tooling for developing and testing the dashboard core without the real
remote service:
- `MockFetcher`: scripted, gateable `DataFetcher`
- `PayloadBuilder`: raw payloads shaped like the remote service's
- `StubBackend`: in-process HTTP stub of the remote service
- `TestHarness`: dashboard + mock fetcher + snapshot waiting helpers
*/

pub mod fixtures;
pub mod mock_fetcher;
pub mod stub_backend;
pub mod test_utils;

pub use fixtures::PayloadBuilder;
pub use mock_fetcher::{FetchCall, FetchGate, MockFetcher};
pub use stub_backend::StubBackend;
pub use test_utils::TestHarness;
