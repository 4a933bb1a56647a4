/*!
# ssh_exporter devkit - test doubles and fixtures

- `MockRunner`: scripted `RemoteRunner`, no SSH server needed
- `ScriptBuilder` / `ConfigBuilder`: configuration documents in a few lines
- `TestHarness`: temp directory holding a config file and a dummy key
*/

pub mod config_builder;
pub mod mock_runner;
pub mod test_utils;

pub use config_builder::{ConfigBuilder, ScriptBuilder};
pub use mock_runner::{MockCall, MockReply, MockRunner};
pub use test_utils::{assert_sample, sample_value, TestHarness};
