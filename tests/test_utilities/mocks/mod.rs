/// Mock implementations for testing
mod mock_action_executor;
mod mock_event_sink;
mod mock_image_scanner;
mod mock_policy_engine;

#[allow(unused_imports)]
pub use mock_action_executor::MockActionExecutor;
#[allow(unused_imports)]
pub use mock_event_sink::MockEventSink;
#[allow(unused_imports)]
pub use mock_image_scanner::MockImageScanner;
#[allow(unused_imports)]
pub use mock_policy_engine::MockPolicyEngine;
