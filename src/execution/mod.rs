pub mod gateway;
pub mod paper;
pub mod session;

pub use gateway::{GatewayCall, OrderGateway, RecordingGateway};
pub use paper::PaperGateway;
pub use session::PaperSession;
