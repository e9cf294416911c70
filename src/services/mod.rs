pub mod documentation;
pub mod health_service;
pub mod persistence;
pub mod public_service;
pub mod session_service;
pub mod sse_events;
pub mod sse_service;
pub mod timer_service;
