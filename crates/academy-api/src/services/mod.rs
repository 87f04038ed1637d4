// Service layer between HTTP handlers and storage

mod realtime;

pub use realtime::RealtimeService;
