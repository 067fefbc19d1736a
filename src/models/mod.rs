pub mod session;

pub use session::{DailyStats, Session, SessionStats};
