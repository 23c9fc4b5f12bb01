pub mod analysis;
pub mod keyword;
pub mod message;
pub mod room;
pub mod summary;
pub mod user;

pub use analysis::AnalysisResult;
pub use keyword::Keyword;
pub use message::{EnrichedMessage, Message};
pub use room::Room;
pub use summary::Summary;
pub use user::User;
