pub mod calendar;
mod cash_request;
mod directory;
mod event;
mod money;
mod record;
mod student;

pub use calendar::OperatingZone;
pub use cash_request::*;
pub use directory::*;
pub use event::*;
pub use money::*;
pub use record::*;
pub use student::*;
