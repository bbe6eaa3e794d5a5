pub mod event;
pub mod service;
pub mod user;

pub use event::{Action, Event};
pub use service::{Service, Tag};
pub use user::{User, UserContext};
