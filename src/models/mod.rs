pub mod booking;
pub mod event;
pub mod theater;
pub mod user;

pub use booking::Booking;
pub use event::Event;
pub use theater::Theater;
pub use user::User;
