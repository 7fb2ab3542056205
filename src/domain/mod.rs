pub mod notification;
pub mod order;
pub mod restaurant;
pub mod status;
pub mod user;

pub use notification::*;
pub use order::*;
pub use restaurant::*;
pub use status::*;
pub use user::*;
