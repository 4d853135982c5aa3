pub mod category;
pub mod item;
pub mod page;
pub mod user;

pub use category::Category;
pub use item::{Item, ItemId, ItemKind, VoteDirection};
pub use page::{CommentWithStory, ItemPage};
pub use user::User;
