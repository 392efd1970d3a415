pub mod fav;
pub mod goal;
pub mod note;
pub mod study;
