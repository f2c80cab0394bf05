// cartflow/src/models/mod.rs

//! Entities persisted by the store, and the joined views returned to callers.

pub mod cart_item;
pub mod order;
pub mod product;
pub mod requests;
pub mod user;

pub use cart_item::{CartEntry, CartItem, NewCartItem};
pub use order::{Order, OrderDetails};
pub use product::Product;
pub use user::{User, UserProfile};
