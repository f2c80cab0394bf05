// cartflow/src/rpc/command.rs

use super::envelope::RawRequest;
use crate::models::requests::{
  AddToCart, CreateOrder, EntityId, ProductName, RemoveFromCart, RenameProduct, RenameUser, UpdateCartItem, Username,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One operation requested over the queue. The `pattern` of the request picks
/// the variant, `data` is its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pattern", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
  CreateProduct(ProductName),
  GetProduct(ProductName),
  GetProducts,
  UpdateProduct(RenameProduct),
  DeleteProduct(ProductName),
  CreateUser(Username),
  GetUser(Username),
  GetUsers,
  EditUser(RenameUser),
  DeleteUser(Username),
  AddToCart(AddToCart),
  RemoveFromCart(RemoveFromCart),
  GetCartItem(EntityId),
  UpdateCartItem(UpdateCartItem),
  DeleteCartItem(EntityId),
  CreateOrder(CreateOrder),
  GetOrder(EntityId),
  GetOrders(Username),
}

#[derive(Debug, Error)]
pub enum DecodeError {
  #[error("malformed request: {0}")]
  Malformed(#[source] serde_json::Error),

  #[error("unknown pattern '{0}'")]
  UnknownPattern(String),

  #[error("invalid data for pattern '{pattern}': {source}")]
  InvalidPayload {
    pattern: String,
    #[source]
    source: serde_json::Error,
  },
}

impl Command {
  pub const PATTERNS: [&'static str; 18] = [
    "CREATE_PRODUCT",
    "GET_PRODUCT",
    "GET_PRODUCTS",
    "UPDATE_PRODUCT",
    "DELETE_PRODUCT",
    "CREATE_USER",
    "GET_USER",
    "GET_USERS",
    "EDIT_USER",
    "DELETE_USER",
    "ADD_TO_CART",
    "REMOVE_FROM_CART",
    "GET_CART_ITEM",
    "UPDATE_CART_ITEM",
    "DELETE_CART_ITEM",
    "CREATE_ORDER",
    "GET_ORDER",
    "GET_ORDERS",
  ];

  /// Parses a delivery body into the raw envelope and then the command.
  pub fn decode(body: &[u8]) -> Result<(RawRequest, Command), DecodeError> {
    let raw: RawRequest = serde_json::from_slice(body).map_err(DecodeError::Malformed)?;
    let command = Command::from_raw(&raw)?;
    Ok((raw, command))
  }

  pub fn from_raw(raw: &RawRequest) -> Result<Command, DecodeError> {
    if !Self::PATTERNS.contains(&raw.pattern.as_str()) {
      return Err(DecodeError::UnknownPattern(raw.pattern.clone()));
    }

    let mut tagged = Map::new();
    tagged.insert("pattern".to_string(), Value::String(raw.pattern.clone()));
    // Patterns without payload are sent with `data: null` or no data at all.
    if !raw.data.is_null() {
      tagged.insert("data".to_string(), raw.data.clone());
    }

    serde_json::from_value(Value::Object(tagged)).map_err(|source| DecodeError::InvalidPayload {
      pattern: raw.pattern.clone(),
      source,
    })
  }

  pub fn pattern(&self) -> &'static str {
    match self {
      Command::CreateProduct(_) => "CREATE_PRODUCT",
      Command::GetProduct(_) => "GET_PRODUCT",
      Command::GetProducts => "GET_PRODUCTS",
      Command::UpdateProduct(_) => "UPDATE_PRODUCT",
      Command::DeleteProduct(_) => "DELETE_PRODUCT",
      Command::CreateUser(_) => "CREATE_USER",
      Command::GetUser(_) => "GET_USER",
      Command::GetUsers => "GET_USERS",
      Command::EditUser(_) => "EDIT_USER",
      Command::DeleteUser(_) => "DELETE_USER",
      Command::AddToCart(_) => "ADD_TO_CART",
      Command::RemoveFromCart(_) => "REMOVE_FROM_CART",
      Command::GetCartItem(_) => "GET_CART_ITEM",
      Command::UpdateCartItem(_) => "UPDATE_CART_ITEM",
      Command::DeleteCartItem(_) => "DELETE_CART_ITEM",
      Command::CreateOrder(_) => "CREATE_ORDER",
      Command::GetOrder(_) => "GET_ORDER",
      Command::GetOrders(_) => "GET_ORDERS",
    }
  }
}
