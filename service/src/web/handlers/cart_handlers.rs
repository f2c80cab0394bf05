// cart_service/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use cartflow::models::requests::{AddToCart, RemoveFromCart};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QuantityPayload {
  pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct EditCartItemPayload {
  pub username: String,
  pub cart_item_id: Uuid,
  pub quantity: i32,
}

/// Serves both `POST /cartitem` and `POST /user/addcartitem`.
#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, req_payload),
  fields(username = %req_payload.username, product = %req_payload.product_name)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCart>,
) -> Result<HttpResponse, AppError> {
  let AddToCart {
    username,
    product_name,
    quantity,
  } = req_payload.into_inner();
  let cart_item = app_state.shop.add_to_cart(&username, &product_name, quantity).await?;
  info!(cart_item_id = %cart_item.id, quantity = cart_item.quantity, "Item added to cart.");
  Ok(HttpResponse::Created().json(cart_item))
}

/// Responds with what is left in the cart.
#[instrument(name = "handler::remove_from_cart", skip(app_state, req_payload), fields(username = %req_payload.username))]
pub async fn remove_from_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RemoveFromCart>,
) -> Result<HttpResponse, AppError> {
  let remaining = app_state
    .shop
    .remove_from_cart(&req_payload.username, req_payload.cart_item_id)
    .await?;
  Ok(HttpResponse::Ok().json(remaining))
}

#[instrument(name = "handler::edit_cart_item", skip(app_state, req_payload), fields(username = %req_payload.username))]
pub async fn edit_cart_item_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<EditCartItemPayload>,
) -> Result<HttpResponse, AppError> {
  let cart_item = app_state
    .shop
    .update_quantity(req_payload.cart_item_id, req_payload.quantity, Some(&req_payload.username))
    .await?;
  Ok(HttpResponse::Ok().json(cart_item))
}

#[instrument(name = "handler::get_cart_item", skip(app_state))]
pub async fn get_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let entry = app_state.shop.get_cart_item(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(entry))
}

#[instrument(name = "handler::update_cart_item", skip(app_state, req_payload))]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<QuantityPayload>,
) -> Result<HttpResponse, AppError> {
  let cart_item = app_state
    .shop
    .update_quantity(path.into_inner(), req_payload.quantity, None)
    .await?;
  Ok(HttpResponse::Ok().json(cart_item))
}

#[instrument(name = "handler::delete_cart_item", skip(app_state))]
pub async fn delete_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  app_state.shop.delete_cart_item(path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}
