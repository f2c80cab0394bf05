// cart_service/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use cartflow::models::requests::CreateOrder;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// Moves the listed cart items into a new order in one transaction.
#[instrument(
  name = "handler::create_order",
  skip(app_state, req_payload),
  fields(username = %req_payload.username, requested = req_payload.cart_item_ids.len())
)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CreateOrder>,
) -> Result<HttpResponse, AppError> {
  let details = app_state
    .shop
    .create_order(&req_payload.username, &req_payload.cart_item_ids)
    .await?;
  info!(order_id = %details.order.id, items = details.items.len(), "Order created.");
  Ok(HttpResponse::Created().json(details))
}

#[instrument(name = "handler::get_order", skip(app_state))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let details = app_state.shop.get_order(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(details))
}

#[instrument(name = "handler::list_orders", skip(app_state, path), fields(username = %path.as_ref()))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.shop.list_orders(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(orders))
}
