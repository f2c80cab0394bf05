// cart_service/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use cartflow::models::requests::ProductName;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::create_product", skip(app_state, req_payload), fields(name = %req_payload.name))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ProductName>,
) -> Result<HttpResponse, AppError> {
  let product = app_state.shop.create_product(&req_payload.name).await?;
  info!(product_id = %product.id, "Product created.");
  Ok(HttpResponse::Created().json(product))
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = app_state.shop.list_products().await?;
  info!("Successfully fetched {} products.", products.len());
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(name = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let product = app_state.shop.get_product(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(product))
}

/// Renames the product in the path to the `name` in the body.
#[instrument(name = "handler::update_product", skip(app_state, path, req_payload), fields(name = %path.as_ref()))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_payload: web::Json<ProductName>,
) -> Result<HttpResponse, AppError> {
  let product = app_state
    .shop
    .rename_product(&path.into_inner(), &req_payload.name)
    .await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::delete_product", skip(app_state, path), fields(name = %path.as_ref()))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  app_state.shop.delete_product(&path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}
