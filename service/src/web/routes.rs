// cart_service/src/web/routes.rs

use crate::state::AppState;
use crate::web::handlers::{cart_handlers, order_handlers, product_handlers, user_handlers};
use actix_web::{web, HttpResponse};

async fn health_check_handler(app_state: web::Data<AppState>) -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({
    "status": "ok",
    "rpc_queue": app_state.config.rpc_queue,
  }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      // Products
      .service(
        web::resource("/product")
          .route(web::post().to(product_handlers::create_product_handler))
          .route(web::get().to(product_handlers::list_products_handler)),
      )
      .service(
        web::resource("/product/{name}")
          .route(web::get().to(product_handlers::get_product_handler))
          .route(web::put().to(product_handlers::update_product_handler))
          .route(web::delete().to(product_handlers::delete_product_handler)),
      )
      // Cart items
      .route("/cartitem", web::post().to(cart_handlers::add_to_cart_handler))
      .service(
        web::resource("/cartitem/{id}")
          .route(web::get().to(cart_handlers::get_cart_item_handler))
          .route(web::put().to(cart_handlers::update_cart_item_handler))
          .route(web::delete().to(cart_handlers::delete_cart_item_handler)),
      )
      // Users. The fixed paths must be registered before `/user/{username}`.
      .route("/user/addcartitem", web::post().to(cart_handlers::add_to_cart_handler))
      .route("/user/removecartitem", web::delete().to(cart_handlers::remove_from_cart_handler))
      .route("/user/editcartitem", web::put().to(cart_handlers::edit_cart_item_handler))
      .route("/user/edituser", web::put().to(user_handlers::edit_user_handler))
      .service(
        web::resource("/user")
          .route(web::post().to(user_handlers::create_user_handler))
          .route(web::get().to(user_handlers::list_users_handler)),
      )
      .route("/user/{username}/orders", web::get().to(order_handlers::list_orders_handler))
      .service(
        web::resource("/user/{username}")
          .route(web::get().to(user_handlers::get_user_handler))
          .route(web::delete().to(user_handlers::delete_user_handler)),
      )
      // Orders
      .route("/order", web::post().to(order_handlers::create_order_handler))
      .route("/order/{id}", web::get().to(order_handlers::get_order_handler)),
  );
}
