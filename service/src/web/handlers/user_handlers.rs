// cart_service/src/web/handlers/user_handlers.rs

use actix_web::{web, HttpResponse};
use cartflow::models::requests::{RenameUser, Username};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::create_user", skip(app_state, req_payload), fields(username = %req_payload.username))]
pub async fn create_user_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<Username>,
) -> Result<HttpResponse, AppError> {
  let user = app_state.shop.create_user(&req_payload.username).await?;
  info!(user_id = %user.id, "User created.");
  Ok(HttpResponse::Created().json(user))
}

#[instrument(name = "handler::list_users", skip(app_state))]
pub async fn list_users_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let users = app_state.shop.list_users().await?;
  Ok(HttpResponse::Ok().json(users))
}

/// The user together with the active cart.
#[instrument(name = "handler::get_user", skip(app_state, path), fields(username = %path.as_ref()))]
pub async fn get_user_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let profile = app_state.shop.get_user(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(profile))
}

#[instrument(name = "handler::edit_user", skip(app_state, req_payload), fields(username = %req_payload.username))]
pub async fn edit_user_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RenameUser>,
) -> Result<HttpResponse, AppError> {
  let RenameUser { username, new_username } = req_payload.into_inner();
  let profile = app_state.shop.rename_user(&username, &new_username).await?;
  Ok(HttpResponse::Ok().json(profile))
}

#[instrument(name = "handler::delete_user", skip(app_state, path), fields(username = %path.as_ref()))]
pub async fn delete_user_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  app_state.shop.delete_user(&path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
  use crate::web::testing::test_app;
  use actix_web::{http::StatusCode, test};
  use cartflow::models::{User, UserProfile};
  use serde_json::json;

  #[actix_web::test]
  async fn rename_keeps_identity_and_frees_old_name() {
    let app = test_app!();

    let req = test::TestRequest::post()
      .uri("/api/user")
      .set_json(json!({"username": "alice"}))
      .to_request();
    let alice: User = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::put()
      .uri("/api/user/edituser")
      .set_json(json!({"username": "alice", "new_username": "alicia"}))
      .to_request();
    let profile: UserProfile = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile.user.id, alice.id);
    assert_eq!(profile.user.username, "alicia");
    assert!(profile.cart.is_empty());

    let req = test::TestRequest::get().uri("/api/user/alice").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
  }

  #[actix_web::test]
  async fn delete_then_list_is_empty() {
    let app = test_app!();

    let req = test::TestRequest::post()
      .uri("/api/user")
      .set_json(json!({"username": "bob"}))
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::delete().uri("/api/user/bob").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get().uri("/api/user").to_request();
    let users: Vec<User> = test::call_and_read_body_json(&app, req).await;
    assert!(users.is_empty());
  }

  #[actix_web::test]
  async fn blank_username_is_400() {
    let app = test_app!();
    let req = test::TestRequest::post()
      .uri("/api/user")
      .set_json(json!({"username": "   "}))
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
  }
}
