// cartflow/src/shop/catalog.rs

use super::{settle, validate_name, Shop};
use crate::error::{ShopError, ShopResult};
use crate::models::Product;
use tracing::{info, instrument};

impl Shop {
  /// Registers a product. Fails with `Conflict` when the name is taken; the
  /// existing row is left untouched.
  #[instrument(name = "shop::create_product", skip(self), err(Display))]
  pub async fn create_product(&self, name: &str) -> ShopResult<Product> {
    let name = validate_name("product name", name)?;
    let uow = self.begin().await?;
    let result: ShopResult<Product> = async { Ok(uow.insert_product(&name).await?) }.await;
    let product = settle(uow.as_ref(), result).await?;
    info!(product_id = %product.id, "Product created.");
    Ok(product)
  }

  #[instrument(name = "shop::get_product", skip(self), err(Display))]
  pub async fn get_product(&self, name: &str) -> ShopResult<Product> {
    let uow = self.begin().await?;
    let result: ShopResult<Product> = async {
      uow
        .product_by_name(name)
        .await?
        .ok_or_else(|| ShopError::not_found("product", name))
    }
    .await;
    settle(uow.as_ref(), result).await
  }

  #[instrument(name = "shop::list_products", skip(self), err(Display))]
  pub async fn list_products(&self) -> ShopResult<Vec<Product>> {
    let uow = self.begin().await?;
    let result: ShopResult<Vec<Product>> = async { Ok(uow.list_products().await?) }.await;
    settle(uow.as_ref(), result).await
  }

  /// Renames a product, keeping names unique.
  #[instrument(name = "shop::rename_product", skip(self), err(Display))]
  pub async fn rename_product(&self, name: &str, new_name: &str) -> ShopResult<Product> {
    let new_name = validate_name("new product name", new_name)?;
    let uow = self.begin().await?;
    let result: ShopResult<Product> = async {
      let mut product = uow
        .product_by_name(name)
        .await?
        .ok_or_else(|| ShopError::not_found("product", name))?;
      if product.name != new_name && uow.product_by_name(&new_name).await?.is_some() {
        return Err(ShopError::Conflict(format!("product '{new_name}' already exists")));
      }
      product.name = new_name.clone();
      Ok(uow.update_product(&product).await?)
    }
    .await;
    let product = settle(uow.as_ref(), result).await?;
    info!(product_id = %product.id, new_name = %product.name, "Product renamed.");
    Ok(product)
  }

  /// Deletes a product. A product still referenced by any cart item (active
  /// or ordered) cannot be deleted and yields `Conflict`.
  #[instrument(name = "shop::delete_product", skip(self), err(Display))]
  pub async fn delete_product(&self, name: &str) -> ShopResult<()> {
    let uow = self.begin().await?;
    let result: ShopResult<()> = async {
      let product = uow
        .product_by_name(name)
        .await?
        .ok_or_else(|| ShopError::not_found("product", name))?;
      uow.delete_product(product.id).await?;
      Ok(())
    }
    .await;
    settle(uow.as_ref(), result).await?;
    info!("Product deleted.");
    Ok(())
  }
}
