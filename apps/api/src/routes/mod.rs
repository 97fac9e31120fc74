//! # HTTP Routes
//!
//! ```text
//! routes/
//! ├── health.rs     GET /health
//! ├── login.rs      POST /login
//! ├── crud.rs       generic create / get / list / update / delete
//! ├── guarded.rs    sale, shift, payment, income_product and cart line
//! │                 writes that go through the reconcile workflows
//! ├── workflows.rs  scan-barcode, dosale, doincome, shift_table
//! └── users.rs      user management, SUPER-ADMIN only
//! ```

pub mod crud;
pub mod guarded;
pub mod health;
pub mod login;
pub mod users;
pub mod workflows;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use market_core::{
    Branch, Category, CreateBranch, CreateCategory, CreateIncome, CreateProduct, CreateRemainder,
    CreateSalePoint, CreateSupplier, Income, IncomeProduct, Payment, Product, Remainder, Sale,
    SalePoint, SaleProduct, Shift, Supplier, Transaction, UpdateBranch, UpdateCategory,
    UpdateIncome, UpdateProduct, UpdateRemainder, UpdateSalePoint, UpdateSupplier,
    ValidationError, MAX_LIST_LIMIT,
};
use market_db::{Filter, ListParams, Record};
use tracing::debug;
use url::form_urlencoded;

use crate::auth::require_auth;
use crate::error::ApiResult;
use crate::AppState;

/// Routes reachable without a token.
pub fn public() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/login", post(login::login))
}

/// The authenticated `/v1` tree.
pub fn v1(state: AppState) -> Router<AppState> {
    Router::new()
        // Reference data
        .route("/branch", post(crud::create::<Branch, CreateBranch>).get(crud::list::<Branch>))
        .route(
            "/branch/{id}",
            get(crud::get::<Branch>)
                .put(crud::update::<Branch, UpdateBranch>)
                .delete(crud::delete::<Branch>),
        )
        .route(
            "/sale_point",
            post(crud::create::<SalePoint, CreateSalePoint>).get(crud::list::<SalePoint>),
        )
        .route(
            "/sale_point/{id}",
            get(crud::get::<SalePoint>)
                .put(crud::update::<SalePoint, UpdateSalePoint>)
                .delete(crud::delete::<SalePoint>),
        )
        .route(
            "/category",
            post(crud::create::<Category, CreateCategory>).get(crud::list::<Category>),
        )
        .route(
            "/category/{id}",
            get(crud::get::<Category>)
                .put(crud::update::<Category, UpdateCategory>)
                .delete(crud::delete::<Category>),
        )
        .route("/product", post(crud::create::<Product, CreateProduct>).get(crud::list::<Product>))
        .route(
            "/product/{id}",
            get(crud::get::<Product>)
                .put(crud::update::<Product, UpdateProduct>)
                .delete(crud::delete::<Product>),
        )
        .route(
            "/supplier",
            post(crud::create::<Supplier, CreateSupplier>).get(crud::list::<Supplier>),
        )
        .route(
            "/supplier/{id}",
            get(crud::get::<Supplier>)
                .put(crud::update::<Supplier, UpdateSupplier>)
                .delete(crud::delete::<Supplier>),
        )
        // Stock
        .route(
            "/remainder",
            post(crud::create::<Remainder, CreateRemainder>).get(crud::list::<Remainder>),
        )
        .route(
            "/remainder/{id}",
            get(crud::get::<Remainder>)
                .put(crud::update::<Remainder, UpdateRemainder>)
                .delete(crud::delete::<Remainder>),
        )
        .route("/income", post(crud::create::<Income, CreateIncome>).get(crud::list::<Income>))
        .route(
            "/income/{id}",
            get(crud::get::<Income>)
                .put(crud::update::<Income, UpdateIncome>)
                .delete(guarded::delete_income),
        )
        .route(
            "/income_product",
            post(guarded::create_income_product).get(crud::list::<IncomeProduct>),
        )
        .route(
            "/income_product/{id}",
            get(crud::get::<IncomeProduct>).delete(guarded::delete_income_product),
        )
        .route("/doincome/{coming_id}", post(workflows::post_income))
        // Shifts and registers
        .route("/shift", post(guarded::create_shift).get(crud::list::<Shift>))
        .route("/shift/{id}", get(crud::get::<Shift>).delete(crud::delete::<Shift>))
        .route("/shift_table/{id}", put(workflows::set_shift_method))
        .route("/transaction", get(crud::list::<Transaction>))
        .route("/transaction/{id}", get(crud::get::<Transaction>))
        // Sales
        .route("/sale", post(guarded::create_sale).get(crud::list::<Sale>))
        .route("/sale/scan-barcode", get(workflows::scan_barcode))
        .route("/sale/{id}", get(crud::get::<Sale>).delete(guarded::delete_sale))
        .route("/sale_products", get(crud::list::<SaleProduct>))
        .route(
            "/sale_products/{id}",
            get(crud::get::<SaleProduct>)
                .put(guarded::update_sale_product)
                .delete(guarded::delete_sale_product),
        )
        .route("/payment", post(guarded::create_payment).get(crud::list::<Payment>))
        .route("/payment/{id}", get(crud::get::<Payment>).delete(guarded::delete_payment))
        .route("/dosale", get(workflows::finalize_sale))
        // Users
        .route("/user", post(users::create).get(users::list))
        .route("/user/{id}", get(users::get).put(users::update).delete(users::delete))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// Turns a raw query string into list parameters for `E`.
///
/// `limit`, `offset` and `search` are reserved; any other key that names one
/// of `E`'s filter columns becomes an equality filter, and the rest are
/// ignored. Limits above the maximum are capped.
pub fn list_params<E: Record>(query: &str) -> ApiResult<ListParams> {
    let mut params = ListParams::default();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match &*key {
            "limit" if !value.is_empty() => {
                let limit: i64 = value.parse().map_err(|_| invalid_query("limit"))?;
                params.limit = limit.min(MAX_LIST_LIMIT);
            }
            "offset" if !value.is_empty() => {
                params.offset = value.parse().map_err(|_| invalid_query("offset"))?;
            }
            "search" => params.search = Some(value.into_owned()),
            "limit" | "offset" => {}
            other => match Filter::from_query::<E>(other, &value) {
                Some(filter) => params.filters.push(filter?),
                None => debug!(entity = E::ENTITY, key = %other, "Ignoring unknown query parameter"),
            },
        }
    }

    Ok(params)
}

fn invalid_query(field: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be an integer".to_string(),
    }
}
