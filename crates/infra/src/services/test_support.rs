//! Fixtures shared by the service tests.

use chrono::Utc;

use gadgetbazar_auth::{Issuer, User, VerifiedIdentity};
use gadgetbazar_catalog::{NewProduct, Product, Variation};
use gadgetbazar_core::ProductId;
use gadgetbazar_orders::{OrderItem, PaymentMethod, PlaceOrder};

use crate::store::{InMemoryStore, Store};

fn identity(uid: &str, issuer: Issuer) -> VerifiedIdentity {
    VerifiedIdentity {
        uid: uid.to_string(),
        email: format!("{uid}@example.com"),
        name: Some(format!("Customer {uid}")),
        issuer,
    }
}

pub async fn customer(store: &InMemoryStore, uid: &str) -> User {
    store
        .upsert_user_from_identity(&identity(uid, Issuer::Customer), Utc::now())
        .await
        .unwrap()
}

pub async fn admin(store: &InMemoryStore, uid: &str) -> User {
    store
        .upsert_user_from_identity(&identity(uid, Issuer::Admin), Utc::now())
        .await
        .unwrap()
}

pub async fn simple_product(store: &InMemoryStore, name: &str, price: u64, stock: u32) -> Product {
    insert(store, name, price, stock, vec![]).await
}

pub async fn variation_product(
    store: &InMemoryStore,
    name: &str,
    price: u64,
    variations: Vec<Variation>,
) -> Product {
    insert(store, name, price, 0, variations).await
}

async fn insert(
    store: &InMemoryStore,
    name: &str,
    price: u64,
    stock: u32,
    variations: Vec<Variation>,
) -> Product {
    let product = Product::create(
        ProductId::new(),
        NewProduct {
            name: name.to_string(),
            brand: None,
            description: None,
            price,
            original_price: None,
            stock_quantity: stock,
            variations,
        },
        Utc::now(),
    )
    .unwrap();
    store.insert_product(&product).await.unwrap();
    product
}

pub fn item(product_id: ProductId, quantity: u32) -> OrderItem {
    OrderItem {
        product_id,
        variation: None,
        quantity,
    }
}

pub fn place(items: Vec<OrderItem>) -> PlaceOrder {
    PlaceOrder {
        items,
        shipping_address: "House 12, Road 4, Dhanmondi, Dhaka".to_string(),
        phone: "01711000000".to_string(),
        payment_method: PaymentMethod::CashOnDelivery,
        payment_details: None,
    }
}
