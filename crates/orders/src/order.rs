use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gadgetbazar_catalog::{Product, Reservation, VariationSelector};
use gadgetbazar_core::{DomainError, DomainResult, OrderId, ProductId, UserId};

/// Order status lifecycle.
///
/// Any status may be set by an administrator; there is no enforced ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Customer-facing sentence for a status change notification.
    pub fn customer_message(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Your order is pending confirmation",
            OrderStatus::Processing => "Your order is being processed",
            OrderStatus::Shipped => "Your order has been shipped",
            OrderStatus::Delivered => "Your order has been delivered",
            OrderStatus::Cancelled => "Your order has been cancelled",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| {
                DomainError::validation(
                    "status must be one of: pending, processing, shipped, delivered, cancelled",
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    Bkash,
    Nagad,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
            PaymentMethod::Bkash => "bkash",
            PaymentMethod::Nagad => "nagad",
            PaymentMethod::Card => "card",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash_on_delivery" => Ok(PaymentMethod::CashOnDelivery),
            "bkash" => Ok(PaymentMethod::Bkash),
            "nagad" => Ok(PaymentMethod::Nagad),
            "card" => Ok(PaymentMethod::Card),
            other => Err(DomainError::validation(format!(
                "unsupported payment method: {other}"
            ))),
        }
    }
}

/// Line for a product sold without variations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// Price at time of purchase, in BDT.
    pub unit_price: u64,
}

/// Line for one selected variation of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub variation: VariationSelector,
    pub quantity: u32,
    /// Price at time of purchase, in BDT.
    pub unit_price: u64,
}

/// Order line: either a plain product or a selected variation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderLine {
    Simple(SimpleLine),
    Variation(VariationLine),
}

impl OrderLine {
    /// Resolve a requested item against the current product.
    ///
    /// Read-only: checks availability and freezes the effective unit price and
    /// product name into the line.
    pub fn price(product: &Product, item: &OrderItem) -> DomainResult<Self> {
        if product.id() != item.product_id {
            return Err(DomainError::invariant("product/item id mismatch"));
        }
        product.check_reservation(item.variation.as_ref(), item.quantity)?;
        let unit_price = product.unit_price(item.variation.as_ref())?;

        Ok(match &item.variation {
            Some(selector) => OrderLine::Variation(VariationLine {
                product_id: product.id(),
                product_name: product.name().to_string(),
                variation: selector.clone(),
                quantity: item.quantity,
                unit_price,
            }),
            None => OrderLine::Simple(SimpleLine {
                product_id: product.id(),
                product_name: product.name().to_string(),
                quantity: item.quantity,
                unit_price,
            }),
        })
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            OrderLine::Simple(l) => l.product_id,
            OrderLine::Variation(l) => l.product_id,
        }
    }

    pub fn product_name(&self) -> &str {
        match self {
            OrderLine::Simple(l) => &l.product_name,
            OrderLine::Variation(l) => &l.product_name,
        }
    }

    pub fn quantity(&self) -> u32 {
        match self {
            OrderLine::Simple(l) => l.quantity,
            OrderLine::Variation(l) => l.quantity,
        }
    }

    pub fn unit_price(&self) -> u64 {
        match self {
            OrderLine::Simple(l) => l.unit_price,
            OrderLine::Variation(l) => l.unit_price,
        }
    }

    pub fn selector(&self) -> Option<&VariationSelector> {
        match self {
            OrderLine::Simple(_) => None,
            OrderLine::Variation(l) => Some(&l.variation),
        }
    }

    pub fn line_total(&self) -> DomainResult<u64> {
        self.unit_price()
            .checked_mul(u64::from(self.quantity()))
            .ok_or_else(|| DomainError::validation("line total overflows"))
    }

    /// The stock claim this line makes at commit time.
    pub fn reservation(&self) -> Reservation {
        match self {
            OrderLine::Simple(l) => Reservation {
                product_id: l.product_id,
                selector: None,
                quantity: l.quantity,
            },
            OrderLine::Variation(l) => Reservation {
                product_id: l.product_id,
                selector: Some(l.variation.clone()),
                quantity: l.quantity,
            },
        }
    }
}

/// One requested item as submitted by the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub variation: Option<VariationSelector>,
    pub quantity: u32,
}

/// Order placement request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub items: Vec<OrderItem>,
    pub shipping_address: String,
    pub phone: String,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_details: Option<serde_json::Value>,
}

impl PlaceOrder {
    /// Shape checks that need no catalog access.
    pub fn validate(&self) -> DomainResult<()> {
        if self.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        if let Some(idx) = self.items.iter().position(|i| i.quantity == 0) {
            return Err(DomainError::validation(format!(
                "item {idx}: quantity must be at least 1"
            )));
        }
        if self.shipping_address.trim().is_empty() {
            return Err(DomainError::validation("shippingAddress is required"));
        }
        if self.phone.trim().is_empty() {
            return Err(DomainError::validation("phone is required"));
        }
        if let Some(details) = &self.payment_details {
            if !details.is_object() {
                return Err(DomainError::validation("paymentDetails must be an object"));
            }
        }
        Ok(())
    }

    /// Items with repeated product+variation pairs folded into one, in first-seen order.
    pub fn merged_items(&self) -> DomainResult<Vec<OrderItem>> {
        let mut merged: Vec<OrderItem> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match merged
                .iter_mut()
                .find(|m| m.product_id == item.product_id && m.variation == item.variation)
            {
                Some(existing) => {
                    existing.quantity = existing
                        .quantity
                        .checked_add(item.quantity)
                        .ok_or_else(|| DomainError::validation("quantity overflows"))?;
                }
                None => merged.push(item.clone()),
            }
        }
        Ok(merged)
    }
}

/// Old and new status of an applied status update.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// A placed order. Lines and total are frozen at creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    lines: Vec<OrderLine>,
    total_amount: u64,
    shipping_address: String,
    phone: String,
    payment_method: PaymentMethod,
    payment_details: serde_json::Value,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a new `pending` order from priced lines.
    pub fn place(
        id: OrderId,
        user_id: UserId,
        request: &PlaceOrder,
        lines: Vec<OrderLine>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        request.validate()?;
        if lines.is_empty() {
            return Err(DomainError::validation("order must contain at least one line"));
        }
        let total_amount = total_of(&lines)?;

        Ok(Self {
            id,
            user_id,
            lines,
            total_amount,
            shipping_address: request.shipping_address.trim().to_string(),
            phone: request.phone.trim().to_string(),
            payment_method: request.payment_method,
            payment_details: request
                .payment_details
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild from storage; the stored total must match the stored lines.
    #[allow(clippy::too_many_arguments)]
    pub fn rehydrate(
        id: OrderId,
        user_id: UserId,
        lines: Vec<OrderLine>,
        total_amount: u64,
        shipping_address: String,
        phone: String,
        payment_method: PaymentMethod,
        payment_details: serde_json::Value,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if total_of(&lines)? != total_amount {
            return Err(DomainError::invariant(format!(
                "order {id} total does not match its lines"
            )));
        }
        Ok(Self {
            id,
            user_id,
            lines,
            total_amount,
            shipping_address,
            phone,
            payment_method,
            payment_details,
            status,
            created_at,
            updated_at,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_details(&self) -> &serde_json::Value {
        &self.payment_details
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn reservations(&self) -> Vec<Reservation> {
        self.lines.iter().map(OrderLine::reservation).collect()
    }

    /// Set a new status. Returns `None` when the status is unchanged.
    pub fn set_status(&mut self, status: OrderStatus, now: DateTime<Utc>) -> Option<StatusChange> {
        if self.status == status {
            return None;
        }
        let change = StatusChange {
            from: self.status,
            to: status,
        };
        self.status = status;
        self.updated_at = now;
        Some(change)
    }
}

fn total_of(lines: &[OrderLine]) -> DomainResult<u64> {
    lines.iter().try_fold(0u64, |acc, line| {
        acc.checked_add(line.line_total()?)
            .ok_or_else(|| DomainError::validation("order total overflows"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadgetbazar_catalog::{NewProduct, Variation};

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn product(name: &str, price: u64, stock: u32) -> Product {
        Product::create(
            ProductId::new(),
            NewProduct {
                name: name.to_string(),
                brand: None,
                description: None,
                price,
                original_price: None,
                stock_quantity: stock,
                variations: vec![],
            },
            test_time(),
        )
        .unwrap()
    }

    fn request(items: Vec<OrderItem>) -> PlaceOrder {
        PlaceOrder {
            items,
            shipping_address: "House 12, Road 5, Dhanmondi, Dhaka".to_string(),
            phone: "01700000000".to_string(),
            payment_method: PaymentMethod::CashOnDelivery,
            payment_details: None,
        }
    }

    fn item(product: &Product, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: product.id(),
            variation: None,
            quantity,
        }
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        let p1 = product("Earbuds", 1000, 5);
        let p2 = product("Cable", 500, 5);
        let req = request(vec![item(&p1, 1), item(&p2, 2)]);
        let lines = vec![
            OrderLine::price(&p1, &req.items[0]).unwrap(),
            OrderLine::price(&p2, &req.items[1]).unwrap(),
        ];

        let order = Order::place(OrderId::new(), UserId::new(), &req, lines, test_time()).unwrap();
        assert_eq!(order.total_amount(), 2000);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_details(), &serde_json::json!({}));
    }

    #[test]
    fn price_snapshot_is_independent_of_later_product_changes() {
        let mut p = product("Smartwatch", 3000, 2);
        let req = request(vec![item(&p, 1)]);
        let line = OrderLine::price(&p, &req.items[0]).unwrap();
        let order = Order::place(OrderId::new(), UserId::new(), &req, vec![line], test_time()).unwrap();

        p.change_price(2500, test_time()).unwrap();

        assert_eq!(order.total_amount(), 3000);
        assert_eq!(order.lines()[0].unit_price(), 3000);
    }

    #[test]
    fn price_uses_variation_override_and_builds_variation_line() {
        let sel = VariationSelector::color("Silver");
        let p = Product::create(
            ProductId::new(),
            NewProduct {
                name: "Tab S9".to_string(),
                brand: None,
                description: None,
                price: 80_000,
                original_price: None,
                stock_quantity: 0,
                variations: vec![Variation::new(sel.clone(), 3).priced(82_000)],
            },
            test_time(),
        )
        .unwrap();
        let it = OrderItem {
            product_id: p.id(),
            variation: Some(sel.clone()),
            quantity: 2,
        };

        let line = OrderLine::price(&p, &it).unwrap();
        assert!(matches!(&line, OrderLine::Variation(l) if l.variation == sel));
        assert_eq!(line.unit_price(), 82_000);
        assert_eq!(line.line_total().unwrap(), 164_000);
        assert_eq!(line.reservation().selector, Some(sel));
    }

    #[test]
    fn price_rejects_insufficient_stock() {
        let p = product("Power Bank", 2500, 1);
        let err = OrderLine::price(&p, &item(&p, 2)).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
    }

    #[test]
    fn validate_rejects_empty_items_and_blank_fields() {
        assert!(matches!(request(vec![]).validate(), Err(DomainError::Validation(_))));

        let p = product("Mouse", 700, 1);
        let mut req = request(vec![item(&p, 1)]);
        req.phone = " ".to_string();
        assert!(matches!(req.validate(), Err(DomainError::Validation(msg)) if msg.contains("phone")));

        let mut req = request(vec![item(&p, 0)]);
        assert!(req.validate().is_err());
        req.items[0].quantity = 1;
        req.payment_details = Some(serde_json::json!("txn-123"));
        assert!(req.validate().is_err());
    }

    #[test]
    fn merged_items_fold_duplicates() {
        let p = product("Keyboard", 2000, 10);
        let q = product("Mouse", 700, 10);
        let req = request(vec![item(&p, 1), item(&q, 1), item(&p, 2)]);
        let merged = req.merged_items().unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].product_id, p.id());
        assert_eq!(merged[0].quantity, 3);
    }

    #[test]
    fn set_status_reports_only_real_changes() {
        let p = product("Monitor", 20_000, 1);
        let req = request(vec![item(&p, 1)]);
        let line = OrderLine::price(&p, &req.items[0]).unwrap();
        let mut order = Order::place(OrderId::new(), UserId::new(), &req, vec![line], test_time()).unwrap();

        assert_eq!(order.set_status(OrderStatus::Pending, test_time()), None);
        let change = order.set_status(OrderStatus::Shipped, test_time()).unwrap();
        assert_eq!(change.from, OrderStatus::Pending);
        assert_eq!(change.to, OrderStatus::Shipped);
        assert_eq!(order.status(), OrderStatus::Shipped);
    }

    #[test]
    fn rehydrate_rejects_tampered_total() {
        let p = product("Speaker", 4000, 1);
        let req = request(vec![item(&p, 1)]);
        let line = OrderLine::price(&p, &req.items[0]).unwrap();
        let err = Order::rehydrate(
            OrderId::new(),
            UserId::new(),
            vec![line],
            1,
            req.shipping_address.clone(),
            req.phone.clone(),
            req.payment_method,
            serde_json::json!({}),
            OrderStatus::Pending,
            test_time(),
            test_time(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn line_serializes_with_type_tag() {
        let p = product("Router", 3500, 1);
        let line = OrderLine::price(&p, &item(&p, 1)).unwrap();
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["type"], "simple");
        assert_eq!(json["unitPrice"], 3500);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: total equals Σ unit_price × quantity for any basket.
            #[test]
            fn total_matches_lines(
                basket in proptest::collection::vec((1u64..100_000, 1u32..10), 1..8)
            ) {
                let products: Vec<Product> = basket
                    .iter()
                    .map(|(price, qty)| product("Gadget", *price, *qty))
                    .collect();
                let req = request(
                    products
                        .iter()
                        .zip(&basket)
                        .map(|(p, (_, qty))| item(p, *qty))
                        .collect(),
                );
                let lines: Vec<OrderLine> = products
                    .iter()
                    .zip(&req.items)
                    .map(|(p, it)| OrderLine::price(p, it).unwrap())
                    .collect();
                let expected: u64 = basket.iter().map(|(price, qty)| price * u64::from(*qty)).sum();

                let order = Order::place(OrderId::new(), UserId::new(), &req, lines, test_time()).unwrap();
                prop_assert_eq!(order.total_amount(), expected);
            }
        }
    }
}
