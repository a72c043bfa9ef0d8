use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::models::{Order, Product};

/// Tenant owning the hardware catalogue.
pub const ACME: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_00000000ac3e);

/// Tenant owning the office catalogue.
pub const GLOBEX: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000006106e7);

/// Generates a demo catalogue spread across [`ACME`], [`GLOBEX`] and no tenant.
///
/// Rows are committed as-is, so they carry their own audit stamps. One product
/// per tenant is inactive and one is soft-deleted, which makes the read
/// options visible in the output.
pub fn generate_mock_products() -> Vec<Product> {
    let created = Utc::now() - Duration::days(30);

    let mut products = vec![
        Product::new("Claw Hammer", 24.5).with_category("tools").with_tenant(ACME),
        Product::new("Anvil", 310.0).with_category("tools").with_tenant(ACME),
        Product::new("Rocket Skates", 129.99).with_category("gadgets").with_tenant(ACME),
        Product::new("Giant Magnet", 75.0).with_category("gadgets").with_tenant(ACME),
        Product::new("Dehydrated Boulders", 12.0).with_category("supplies").with_tenant(ACME),
        Product::new("Stapler", 9.9).with_category("office").with_tenant(GLOBEX),
        Product::new("Desk Lamp", 34.0).with_category("office").with_tenant(GLOBEX),
        Product::new("Ergonomic Chair", 289.0).with_category("furniture").with_tenant(GLOBEX),
        Product::new("Whiteboard", 59.0).with_category("office").with_tenant(GLOBEX),
        Product::new("Gift Card", 25.0).with_category("misc"),
    ];

    for (day, product) in products.iter_mut().enumerate() {
        let at = created + Duration::days(day as i64);
        product.is_active = true;
        product.created_at = Some(at);
        product.updated_at = Some(at);
    }

    // Retired and deleted rows
    products[3].is_active = false;
    products[4].is_deleted = true;
    products[8].is_active = false;

    products
}

/// Generates one order per tenant referencing that tenant's products.
pub fn generate_mock_orders(products: &[Product]) -> Vec<Order> {
    [(ACME, "SO-1001", "Wile E. Coyote"), (GLOBEX, "SO-2001", "Hank Scorpio")]
        .into_iter()
        .map(|(tenant_id, number, customer)| {
            products
                .iter()
                .filter(|p| p.tenant_id == Some(tenant_id) && p.is_active && !p.is_deleted)
                .take(2)
                .fold(
                    Order::new(number, customer).with_tenant(tenant_id),
                    |order, product| order.with_line(product.id, 2, product.price),
                )
        })
        .collect()
}
