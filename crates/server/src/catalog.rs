use shared::{
    domain::{CategoryId, ProductId, SupplierId},
    protocol::{Category, Product, Supplier},
};

/// Fixed, read-only catalog served by the demo backend.
#[derive(Debug, Clone)]
pub(crate) struct CatalogData {
    pub(crate) products: Vec<Product>,
    pub(crate) categories: Vec<Category>,
    pub(crate) suppliers: Vec<Supplier>,
}

impl CatalogData {
    pub(crate) fn supplier(&self, supplier_id: SupplierId) -> Option<&Supplier> {
        self.suppliers
            .iter()
            .find(|supplier| supplier.id == supplier_id)
    }

    pub(crate) fn seeded() -> Self {
        Self {
            products: vec![
                product(1, "Leaf Rake", "GDN-0011", "Leaf rake with 48-inch wooden handle", 19.95, 1, 15, &[1, 2]),
                product(2, "Garden Cart", "GDN-0023", "15 gallon capacity rolling garden cart", 32.99, 1, 2, &[3, 4]),
                product(5, "Hammer", "TBX-0048", "Curved claw steel hammer", 8.9, 3, 8, &[5, 6]),
                product(8, "Saw", "TBX-0022", "15-inch steel blade hand saw", 11.55, 3, 6, &[7, 8]),
                product(10, "Video Game Controller", "GMG-0042", "Standard two-button video game controller", 35.95, 5, 12, &[]),
            ],
            categories: vec![
                category(1, "Garden"),
                category(3, "Toolbox"),
                category(5, "Gaming"),
            ],
            suppliers: vec![
                supplier(1, "Acme Gizmo", 2.0, 24),
                supplier(2, "Acme Gadget", 3.0, 12),
                supplier(3, "Acme General Supply", 4.0, 6),
                supplier(4, "Acme Tool Supply", 3.5, 12),
                supplier(5, "Acme Hardware", 2.5, 50),
                supplier(6, "Acme Wholesale", 1.75, 100),
                supplier(7, "Acme Cutting Tools", 5.0, 10),
                supplier(8, "Acme Blades", 4.25, 20),
            ],
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn product(
    id: i64,
    name: &str,
    code: &str,
    description: &str,
    price: f64,
    category_id: i64,
    quantity_in_stock: i64,
    supplier_ids: &[i64],
) -> Product {
    Product {
        id: ProductId(id),
        product_name: name.to_string(),
        product_code: code.to_string(),
        description: description.to_string(),
        price: Some(price),
        category_id: Some(CategoryId(category_id)),
        category: None,
        supplier_ids: (!supplier_ids.is_empty())
            .then(|| supplier_ids.iter().copied().map(SupplierId).collect()),
        quantity_in_stock,
        search_key: None,
    }
}

fn category(id: i64, name: &str) -> Category {
    Category {
        id: CategoryId(id),
        name: name.to_string(),
    }
}

fn supplier(id: i64, name: &str, cost: f64, min_quantity: u32) -> Supplier {
    Supplier {
        id: SupplierId(id),
        name: name.to_string(),
        cost: Some(cost),
        min_quantity: Some(min_quantity),
    }
}
