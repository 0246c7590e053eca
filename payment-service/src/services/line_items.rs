use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::error::PaymentError;
use super::peers::{OrderLineService, ProductService};
use crate::models::{LineItem, Product};

/// Resolves an order's product composition into priced line items.
#[derive(Clone)]
pub struct LineItemAggregator {
    order_lines: Arc<dyn OrderLineService>,
    products: Arc<dyn ProductService>,
}

impl LineItemAggregator {
    pub fn new(order_lines: Arc<dyn OrderLineService>, products: Arc<dyn ProductService>) -> Self {
        Self {
            order_lines,
            products,
        }
    }

    /// Priced items for `order_id`, in order-line order.
    ///
    /// Lines whose product is unknown to the product service are dropped. A
    /// line whose amount overflows fails the whole aggregation.
    pub async fn aggregate(&self, order_id: &str) -> Result<Vec<LineItem>, PaymentError> {
        let lines = self.order_lines.find_lines_by_order_id(order_id).await?;

        let mut seen = HashSet::new();
        let product_ids: Vec<String> = lines
            .iter()
            .filter(|line| seen.insert(line.product_id.as_str()))
            .map(|line| line.product_id.clone())
            .collect();

        let products = self.products.find_by_ids(&product_ids).await?;
        let by_id: HashMap<&str, &Product> =
            products.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            match by_id.get(line.product_id.as_str()) {
                Some(product) => {
                    let item = LineItem::try_new(
                        product.id.clone(),
                        product.name.clone(),
                        product.price,
                        line.quantity,
                    )
                    .ok_or_else(|| {
                        PaymentError::Amount(format!(
                            "product {} x {} in order {}",
                            product.id, line.quantity, order_id
                        ))
                    })?;
                    items.push(item);
                }
                None => tracing::warn!(
                    order_id = %order_id,
                    product_id = %line.product_id,
                    "Dropping order line with unknown product"
                ),
            }
        }

        tracing::debug!(
            order_id = %order_id,
            lines = lines.len(),
            items = items.len(),
            "Aggregated line items"
        );

        Ok(items)
    }
}
