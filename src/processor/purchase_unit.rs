use rust_decimal::Decimal;

use super::entities::{Amount, AmountBreakdown, Item, ItemCategory, Money, PurchaseUnit};
use crate::models::{LineItem, Order};

/// Derives the processor purchase unit from the order as it stands now.
///
/// When the order total differs from its line items (shipping, fees or
/// coupons) the breakdown carries the gap so the unit still balances.
pub fn purchase_unit_from_order(order: &Order) -> PurchaseUnit {
    let currency = order.currency.as_str();
    let item_total = order.items_total();
    let gap = order.total - item_total;

    let breakdown = AmountBreakdown {
        item_total: Some(Money::new(currency, item_total)),
        shipping: (gap > Decimal::ZERO).then(|| Money::new(currency, gap)),
        discount: (gap < Decimal::ZERO).then(|| Money::new(currency, -gap)),
    };
    let total = Money::new(currency, order.total);

    PurchaseUnit {
        reference_id: order.id.to_string(),
        custom_id: order.subscription_id.map(|id| id.to_string()),
        amount: Amount {
            currency_code: total.currency_code,
            value: total.value,
            breakdown: Some(breakdown),
        },
        items: order
            .items
            .iter()
            .map(|line| item_from_line(currency, line))
            .collect(),
    }
}

fn item_from_line(currency: &str, line: &LineItem) -> Item {
    Item {
        name: line.name.clone(),
        unit_amount: Money::new(currency, line.unit_price),
        quantity: line.quantity.to_string(),
        category: if line.is_physical {
            ItemCategory::PhysicalGoods
        } else {
            ItemCategory::DigitalGoods
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BillingContact, NewOrder, OrderId, ProductId};
    use rust_decimal_macros::dec;

    fn order(total: Decimal) -> Order {
        NewOrder::new(
            "mxn",
            vec![
                LineItem::new(ProductId(1), "Cafetera", 1, dec!(800)),
                LineItem::new(ProductId(2), "Manual PDF", 2, dec!(50)).digital(),
            ],
            BillingContact::default(),
        )
        .with_total(total)
        .into_order(OrderId(31))
    }

    #[test]
    fn unit_mirrors_order_lines() {
        let unit = purchase_unit_from_order(&order(dec!(900)));

        assert_eq!(unit.reference_id, "31");
        assert_eq!(unit.amount.value, "900.00");
        assert_eq!(unit.amount.currency_code, "MXN");
        assert_eq!(unit.items.len(), 2);
        assert_eq!(unit.items[1].quantity, "2");
        assert_eq!(unit.items[1].category, ItemCategory::DigitalGoods);
        let breakdown = unit.amount.breakdown.unwrap();
        assert!(breakdown.shipping.is_none());
        assert!(breakdown.discount.is_none());
    }

    #[test]
    fn total_gap_is_carried_in_breakdown() {
        let with_shipping = purchase_unit_from_order(&order(dec!(999.90)));
        let breakdown = with_shipping.amount.breakdown.unwrap();
        assert_eq!(breakdown.shipping.unwrap().value, "99.90");

        let discounted = purchase_unit_from_order(&order(dec!(850)));
        let breakdown = discounted.amount.breakdown.unwrap();
        assert_eq!(breakdown.discount.unwrap().value, "50.00");
    }
}
