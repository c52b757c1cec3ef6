use std::sync::Arc;

use chrono::{Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::{
    errors::ServiceError,
    models::{CheckoutSession, Product, ProductId},
    store::{OrderRepository, ProductCatalog},
};

pub const DEFAULT_BIRTH_DATE_FORMAT: &str = "Y-m-d";
const MINIMUM_AGE_YEARS: i32 = 18;

/// Checkout gates for payment methods restricted by amount, goods type or buyer age.
#[derive(Clone)]
pub struct CheckoutEligibility {
    catalog: Arc<dyn ProductCatalog>,
    orders: Arc<dyn OrderRepository>,
}

impl CheckoutEligibility {
    pub fn new(catalog: Arc<dyn ProductCatalog>, orders: Arc<dyn OrderRepository>) -> Self {
        Self { catalog, orders }
    }

    /// Whether the amount being paid lies in `[minimum, maximum]` and every
    /// purchased product is physical.
    ///
    /// Order-pay requests check the referenced order; other requests check
    /// the cart. Requests with neither are allowed.
    #[instrument(skip(self, session))]
    pub async fn is_amount_allowed(
        &self,
        session: &CheckoutSession,
        minimum: Decimal,
        maximum: Decimal,
    ) -> Result<bool, ServiceError> {
        let (total, products): (Decimal, Vec<ProductId>) = match session.order_pay_target() {
            Some(order_id) => match self.orders.get(order_id).await? {
                Some(order) => (
                    order.total,
                    order.items.iter().map(|line| line.product_id).collect(),
                ),
                None => {
                    debug!(%order_id, "order-pay target not found, nothing to check");
                    return Ok(true);
                }
            },
            None => match &session.cart {
                Some(cart) => (
                    cart.total,
                    cart.items.iter().map(|item| item.product_id).collect(),
                ),
                None => return Ok(true),
            },
        };

        if total < minimum || total > maximum {
            debug!(%total, %minimum, %maximum, "total outside allowed range");
            return Ok(false);
        }

        for product_id in products {
            if let Some(product) = self.catalog.product(product_id).await? {
                if !is_physical_product(&product) {
                    debug!(%product_id, "non-physical product in checkout");
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }
}

/// False for virtual or downloadable products, and for variable products
/// with any virtual or downloadable variation.
pub fn is_physical_product(product: &Product) -> bool {
    if product.is_virtual || product.is_downloadable {
        return false;
    }
    !product
        .variations()
        .iter()
        .any(|variation| variation.is_virtual || variation.is_downloadable)
}

pub fn is_valid_birth_date(date: &str, format: &str) -> bool {
    is_valid_birth_date_at(date, format, Utc::now().date_naive())
}

/// Strictly parses `date` with a PHP-style `format`, requires it to format
/// back to the same text and to be at least 18 years before `today`.
pub fn is_valid_birth_date_at(date: &str, format: &str, today: NaiveDate) -> bool {
    let pattern = chrono_pattern(format);
    let Ok(parsed) = NaiveDate::parse_from_str(date, &pattern) else {
        return false;
    };

    if parsed.format(&pattern).to_string() != date {
        return false;
    }

    adult_on(parsed).map_or(false, |adult_on| adult_on <= today)
}

/// Date of the minimum-age birthday. A 29 February birth date rolls over to
/// 1 March in non-leap years.
fn adult_on(born: NaiveDate) -> Option<NaiveDate> {
    let year = born.year().checked_add(MINIMUM_AGE_YEARS)?;
    NaiveDate::from_ymd_opt(year, born.month(), born.day())
        .or_else(|| {
            NaiveDate::from_ymd_opt(year, born.month(), 1)?.checked_add_months(Months::new(1))
        })
}

/// Translates PHP date tokens into a chrono format string.
fn chrono_pattern(format: &str) -> String {
    let mut pattern = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        let token = match c {
            'Y' => "%Y",
            'y' => "%y",
            'm' => "%m",
            'n' => "%-m",
            'd' => "%d",
            'j' => "%-d",
            'M' => "%b",
            'F' => "%B",
            '\\' => {
                push_literal(&mut pattern, chars.next().unwrap_or('\\'));
                continue;
            }
            other => {
                push_literal(&mut pattern, other);
                continue;
            }
        };
        pattern.push_str(token);
    }

    pattern
}

fn push_literal(pattern: &mut String, c: char) {
    if c == '%' {
        pattern.push_str("%%");
    } else {
        pattern.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BillingContact, Cart, CartItem, LineItem, NewOrder, OrderId, Variation,
    };
    use crate::store::InMemoryStore;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        ymd(2024, 6, 15)
    }

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[rstest]
    #[case("2010-01-01", "Y-m-d", false)]
    #[case("2000-01-01", "Y-m-d", true)]
    #[case("2020-02-30", "Y-m-d", false)]
    #[case("2006-06-15", "Y-m-d", true)]
    #[case("2006-06-16", "Y-m-d", false)]
    #[case("2000-1-01", "Y-m-d", false)]
    #[case("01/02/1990", "d/m/Y", true)]
    #[case("1.2.1990", "j.n.Y", true)]
    #[case("01.02.1990", "j.n.Y", false)]
    #[case("15 March 1985", "d F Y", true)]
    #[case("1985-Mar-15", "Y-M-d", true)]
    #[case("not a date", "Y-m-d", false)]
    #[case("", "Y-m-d", false)]
    fn birth_dates(#[case] date: &str, #[case] format: &str, #[case] expected: bool) {
        assert_eq!(is_valid_birth_date_at(date, format, today()), expected);
    }

    #[rstest]
    #[case("2004-02-29", ymd(2022, 2, 28), false)]
    #[case("2004-02-29", ymd(2022, 3, 1), true)]
    #[case("2000-02-29", ymd(2018, 2, 28), false)]
    #[case("2000-02-29", ymd(2018, 3, 1), true)]
    #[case("2004-02-28", ymd(2022, 2, 28), true)]
    fn leap_day_birthdays_roll_over_to_march(
        #[case] date: &str,
        #[case] on: NaiveDate,
        #[case] expected: bool,
    ) {
        assert_eq!(is_valid_birth_date_at(date, "Y-m-d", on), expected);
    }

    #[test]
    fn escaped_tokens_are_literal() {
        assert_eq!(chrono_pattern("Y\\d m"), "%Yd %m");
        assert_eq!(chrono_pattern("d%m"), "%d%%%m");
        assert!(!is_valid_birth_date_at("1990d 05", "Y\\d m", today()));
    }

    #[test]
    fn physical_product_rules() {
        assert!(is_physical_product(&Product::simple(ProductId(1), "Chair")));
        assert!(!is_physical_product(&Product::simple(ProductId(2), "Gift card").virtual_product()));
        assert!(!is_physical_product(&Product::simple(ProductId(3), "Ebook").downloadable()));

        let mixed = Product::variable(
            ProductId(4),
            "Course",
            vec![
                Variation { id: ProductId(41), is_virtual: false, is_downloadable: false },
                Variation { id: ProductId(42), is_virtual: true, is_downloadable: false },
            ],
        );
        assert!(!is_physical_product(&mixed));

        let boxed = Product::variable(
            ProductId(5),
            "T-shirt",
            vec![Variation { id: ProductId(51), is_virtual: false, is_downloadable: false }],
        );
        assert!(is_physical_product(&boxed));
    }

    fn eligibility() -> (CheckoutEligibility, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        store.add_product(Product::simple(ProductId(1), "Chair"));
        store.add_product(Product::simple(ProductId(2), "Ebook").downloadable());
        (CheckoutEligibility::new(store.clone(), store.clone()), store)
    }

    fn cart(total: Decimal, product: u64) -> CheckoutSession {
        CheckoutSession::with_cart(Cart {
            items: vec![CartItem {
                product_id: ProductId(product),
                variation_id: None,
                quantity: 1,
            }],
            total,
        })
    }

    #[rstest]
    #[case(dec!(50), false)]
    #[case(dec!(100), true)]
    #[case(dec!(300), true)]
    #[case(dec!(500), true)]
    #[case(dec!(600), false)]
    #[tokio::test]
    async fn cart_total_bounds(#[case] total: Decimal, #[case] expected: bool) {
        let (service, _) = eligibility();
        let allowed = service
            .is_amount_allowed(&cart(total, 1), dec!(100), dec!(500))
            .await
            .unwrap();
        assert_eq!(allowed, expected);
    }

    #[tokio::test]
    async fn digital_goods_in_cart_are_rejected() {
        let (service, _) = eligibility();
        assert!(!service
            .is_amount_allowed(&cart(dec!(300), 2), dec!(100), dec!(500))
            .await
            .unwrap());
        // Unknown catalog entries are ignored.
        assert!(service
            .is_amount_allowed(&cart(dec!(300), 99), dec!(100), dec!(500))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn order_pay_checks_the_order_not_the_cart() {
        let (service, store) = eligibility();
        let order = store
            .create(NewOrder::new(
                "EUR",
                vec![LineItem::new(ProductId(1), "Chair", 2, dec!(400))],
                BillingContact::default(),
            ))
            .await
            .unwrap();

        let mut session = cart(dec!(300), 1);
        session.order_pay = Some(order.id);
        assert!(!service
            .is_amount_allowed(&session, dec!(100), dec!(500))
            .await
            .unwrap());

        session.order_pay = Some(OrderId(0));
        assert!(service
            .is_amount_allowed(&session, dec!(100), dec!(500))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn nothing_to_check_is_allowed() {
        let (service, _) = eligibility();
        assert!(service
            .is_amount_allowed(&CheckoutSession::default(), dec!(100), dec!(500))
            .await
            .unwrap());
        assert!(service
            .is_amount_allowed(&CheckoutSession::for_order_pay(OrderId(12345)), dec!(100), dec!(500))
            .await
            .unwrap());
    }
}
