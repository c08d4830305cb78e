use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use catalog_cell::MedicalService;

use crate::models::{PackageDiscount, PriceDetail};

/// Share of the price waived for insured patients, applied last.
pub const INSURANCE_DISCOUNT_RATE: Decimal = dec!(0.20);

/// Share of the summed service prices waived when booking a package.
pub const PACKAGE_DISCOUNT_RATE: Decimal = dec!(0.15);

/// Money is kept to cents.
const MONEY_SCALE: u32 = 2;

fn discount(amount: Decimal, rate: Decimal) -> Decimal {
    (amount * rate).round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn insurance_discount(amount: Decimal, has_insurance: bool) -> Decimal {
    if has_insurance {
        discount(amount, INSURANCE_DISCOUNT_RATE)
    } else {
        Decimal::ZERO
    }
}

pub fn price_service(price: Decimal, has_insurance: bool) -> PriceDetail {
    let insurance_discount = insurance_discount(price, has_insurance);

    PriceDetail::Service {
        gross_amount: price,
        insurance_discount,
        net_amount: price - insurance_discount,
    }
}

/// Prices a bundle: the package discount comes off the summed prices first,
/// then insurance comes off what remains. An empty bundle costs nothing.
pub fn price_package(services: &[MedicalService], has_insurance: bool) -> PriceDetail {
    let gross_amount: Decimal = services.iter().map(|service| service.price).sum();

    let package_discount = discount(gross_amount, PACKAGE_DISCOUNT_RATE);
    let price_after_discount = gross_amount - package_discount;
    let insurance_discount = insurance_discount(price_after_discount, has_insurance);

    PriceDetail::Package {
        gross_amount,
        package_discount: PackageDiscount {
            amount: package_discount,
            price_after_discount,
            insurance_discount,
        },
        net_amount: price_after_discount - insurance_discount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn service(price: Decimal) -> MedicalService {
        MedicalService {
            id: Uuid::new_v4(),
            name: "Service".to_string(),
            description: None,
            price,
        }
    }

    #[test]
    fn test_service_without_insurance_is_full_price() {
        let detail = price_service(dec!(100), false);
        assert_eq!(detail.net_amount(), dec!(100));
        assert_eq!(detail.gross_amount(), dec!(100));
    }

    #[test]
    fn test_service_with_insurance_takes_twenty_percent_off() {
        let detail = price_service(dec!(100), true);
        assert_eq!(
            detail,
            PriceDetail::Service {
                gross_amount: dec!(100),
                insurance_discount: dec!(20),
                net_amount: dec!(80),
            }
        );
    }

    #[test]
    fn test_package_with_insurance_applies_both_discounts_in_order() {
        let detail = price_package(&[service(dec!(100)), service(dec!(50))], true);

        assert_eq!(
            detail,
            PriceDetail::Package {
                gross_amount: dec!(150),
                package_discount: PackageDiscount {
                    amount: dec!(22.5),
                    price_after_discount: dec!(127.5),
                    insurance_discount: dec!(25.5),
                },
                net_amount: dec!(102),
            }
        );
    }

    #[test]
    fn test_package_without_insurance() {
        let detail = price_package(&[service(dec!(100)), service(dec!(50))], false);
        assert_eq!(detail.net_amount(), dec!(127.5));
    }

    #[test]
    fn test_empty_package_is_free() {
        for has_insurance in [false, true] {
            let detail = price_package(&[], has_insurance);
            assert_eq!(detail.net_amount(), Decimal::ZERO);
            assert_eq!(detail.gross_amount(), Decimal::ZERO);
        }
    }

    #[test]
    fn test_net_matches_rate_identities_at_realistic_prices() {
        for price in [dec!(0), dec!(35), dec!(49.90), dec!(120), dec!(1250)] {
            assert_eq!(price_service(price, false).net_amount(), price);
            assert_eq!(price_service(price, true).net_amount(), price * dec!(0.8));
        }

        let services = [service(dec!(80)), service(dec!(40)), service(dec!(120))];
        assert_eq!(price_package(&services, false).net_amount(), dec!(240) * dec!(0.85));
        assert_eq!(price_package(&services, true).net_amount(), dec!(240) * dec!(0.85) * dec!(0.8));
    }

    #[test]
    fn test_discounts_round_to_cents() {
        // 33.33 * 0.20 = 6.666
        let detail = price_service(dec!(33.33), true);
        assert_eq!(
            detail,
            PriceDetail::Service {
                gross_amount: dec!(33.33),
                insurance_discount: dec!(6.67),
                net_amount: dec!(26.66),
            }
        );
    }
}
