// src/services/commission.rs
//
// Tabelas de preço e comissão. Funções puras: mesma entrada, mesma saída.
// As três tabelas são independentes entre si.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::models::pricing::SeatQuote;

/// Taxa de quem não é parceiro recorrente, e de todo primeiro pagamento.
pub const FIRST_PURCHASE_RATE: Decimal = dec!(10);
/// Renovações de parceiros recorrentes.
pub const RENEWAL_RATE: Decimal = dec!(5);

pub const VOLUME_BONUS_THRESHOLD: i64 = 100;
pub const BASE_VOLUME_RATE: Decimal = dec!(10);
pub const BONUS_VOLUME_RATE: Decimal = dec!(15);

/// Duas casas, meio para cima.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Percentual aplicado a `amount` e o valor da taxa, arredondado.
pub fn percentage_of(amount: Decimal, percentage: Decimal) -> Decimal {
    round_money(amount * percentage / dec!(100))
}

/// Finder fee de uma compra: `(fee_percentage, fee_amount)`.
pub fn compute_fee(
    amount: Decimal,
    is_recurring_partner: bool,
    is_first_purchase: bool,
) -> (Decimal, Decimal) {
    let percentage = if is_recurring_partner && !is_first_purchase {
        RENEWAL_RATE
    } else {
        FIRST_PURCHASE_RATE
    };
    (percentage, percentage_of(amount, percentage))
}

/// Desconto por assento sobre o preço de tabela.
pub fn seat_discount_percentage(seat_count: i32) -> Decimal {
    match seat_count {
        ..=11 => dec!(0),
        12..=119 => dec!(10),
        120..=199 => dec!(15),
        _ => dec!(20),
    }
}

/// Taxa do parceiro pelo total de assentos indicados.
///
/// A taxa vale para o montante inteiro (flat), não por faixa: quem passa de
/// 100 assentos recebe 15% sobre tudo. Se o negócio quiser a versão marginal,
/// é aqui que muda.
pub fn partner_volume_rate(total_referred_seats: i64) -> Decimal {
    if total_referred_seats > VOLUME_BONUS_THRESHOLD {
        BONUS_VOLUME_RATE
    } else {
        BASE_VOLUME_RATE
    }
}

pub fn quote(seat_count: i32, list_price_per_seat: Decimal) -> SeatQuote {
    let discount_percentage = seat_discount_percentage(seat_count);
    let price_per_seat =
        round_money(list_price_per_seat * (dec!(100) - discount_percentage) / dec!(100));

    SeatQuote {
        seat_count,
        list_price_per_seat,
        discount_percentage,
        price_per_seat,
        total: round_money(price_per_seat * Decimal::from(seat_count)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_recurring_partner_always_earns_ten_percent() {
        assert_eq!(compute_fee(dec!(1200.00), false, true), (dec!(10), dec!(120.00)));
        assert_eq!(compute_fee(dec!(1200.00), false, false), (dec!(10), dec!(120.00)));
    }

    #[test]
    fn recurring_partner_drops_to_five_percent_on_renewals() {
        assert_eq!(compute_fee(dec!(1200.00), true, true), (dec!(10), dec!(120.00)));
        assert_eq!(compute_fee(dec!(1200.00), true, false), (dec!(5), dec!(60.00)));
    }

    #[test]
    fn fee_amount_rounds_half_up_to_cents() {
        // 10% de 0.05 = 0.005 -> 0.01
        assert_eq!(compute_fee(dec!(0.05), false, true).1, dec!(0.01));
        // 5% de 10.10 = 0.505 -> 0.51
        assert_eq!(compute_fee(dec!(10.10), true, false).1, dec!(0.51));
        // 10% de 99.99 = 9.999 -> 10.00
        assert_eq!(compute_fee(dec!(99.99), false, true).1, dec!(10.00));
    }

    #[test]
    fn fee_is_deterministic() {
        let first = compute_fee(dec!(873.45), true, false);
        for _ in 0..10 {
            assert_eq!(compute_fee(dec!(873.45), true, false), first);
        }
    }

    #[test]
    fn seat_discount_tiers_at_their_edges() {
        let cases = [
            (1, dec!(0)),
            (11, dec!(0)),
            (12, dec!(10)),
            (119, dec!(10)),
            (120, dec!(15)),
            (199, dec!(15)),
            (200, dec!(20)),
            (500, dec!(20)),
        ];
        for (seats, expected) in cases {
            assert_eq!(seat_discount_percentage(seats), expected, "{seats} assentos");
        }
    }

    #[test]
    fn volume_rate_is_flat_above_one_hundred_seats() {
        assert_eq!(partner_volume_rate(0), dec!(10));
        assert_eq!(partner_volume_rate(100), dec!(10));
        assert_eq!(partner_volume_rate(101), dec!(15));
        assert_eq!(partner_volume_rate(5_000), dec!(15));
    }

    #[test]
    fn quote_applies_the_tier_to_the_list_price() {
        let q = quote(120, dec!(10.00));
        assert_eq!(q.discount_percentage, dec!(15));
        assert_eq!(q.price_per_seat, dec!(8.50));
        assert_eq!(q.total, dec!(1020.00));

        let small = quote(5, dec!(10.00));
        assert_eq!(small.price_per_seat, dec!(10.00));
        assert_eq!(small.total, dec!(50.00));
    }
}
