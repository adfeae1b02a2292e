//! Human-readable order numbers: a 3-letter prefix followed by 9 characters
//! from `[A-Z0-9]`. The first 5 suffix characters encode the creation time
//! (base-36 milliseconds, truncated), the remaining 4 are random.

use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

use crate::{
    entity::{Orders, orders::Column as OrderCol},
    error::{AppError, AppResult},
};

pub const ORDER_NUMBER_LEN: usize = 12;
pub const MAX_ATTEMPTS: usize = 10;

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const TIME_CHARS: usize = 5;
const RANDOM_CHARS: usize = 4;

/// Build a candidate order number. Pure: all inputs are explicit.
pub fn generate_with<R: Rng + ?Sized>(prefix: &str, now: DateTime<Utc>, rng: &mut R) -> String {
    let mut out = String::with_capacity(ORDER_NUMBER_LEN);
    out.push_str(prefix);

    let mut millis = now.timestamp_millis().unsigned_abs();
    let mut time_part = [b'0'; TIME_CHARS];
    for slot in time_part.iter_mut().rev() {
        *slot = ALPHABET[(millis % 36) as usize];
        millis /= 36;
    }
    out.extend(time_part.iter().map(|&b| b as char));

    for _ in 0..RANDOM_CHARS {
        out.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
    }
    out
}

pub fn generate(prefix: &str) -> String {
    generate_with(prefix, Utc::now(), &mut rand::thread_rng())
}

/// Normalize user input for lookup. Returns `None` when the shape is wrong.
pub fn normalize(input: &str) -> Option<String> {
    let candidate = input.trim().to_ascii_uppercase();
    is_well_formed(&candidate).then_some(candidate)
}

pub fn is_well_formed(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() == ORDER_NUMBER_LEN
        && bytes[..3].iter().all(u8::is_ascii_uppercase)
        && bytes[3..]
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Draw candidates from `next_candidate` until one is not yet used by any order.
///
/// Two concurrent checkouts can both pass the existence check with the same
/// candidate; the unique index on `orders.order_number` rejects the loser.
pub async fn allocate<C, F>(db: &C, mut next_candidate: F) -> AppResult<String>
where
    C: ConnectionTrait,
    F: FnMut() -> String,
{
    for attempt in 1..=MAX_ATTEMPTS {
        let candidate = next_candidate();
        let taken = Orders::find()
            .filter(OrderCol::OrderNumber.eq(candidate.as_str()))
            .count(db)
            .await?
            > 0;
        if !taken {
            return Ok(candidate);
        }
        tracing::warn!(attempt, order_number = %candidate, "order number collision");
    }
    Err(AppError::OrderNumberExhausted(MAX_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn generated_numbers_have_the_public_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..500 {
            let now = Utc.timestamp_millis_opt(1_700_000_000_000 + i * 977).unwrap();
            let number = generate_with("AVO", now, &mut rng);
            assert_eq!(number.len(), ORDER_NUMBER_LEN);
            assert!(number.starts_with("AVO"));
            assert!(is_well_formed(&number), "{number}");
        }
    }

    #[test]
    fn time_part_changes_with_the_clock() {
        let mut a = StdRng::seed_from_u64(1);
        let mut b = StdRng::seed_from_u64(1);
        let t0 = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let t1 = Utc.timestamp_millis_opt(1_700_000_000_001).unwrap();
        let first = generate_with("AVO", t0, &mut a);
        let second = generate_with("AVO", t1, &mut b);
        assert_ne!(first[3..8], second[3..8]);
        assert_eq!(first[8..], second[8..]);
    }

    #[test]
    fn normalize_accepts_lowercase_and_whitespace() {
        assert_eq!(normalize(" avo1a2b3c4d5 "), Some("AVO1A2B3C4D5".to_string()));
        assert_eq!(normalize("AVO1A2B3C4D"), None);
        assert_eq!(normalize("A1O1A2B3C4D5"), None);
        assert_eq!(normalize("AVO1A2B3C4D-"), None);
    }
}
