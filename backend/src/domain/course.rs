//! Course aggregate and price arithmetic.
//!
//! Course metadata CRUD is out of scope; the domain consumes courses via
//! read-by-id lookups only. Prices are exact decimals; conversion to minor
//! currency units happens here so no caller ever multiplies floats.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::DomainError;

/// A published course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Engine-generated identifier.
    pub id: i64,
    /// Owning teacher's user id.
    pub teacher_id: i64,
    /// Course title.
    pub title: String,
    /// Long-form description.
    pub description: String,
    /// Ordered sequence of content URIs. Stored encoded as a JSON array;
    /// the encoding never leaves the persistence boundary.
    pub content_urls: Vec<String>,
    /// Price in major currency units, non-negative.
    pub price: Decimal,
    /// Optional thumbnail URI.
    pub thumbnail_url: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last-update instant.
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// Price expressed in minor currency units (e.g. cents), rounded half
    /// away from zero on the scaled value.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Integrity`] when the stored price is negative
    /// or too large to express in minor units.
    pub fn price_minor_units(&self) -> Result<i64, DomainError> {
        if self.price.is_sign_negative() {
            return Err(DomainError::integrity(format!(
                "course {} has negative price {}",
                self.id, self.price
            )));
        }
        let scaled = (self.price * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        scaled.to_i64().ok_or_else(|| {
            DomainError::integrity(format!(
                "course {} price {} overflows minor units",
                self.id, self.price
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_decimal_macros::dec;

    use super::*;

    fn course_priced(price: Decimal) -> Course {
        Course {
            id: 7,
            teacher_id: 1,
            title: "Rust".to_owned(),
            description: "Systems programming".to_owned(),
            content_urls: vec!["https://cdn.example/1.mp4".to_owned()],
            price,
            thumbnail_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[rstest]
    #[case(dec!(49.99), 4999)]
    #[case(dec!(0), 0)]
    #[case(dec!(10), 1000)]
    #[case(dec!(0.005), 1)]
    #[case(dec!(19.999), 2000)]
    fn price_converts_to_minor_units(#[case] price: Decimal, #[case] expected: i64) {
        assert_eq!(course_priced(price).price_minor_units(), Ok(expected));
    }

    #[test]
    fn negative_price_is_an_integrity_error() {
        let err = course_priced(dec!(-1)).price_minor_units().unwrap_err();
        assert!(matches!(err, DomainError::Integrity(_)));
    }
}
