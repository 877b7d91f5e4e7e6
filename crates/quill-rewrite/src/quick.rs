use std::cmp::Ordering;

use quill_core::Value;

use crate::eval::Evaluate;

/// `PatternTest` predicates decided natively instead of through the
/// evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickTest {
    AtomQ,
    StringQ,
    NumberQ,
    NumericQ,
    IntegerQ,
    EvenQ,
    OddQ,
    RealValuedNumberQ,
    Positive,
    Negative,
    NonPositive,
    NonNegative,
    NegativePowerQ,
    NotNegativePowerQ,
}

const TABLE: &[(&str, QuickTest)] = &[
    ("AtomQ", QuickTest::AtomQ),
    ("StringQ", QuickTest::StringQ),
    ("NumberQ", QuickTest::NumberQ),
    ("NumericQ", QuickTest::NumericQ),
    ("IntegerQ", QuickTest::IntegerQ),
    ("EvenQ", QuickTest::EvenQ),
    ("OddQ", QuickTest::OddQ),
    ("RealValuedNumberQ", QuickTest::RealValuedNumberQ),
    ("Positive", QuickTest::Positive),
    ("Negative", QuickTest::Negative),
    ("NonPositive", QuickTest::NonPositive),
    ("NonNegative", QuickTest::NonNegative),
    ("NegativePowerQ", QuickTest::NegativePowerQ),
    ("NotNegativePowerQ", QuickTest::NotNegativePowerQ),
];

impl QuickTest {
    pub fn lookup(test: &Value) -> Option<QuickTest> {
        let name = test.as_symbol()?;
        TABLE.iter().find(|(n, _)| *n == name).map(|(_, q)| *q)
    }

    pub fn check(self, v: &Value, ev: &dyn Evaluate) -> bool {
        match self {
            QuickTest::AtomQ => v.is_atom(),
            QuickTest::StringQ => matches!(v, Value::String(_)),
            QuickTest::NumberQ => v.is_number(),
            QuickTest::NumericQ => ev.is_numeric(v),
            QuickTest::IntegerQ => matches!(v, Value::Integer(_)),
            QuickTest::EvenQ => matches!(v, Value::Integer(n) if n % 2 == 0),
            QuickTest::OddQ => matches!(v, Value::Integer(n) if n % 2 != 0),
            QuickTest::RealValuedNumberQ => match v {
                Value::Real(f) => !f.is_nan(),
                other => other.is_number(),
            },
            QuickTest::Positive => v.sign() == Some(Ordering::Greater),
            QuickTest::Negative => v.sign() == Some(Ordering::Less),
            QuickTest::NonPositive => matches!(v.sign(), Some(Ordering::Less | Ordering::Equal)),
            QuickTest::NonNegative => matches!(v.sign(), Some(Ordering::Greater | Ordering::Equal)),
            QuickTest::NegativePowerQ => negative_power(v),
            QuickTest::NotNegativePowerQ => !negative_power(v),
        }
    }
}

/// `Power[_, e]` with a negative numeric exponent.
fn negative_power(v: &Value) -> bool {
    v.has_form("Power", 2) && v.args()[1].sign() == Some(Ordering::Less)
}
