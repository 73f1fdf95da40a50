//! The fixed set of mass hypotheses a model is trained against.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building a [`MassPoints`] set.
#[derive(Debug, Error, PartialEq)]
pub enum MassPointsError {
    /// No mass points were supplied.
    #[error("At least one mass point is required")]
    Empty,
    /// A mass point was NaN or infinite.
    #[error("Mass point {0} is not finite")]
    NonFinite(f64),
    /// The same mass point was listed twice.
    #[error("Mass point {0} is listed more than once")]
    Duplicate(f64),
}

/// Ordered, non-empty set of distinct training mass points.
///
/// The order is the configuration order and is significant: background
/// inflation emits one block per mass in this order and every loss record
/// holds one value per mass in this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct MassPoints(Vec<f64>);

impl MassPoints {
    pub fn new(masses: Vec<f64>) -> Result<Self, MassPointsError> {
        if masses.is_empty() {
            return Err(MassPointsError::Empty);
        }
        for (idx, &mass) in masses.iter().enumerate() {
            if !mass.is_finite() {
                return Err(MassPointsError::NonFinite(mass));
            }
            if masses[..idx].contains(&mass) {
                return Err(MassPointsError::Duplicate(mass));
            }
        }
        Ok(Self(masses))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    /// Position of `mass` in configuration order.
    pub fn index_of(&self, mass: f64) -> Option<usize> {
        self.0.iter().position(|&m| m == mass)
    }
}

impl TryFrom<Vec<f64>> for MassPoints {
    type Error = MassPointsError;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MassPoints> for Vec<f64> {
    fn from(value: MassPoints) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_configuration_order() {
        let masses = MassPoints::new(vec![1.0, 0.3, 0.5]).unwrap();
        assert_eq!(masses.as_slice(), &[1.0, 0.3, 0.5]);
        assert_eq!(masses.index_of(0.5), Some(2));
        assert_eq!(masses.index_of(0.7), None);
    }

    #[test]
    fn rejects_empty_duplicate_and_nan() {
        assert_eq!(MassPoints::new(vec![]), Err(MassPointsError::Empty));
        assert_eq!(
            MassPoints::new(vec![0.5, 0.5]),
            Err(MassPointsError::Duplicate(0.5))
        );
        assert!(matches!(
            MassPoints::new(vec![f64::NAN]),
            Err(MassPointsError::NonFinite(_))
        ));
    }

    #[test]
    fn deserializes_through_validation() {
        let ok: MassPoints = serde_json::from_str("[0.5, 1.0]").unwrap();
        assert_eq!(ok.len(), 2);
        assert!(serde_json::from_str::<MassPoints>("[]").is_err());
    }
}
