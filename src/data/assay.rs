use serde::Serialize;

use crate::data::curve::Curve;
use crate::data::curve_error::CurveError;

/// A bioassay: one dose-response [`Curve`] per molecule
///
/// Curve identifiers are unique within an assay, so they double as the key
/// the fit orchestrator uses to track work in flight.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Assay {
    id: String,
    curves: Vec<Curve>,
}

impl Assay {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            curves: Vec::new(),
        }
    }

    /// Build an assay from curves, rejecting repeated identifiers
    pub fn from_curves(id: impl Into<String>, curves: Vec<Curve>) -> Result<Self, CurveError> {
        let mut assay = Self::new(id);
        for curve in curves {
            assay.add_curve(curve)?;
        }
        Ok(assay)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Add a curve, keeping insertion order
    pub fn add_curve(&mut self, curve: Curve) -> Result<(), CurveError> {
        if self.get_curve(curve.id()).is_some() {
            return Err(CurveError::DuplicateId {
                id: curve.id().to_string(),
            });
        }
        self.curves.push(curve);
        Ok(())
    }

    pub fn get_curve(&self, id: &str) -> Option<&Curve> {
        self.curves.iter().find(|curve| curve.id() == id)
    }

    pub fn curves(&self) -> &[Curve] {
        &self.curves
    }

    pub fn ids(&self) -> Vec<&str> {
        self.curves.iter().map(Curve::id).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Curve> {
        self.curves.iter()
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

impl<'a> IntoIterator for &'a Assay {
    type Item = &'a Curve;
    type IntoIter = std::slice::Iter<'a, Curve>;

    fn into_iter(self) -> Self::IntoIter {
        self.curves.iter()
    }
}

impl IntoIterator for Assay {
    type Item = Curve;
    type IntoIter = std::vec::IntoIter<Curve>;

    fn into_iter(self) -> Self::IntoIter {
        self.curves.into_iter()
    }
}
