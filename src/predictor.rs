use crate::error::PredictError;
use crate::features::AssembledFeatureRow;
use crate::types::PredictionResult;

/// What the service needs from a trained binary model.
pub trait Classifier {
    /// `[p(on-time), p(delayed)]`
    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], PredictError>;

    /// 1 = delayed, 0 = on-time
    fn predict(&self, row: &[f64]) -> Result<u8, PredictError>;
}

/// Runs both classifier operations on the single assembled row.
pub fn predict<C: Classifier + ?Sized>(
    clf: &C,
    row: &AssembledFeatureRow,
) -> Result<PredictionResult, PredictError> {
    let x = row.to_model_input();
    let label = clf.predict(&x)?;
    let [_, p_delayed] = clf.predict_proba(&x)?;
    Ok(PredictionResult {
        delayed: label == 1,
        probability: p_delayed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Feature;

    /// Probability equals the first feature, clamped.
    struct Echo;

    impl Classifier for Echo {
        fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], PredictError> {
            let p = row.first().copied().unwrap_or(0.0).clamp(0.0, 1.0);
            Ok([1.0 - p, p])
        }

        fn predict(&self, row: &[f64]) -> Result<u8, PredictError> {
            let [p0, p1] = self.predict_proba(row)?;
            Ok(u8::from(p1 > p0))
        }
    }

    fn row(v: f64) -> AssembledFeatureRow {
        AssembledFeatureRow::new(vec!["x".into()], vec![Feature::Numeric(v)])
    }

    #[test]
    fn label_follows_classifier_decision() {
        let r = predict(&Echo, &row(0.7)).unwrap();
        assert!(r.delayed);
        assert_eq!(r.probability, 0.7);

        let r = predict(&Echo, &row(0.5)).unwrap();
        assert!(!r.delayed, "ties resolve to on-time");
    }

    #[test]
    fn works_through_trait_object() {
        let clf: &dyn Classifier = &Echo;
        let r = predict(clf, &row(0.1)).unwrap();
        assert!(!r.delayed);
    }
}
