use super::Tensor3D;
use crate::error::AppError;
use crate::models::classify_types::Prediction;
use ndarray::Array4;
use std::cmp::Ordering;

/// Turns an HWC `0..=255` image into a normalized `(1, 3, H, W)` batch.
pub fn to_normalized_nchw(image: &Tensor3D, mean: [f32; 3], std: [f32; 3]) -> Result<Array4<f32>, AppError> {
    let (h, w, c) = image.dim();
    if c != 3 {
        return Err(AppError::Classify(format!("expected 3 channels, got {}", c)));
    }

    let hw = h * w;
    let mut data = vec![0f32; 3 * hw];

    // HWC -> CHW in tiles so the source and all three destination planes stay in cache.
    const TILE: usize = 1024;
    let src: Vec<f32> = image.iter().copied().collect();
    for base in (0..hw).step_by(TILE) {
        let end = (base + TILE).min(hw);
        for i in base..end {
            let off = i * 3;
            data[i] = (src[off] / 255.0 - mean[0]) / std[0];
            data[hw + i] = (src[off + 1] / 255.0 - mean[1]) / std[1];
            data[2 * hw + i] = (src[off + 2] / 255.0 - mean[2]) / std[2];
        }
    }

    Array4::from_shape_vec((1, 3, h, w), data)
        .map_err(|e| AppError::Classify(format!("Failed to create tensor: {}", e)))
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp_sum: f32 = logits.iter().map(|&x| (x - max_logit).exp()).sum();
    logits.iter().map(|&x| (x - max_logit).exp() / exp_sum).collect()
}

/// Picks the `top_k` most probable classes. Labels missing from `labels`
/// are named `class_<index>`.
pub fn top_k_predictions(probabilities: &[f32], labels: &[String], top_k: usize) -> Vec<Prediction> {
    let mut indexed: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let top_k = top_k.min(indexed.len());
    indexed[..top_k]
        .iter()
        .map(|&(idx, probability)| {
            let label = labels
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("class_{}", idx));
            Prediction { label, probability }
        })
        .collect()
}

/// Stable descending sort by probability; NaN sorts last.
pub fn sort_by_probability(predictions: &mut [Prediction]) {
    predictions.sort_by(|a, b| match (a.probability.is_nan(), b.probability.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.probability.partial_cmp(&a.probability).unwrap_or(Ordering::Equal),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn softmax_is_a_distribution() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn top_k_is_sorted_and_truncated() {
        let preds = top_k_predictions(&[0.05, 0.91, 0.04], &labels(&["dog", "cat", "fox"]), 2);
        assert_eq!(preds, vec![Prediction::new("cat", 0.91), Prediction::new("dog", 0.05)]);
    }

    #[test]
    fn top_k_larger_than_classes() {
        let preds = top_k_predictions(&[0.3, 0.7], &labels(&["a"]), 10);
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[0].label, "class_1");
    }

    #[test]
    fn nan_sorts_last() {
        let mut preds = vec![
            Prediction::new("nan", f32::NAN),
            Prediction::new("low", 0.1),
            Prediction::new("high", 0.8),
        ];
        sort_by_probability(&mut preds);
        let order: Vec<&str> = preds.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(order, vec!["high", "low", "nan"]);
    }

    #[test]
    fn normalization_moves_channels_to_planes() {
        let mut image = Array3::<f32>::zeros((2, 2, 3));
        image[[0, 1, 0]] = 255.0;
        image[[1, 0, 2]] = 255.0;

        let batch = to_normalized_nchw(&image, [0.5, 0.5, 0.5], [0.5, 0.5, 0.5]).unwrap();
        assert_eq!(batch.dim(), (1, 3, 2, 2));
        assert_eq!(batch[[0, 0, 0, 1]], 1.0);
        assert_eq!(batch[[0, 0, 0, 0]], -1.0);
        assert_eq!(batch[[0, 2, 1, 0]], 1.0);
        assert_eq!(batch[[0, 1, 1, 1]], -1.0);
    }
}
