//! 1-medoid selection over embedding vectors.
//!
//! The medoid is the point with the smallest summed Euclidean distance to
//! every other point. Ties resolve to the lowest index.

use storyloom_core::error::DomainError;

fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Returns the index of the medoid of `points`.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an empty set and
/// `DomainError::Upstream` when the vectors disagree on dimension or carry
/// non-finite values (both indicate a bad embedding response).
pub fn medoid_index(points: &[&[f32]]) -> Result<usize, DomainError> {
    let Some(first) = points.first() else {
        return Err(DomainError::Validation("cannot select from no points".into()));
    };
    let dimension = first.len();
    for (i, point) in points.iter().enumerate() {
        if point.len() != dimension {
            return Err(DomainError::Upstream(format!(
                "embedding {i} has dimension {}, expected {dimension}",
                point.len()
            )));
        }
        if point.iter().any(|v| !v.is_finite()) {
            return Err(DomainError::Upstream(format!(
                "embedding {i} contains non-finite values"
            )));
        }
    }

    let mut best = 0;
    let mut best_cost = f64::INFINITY;
    for (i, candidate) in points.iter().enumerate() {
        let cost: f64 = points.iter().map(|other| euclidean(candidate, other)).sum();
        if cost < best_cost {
            best = i;
            best_cost = cost;
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_pair_beats_outlier() {
        // "go north", "go north please", "go south"
        let north = [1.0, 0.0];
        let north_please = [0.95, 0.05];
        let south = [-1.0, 0.0];

        let winner = medoid_index(&[&north[..], &north_please[..], &south[..]]).unwrap();

        assert!(winner == 0 || winner == 1, "winner was {winner}");
    }

    #[test]
    fn test_center_of_a_line_wins() {
        let points: [&[f32]; 5] = [&[0.0], &[1.0], &[2.0], &[3.0], &[10.0]];

        assert_eq!(medoid_index(&points).unwrap(), 2);
    }

    #[test]
    fn test_tie_resolves_to_lowest_index() {
        let a = [0.0, 0.0];
        let b = [1.0, 0.0];

        assert_eq!(medoid_index(&[&a[..], &b[..]]).unwrap(), 0);
        assert_eq!(medoid_index(&[&b[..], &a[..]]).unwrap(), 0);
    }

    #[test]
    fn test_identical_points_pull_the_medoid() {
        let near = [0.0, 1.0];
        let far = [5.0, 5.0];

        assert_eq!(medoid_index(&[&far[..], &near[..], &near[..]]).unwrap(), 1);
    }

    #[test]
    fn test_empty_set_is_rejected() {
        assert!(matches!(
            medoid_index(&[]),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch_is_upstream_error() {
        let a = [0.0, 1.0];
        let b = [0.0, 1.0, 2.0];

        assert!(matches!(
            medoid_index(&[&a[..], &b[..]]),
            Err(DomainError::Upstream(_))
        ));
    }

    #[test]
    fn test_nan_is_upstream_error() {
        let a = [0.0, f32::NAN];
        let b = [0.0, 1.0];

        assert!(matches!(
            medoid_index(&[&a[..], &b[..]]),
            Err(DomainError::Upstream(_))
        ));
    }
}
