/// Summary statistics over plain `f64` samples.
///
/// Callers filter out-of-policy values before calling; these helpers only
/// guard against empty input.
pub struct Statistics;

impl Statistics {
    /// Unweighted centroid of `(x, y)` pairs.
    pub fn mean_xy(points: impl IntoIterator<Item = (f64, f64)>) -> Option<(f64, f64)> {
        let mut n = 0usize;
        let (mut sx, mut sy) = (0.0, 0.0);
        for (x, y) in points {
            sx += x;
            sy += y;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some((sx / n as f64, sy / n as f64))
    }

    pub fn max(values: impl IntoIterator<Item = f64>) -> Option<f64> {
        values.into_iter().reduce(f64::max)
    }

    pub fn min_max(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
        let mut iter = values.into_iter();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), v| (min.min(v), max.max(v))))
    }
}

#[cfg(test)]
mod tests {
    use super::Statistics;

    #[test]
    fn mean_xy_is_unweighted() {
        let (x, y) = Statistics::mean_xy([(0.0, 0.0), (4.0, 1.0), (2.0, 0.5)]).unwrap();
        assert!((x - 2.0).abs() < 1e-9);
        assert!((y - 0.5).abs() < 1e-9);
        assert_eq!(Statistics::mean_xy(std::iter::empty()), None);
    }

    #[test]
    fn min_max_handles_negatives_and_empty() {
        assert_eq!(Statistics::min_max([3.0, -2.0, 7.5]), Some((-2.0, 7.5)));
        assert_eq!(Statistics::min_max(Vec::<f64>::new()), None);
        assert_eq!(Statistics::max([0.1, 0.4, 0.2]), Some(0.4));
        assert_eq!(Statistics::max(std::iter::empty()), None);
    }
}
