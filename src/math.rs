use crate::Float;
use nalgebra as na;

/// Mean of a point set, `None` for an empty set.
pub fn centroid<'a, T, I>(points: I) -> Option<na::Point2<T>>
where
    T: Float + na::RealField,
    I: IntoIterator<Item = &'a na::Point2<T>>,
{
    let mut sum = na::Vector2::zeros();
    let mut n = 0usize;

    for p in points {
        sum += p.coords;
        n += 1;
    }

    if n == 0 {
        return None;
    }

    Some((sum / T::from_usize(n)?).into())
}

/// Element-wise arithmetic mean of 3x3 matrices, `None` for an empty set.
pub fn mean_matrix<'a, T, I>(matrices: I) -> Option<na::Matrix3<T>>
where
    T: Float + na::RealField,
    I: IntoIterator<Item = &'a na::Matrix3<T>>,
{
    let mut sum = na::Matrix3::zeros();
    let mut n = 0usize;

    for m in matrices {
        sum += m;
        n += 1;
    }

    if n == 0 {
        return None;
    }

    Some(sum / T::from_usize(n)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_of_square() {
        let pts = [
            na::Point2::new(0.0f32, 0.0),
            na::Point2::new(2.0, 0.0),
            na::Point2::new(2.0, 2.0),
            na::Point2::new(0.0, 2.0),
        ];

        assert_eq!(centroid(&pts), Some(na::Point2::new(1.0, 1.0)));
        assert_eq!(centroid::<f32, _>(std::iter::empty()), None);
    }

    #[test]
    fn mean_of_matrices() {
        let a = na::Matrix3::<f64>::identity();
        let b = na::Matrix3::<f64>::from_element(3.0);
        let m = mean_matrix([&a, &b]).unwrap();

        assert_eq!(m[(0, 0)], 2.0);
        assert_eq!(m[(0, 1)], 1.5);
        assert!(mean_matrix::<f64, _>(std::iter::empty()).is_none());
    }
}
