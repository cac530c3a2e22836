use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub struct MatrixHelper;

impl MatrixHelper {
    /// Multiply two 2D arrays.
    pub fn multiply(lhs: ArrayView2<f64>, rhs: ArrayView2<f64>) -> Array2<f64> {
        lhs.dot(&rhs)
    }

    /// Solve `A x = b` by Gaussian elimination with partial pivoting.
    ///
    /// Returns `None` for non-square, mismatched or singular systems.
    pub fn solve(lhs: ArrayView2<f64>, rhs: ArrayView1<f64>) -> Option<Array1<f64>> {
        let n = lhs.nrows();
        if lhs.ncols() != n || rhs.len() != n {
            return None;
        }

        let mut a = lhs.to_owned();
        let mut b = rhs.to_owned();

        for col in 0..n {
            let pivot_row = (col..n).max_by(|&i, &j| {
                a[[i, col]]
                    .abs()
                    .partial_cmp(&a[[j, col]].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;
            if a[[pivot_row, col]].abs() < 1e-300 || !a[[pivot_row, col]].is_finite() {
                return None;
            }
            if pivot_row != col {
                for k in 0..n {
                    a.swap([col, k], [pivot_row, k]);
                }
                b.swap(col, pivot_row);
            }

            for row in (col + 1)..n {
                let factor = a[[row, col]] / a[[col, col]];
                if factor == 0.0 {
                    continue;
                }
                for k in col..n {
                    a[[row, k]] -= factor * a[[col, k]];
                }
                b[row] -= factor * b[col];
            }
        }

        let mut x = Array1::<f64>::zeros(n);
        for row in (0..n).rev() {
            let tail: f64 = ((row + 1)..n).map(|k| a[[row, k]] * x[k]).sum();
            x[row] = (b[row] - tail) / a[[row, row]];
        }
        Some(x)
    }

    /// Least-squares fit of `y` against the columns of `design` via normal equations.
    pub fn least_squares(design: ArrayView2<f64>, y: ArrayView1<f64>) -> Option<Array1<f64>> {
        let gram = design.t().dot(&design);
        let projected = design.t().dot(&y);
        Self::solve(gram.view(), projected.view())
    }
}
