//! Normal-equation solve over `ndarray`
//!
//! The systems solved here are at most 9×9. The inverse is computed with a
//! Gauss–Jordan sweep so that a near-zero pivot can be reported as a
//! singular system instead of producing huge weights.

use ndarray::{s, Array1, Array2, Zip};

/// Stack equally sized rows into a design matrix
///
/// `None` for an empty slice or ragged rows.
pub fn design_matrix<R: AsRef<[f64]>>(rows: &[R]) -> Option<Array2<f64>> {
    let cols = rows.first()?.as_ref().len();
    let mut flat = Vec::with_capacity(rows.len() * cols);
    for row in rows {
        if row.as_ref().len() != cols {
            return None;
        }
        flat.extend_from_slice(row.as_ref());
    }
    Array2::from_shape_vec((rows.len(), cols), flat).ok()
}

fn swap_rows(m: &mut Array2<f64>, a: usize, b: usize) {
    if a == b {
        return;
    }
    let (mut ra, mut rb) = m.multi_slice_mut((s![a, ..], s![b, ..]));
    Zip::from(&mut ra)
        .and(&mut rb)
        .for_each(|x, y| std::mem::swap(x, y));
}

/// Inverse by Gauss–Jordan elimination with partial pivoting
///
/// Returns `None` for a non-square matrix or when any pivot magnitude
/// falls below `pivot_epsilon`.
pub fn invert(m: &Array2<f64>, pivot_epsilon: f64) -> Option<Array2<f64>> {
    let (n, cols) = m.dim();
    if n != cols {
        return None;
    }
    let mut a = m.clone();
    let mut inv = Array2::<f64>::eye(n);

    for c in 0..n {
        let pivot_row = (c..n)
            .max_by(|&r1, &r2| a[[r1, c]].abs().total_cmp(&a[[r2, c]].abs()))
            .unwrap_or(c);
        swap_rows(&mut a, c, pivot_row);
        swap_rows(&mut inv, c, pivot_row);

        let pivot = a[[c, c]];
        if pivot.abs() < pivot_epsilon {
            return None;
        }
        a.row_mut(c).mapv_inplace(|v| v / pivot);
        inv.row_mut(c).mapv_inplace(|v| v / pivot);

        let a_pivot = a.row(c).to_owned();
        let inv_pivot = inv.row(c).to_owned();
        for r in 0..n {
            let factor = a[[r, c]];
            if r == c || factor == 0.0 {
                continue;
            }
            a.row_mut(r).scaled_add(-factor, &a_pivot);
            inv.row_mut(r).scaled_add(-factor, &inv_pivot);
        }
    }

    Some(inv)
}

/// Ridge-regularized normal equation `w = (XᵗX + λI)⁻¹ Xᵗy`
///
/// Returns `None` on mismatched targets or when the regularized Gram matrix
/// is singular.
pub fn ridge_normal_equation(
    x: &Array2<f64>,
    y: &Array1<f64>,
    lambda: f64,
    pivot_epsilon: f64,
) -> Option<Array1<f64>> {
    if x.nrows() != y.len() {
        return None;
    }
    let mut gram = x.t().dot(x);
    gram.diag_mut().mapv_inplace(|v| v + lambda);
    let inverse = invert(&gram, pivot_epsilon)?;
    Some(inverse.dot(&x.t().dot(y)))
}
