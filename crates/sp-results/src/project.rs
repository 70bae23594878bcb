//! Projection of the full concentration matrix onto free components and
//! species.

use crate::types::ComputedTable;
use crate::{ResultsError, ResultsResult};
use nalgebra::DMatrix;
use sp_core::{ColumnLayout, Segment};

/// Select the free-component and species segments of `matrix`, in that
/// order, and label them.
///
/// The auxiliary segment is never shown. `labels` must hold `nc + ns` names
/// and `axis` one value per row.
pub fn project(
    matrix: &DMatrix<f64>,
    layout: ColumnLayout,
    labels: &[String],
    axis_label: &str,
    axis: &[f64],
) -> ResultsResult<ComputedTable> {
    if matrix.ncols() != layout.width() {
        return Err(ResultsError::ShapeMismatch {
            what: format!(
                "matrix has {} columns, expected nc + nf + ns = {} + {} + {}",
                matrix.ncols(),
                layout.nc,
                layout.nf,
                layout.ns
            ),
        });
    }
    if labels.len() != layout.projected_width() {
        return Err(ResultsError::ShapeMismatch {
            what: format!(
                "{} labels for {} projected columns",
                labels.len(),
                layout.projected_width()
            ),
        });
    }
    if axis.len() != matrix.nrows() {
        return Err(ResultsError::ShapeMismatch {
            what: format!("{} axis values for {} rows", axis.len(), matrix.nrows()),
        });
    }

    let columns: Vec<usize> = layout.projected_columns().collect();
    let data = (0..matrix.nrows())
        .map(|r| columns.iter().map(|&c| matrix[(r, c)]).collect())
        .collect();

    Ok(ComputedTable {
        axis_label: axis_label.to_string(),
        axis: axis.to_vec(),
        columns: labels.to_vec(),
        data,
    })
}

/// Auxiliary values (e.g. precipitated amounts) of one row.
pub fn auxiliary_row(matrix: &DMatrix<f64>, layout: ColumnLayout, row: usize) -> Vec<f64> {
    layout
        .range(Segment::Auxiliary)
        .map(|c| matrix[(row, c)])
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn width_is_nc_plus_ns_for_any_nf(
            nc in 1usize..5,
            nf in 0usize..6,
            ns in 0usize..6,
            rows in 1usize..5,
        ) {
            let layout = ColumnLayout::new(nc, nf, ns);
            let m = DMatrix::from_fn(rows, layout.width(), |r, c| (r * 100 + c) as f64);
            let labels: Vec<String> = (0..nc + ns).map(|i| format!("s{i}")).collect();
            let axis: Vec<f64> = (0..rows).map(|r| r as f64).collect();

            let t = project(&m, layout, &labels, "pX", &axis).unwrap();
            prop_assert_eq!(t.width(), nc + ns);
            for row in &t.data {
                prop_assert_eq!(row.len(), nc + ns);
                // nothing from the auxiliary segment leaks through
                for v in row {
                    let c = (*v as usize) % 100;
                    prop_assert!(c < nc || c >= nc + nf);
                }
            }
        }
    }
}
