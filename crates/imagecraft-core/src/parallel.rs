//! Row-sliced execution for per-pixel passes.
//!
//! Every pass writes a freshly allocated output buffer. Each worker owns a
//! disjoint set of output rows and only reads from inputs that were fully
//! materialized before the pass started, so the parallel and sequential
//! paths produce identical bytes.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Run `f(y, row)` for every `row_len`-sized row of `dst`.
///
/// Uses Rayon when the `parallel` feature is enabled.
pub(crate) fn for_each_row<T, F>(dst: &mut [T], row_len: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    if row_len == 0 {
        return;
    }

    #[cfg(feature = "parallel")]
    dst.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| f(y, row));

    #[cfg(not(feature = "parallel"))]
    dst.chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
}
