//! Data-parallel helpers.
//!
//! Leaf hashing, share evaluation and constraint evaluation are independent
//! per index.  Large batches are dispatched to rayon on native targets; small
//! batches, single-threaded pools and wasm fall back to a serial loop.  Both
//! paths produce identical results in index order.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

#[cfg(not(target_arch = "wasm32"))]
const PARALLEL_THRESHOLD: usize = 64;

fn use_parallel(len: usize) -> bool {
    #[cfg(not(target_arch = "wasm32"))]
    {
        len >= PARALLEL_THRESHOLD && rayon::current_num_threads() > 1
    }
    #[cfg(target_arch = "wasm32")]
    {
        let _ = len;
        false
    }
}

/// Computes `[f(0), …, f(len-1)]`.
pub(crate) fn map_indices<T, F>(len: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    if use_parallel(len) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            return (0..len).into_par_iter().map(f).collect();
        }
    }
    (0..len).map(f).collect()
}

/// Applies `f` to every item of `items`, preserving order.
pub(crate) fn map_slice<I, T, F>(items: &[I], f: F) -> Vec<T>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> T + Send + Sync,
{
    if use_parallel(items.len()) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            return items.par_iter().map(f).collect();
        }
    }
    items.iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_and_serial_agree() {
        let big = map_indices(1000, |i| i * i);
        assert_eq!(big, (0..1000).map(|i| i * i).collect::<Vec<_>>());
        let items: Vec<u64> = (0..500).collect();
        assert_eq!(map_slice(&items, |v| v + 1)[499], 500);
    }
}
